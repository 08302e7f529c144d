use crate::priv_prelude::*;

/// The zero-point that all millisecond timestamps of a link are measured from.
///
/// Every component that records or compares times (the link itself, its event log and the
/// adversary's probe thread) is handed the same `ClockOrigin`, so timestamps written by different
/// components line up. Use [`ClockOrigin::process`](crate::ClockOrigin::process) to share one
/// origin across every link in the process.
#[derive(Clone, Copy, Debug)]
pub struct ClockOrigin {
    instant: Instant,
    unix_millis: u64,
}

impl ClockOrigin {
    /// Creates a new origin at the current instant.
    #[cfg_attr(feature="cargo-clippy", allow(clippy::new_without_default))]
    pub fn new() -> ClockOrigin {
        let unix_millis = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since_epoch) => since_epoch.as_millis() as u64,
            Err(_) => 0,
        };
        ClockOrigin {
            instant: Instant::now(),
            unix_millis,
        }
    }

    /// The process-wide origin. Initialized the first time it's requested.
    pub fn process() -> ClockOrigin {
        static PROCESS_ORIGIN: OnceLock<ClockOrigin> = OnceLock::new();
        *PROCESS_ORIGIN.get_or_init(ClockOrigin::new)
    }

    /// Milliseconds elapsed since the origin.
    pub fn now(&self) -> u64 {
        self.millis_at(Instant::now())
    }

    /// Milliseconds between the origin and `instant`, or zero if `instant` is earlier.
    pub fn millis_at(&self, instant: Instant) -> u64 {
        instant.saturating_duration_since(self.instant).as_millis() as u64
    }

    /// The instant `millis` milliseconds after the origin.
    pub fn instant_at(&self, millis: u64) -> Instant {
        self.instant + Duration::from_millis(millis)
    }

    /// Wall-clock time of the origin, in milliseconds since the unix epoch.
    pub fn unix_millis(&self) -> u64 {
        self.unix_millis
    }
}
