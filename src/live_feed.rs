use crate::priv_prelude::*;
use std::os::unix::fs::OpenOptionsExt;

/// Largest single read taken from a live feed.
const FEED_READ_SIZE: usize = 8192;

/// A source of replacement schedules, consulted once at the start of every evaluation pass of a
/// [`TraceLink`](crate::TraceLink).
///
/// Implementations must not block: "nothing new" is reported by returning `None`.
pub trait ScheduleFeed: Send {
    fn poll_schedule(&mut self) -> Option<Schedule>;
}

/// Reads a target rate from a non-blocking byte channel (typically a named pipe) and turns each
/// new rate into a schedule.
///
/// Each read is expected to hold a comma-terminated decimal Mbps value, eg. `"7.5,"`. Only the
/// first terminated token of a read is used, and a read with no comma at all is discarded as a
/// partial write. Reads that would block, a closed writer and read errors all mean "no update",
/// as does a rate whose schedule would be longer than
/// [`MAX_SCHEDULE_LEN`](crate::MAX_SCHEDULE_LEN). A token that isn't a number is a bug in
/// whatever is writing to the feed: in debug builds it panics, in release builds it's logged and
/// ignored.
pub struct LiveFeed<R> {
    reader: R,
    last_sample: Rate,
    repetitions: u64,
}

impl LiveFeed<File> {
    /// Opens the named pipe at `path` for non-blocking reads.
    pub fn open(path: impl AsRef<Path>) -> io::Result<LiveFeed<File>> {
        let file = {
            OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)?
        };
        Ok(LiveFeed::new(file))
    }
}

impl<R: Read> LiveFeed<R> {
    /// Wraps a reader. The reader should return `WouldBlock` rather than block when it has
    /// nothing to say.
    pub fn new(reader: R) -> LiveFeed<R> {
        LiveFeed {
            reader,
            last_sample: Rate::ZERO,
            repetitions: DEFAULT_REPETITIONS,
        }
    }

    /// Sets the rate the feed is assumed to have reported already. A report of this same rate
    /// won't replace the link's schedule. Defaults to zero.
    pub fn initial_rate(mut self, rate: Rate) -> Self {
        self.last_sample = rate;
        self
    }

    /// Sets how many times generated schedules unroll their repeating pattern.
    pub fn repetitions(mut self, repetitions: u64) -> Self {
        self.repetitions = repetitions;
        self
    }

    /// The last rate the feed reported.
    pub fn last_sample(&self) -> Rate {
        self.last_sample
    }

    /// Reads the feed. Returns the new rate if it differs from the last one.
    pub fn poll_rate(&mut self) -> Option<Rate> {
        let (rate, _schedule) = self.poll_update()?;
        Some(rate)
    }

    fn poll_update(&mut self) -> Option<(Rate, Schedule)> {
        let mut buffer = [0u8; FEED_READ_SIZE];
        let len = match self.reader.read(&mut buffer) {
            Ok(0) => return None,
            Ok(len) => len,
            Err(err) => {
                if err.kind() != io::ErrorKind::WouldBlock && err.kind() != io::ErrorKind::Interrupted {
                    trace!("live feed read failed: {}", err);
                }
                return None;
            },
        };
        let text = String::from_utf8_lossy(&buffer[..len]);
        // whatever follows the last comma is a partial write
        let terminated = match text.rfind(',') {
            Some(end) => &text[..end],
            None => {
                trace!("ignoring unterminated live feed read {:?}", text);
                return None;
            },
        };
        let token = terminated.split(',').map(str::trim).find(|token| !token.is_empty())?;
        let rate = match token.parse::<Rate>() {
            Ok(rate) => rate,
            Err(err) => {
                if cfg!(debug_assertions) {
                    panic!("live feed sent unparsable rate {:?}: {}", token, err);
                }
                warn!("ignoring unparsable rate {:?} from live feed: {}", token, err);
                return None;
            },
        };
        if rate == self.last_sample {
            return None;
        }
        let schedule = match rate.to_schedule(self.repetitions) {
            Ok(schedule) => schedule,
            Err(err) => {
                warn!("ignoring live feed rate, keeping the current schedule: {}", err);
                return None;
            },
        };
        debug!("live feed rate changed from {} to {}", self.last_sample, rate);
        self.last_sample = rate;
        Some((rate, schedule))
    }
}

impl<R: Read + Send> ScheduleFeed for LiveFeed<R> {
    fn poll_schedule(&mut self) -> Option<Schedule> {
        let (_rate, schedule) = self.poll_update()?;
        Some(schedule)
    }
}
