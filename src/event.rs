use crate::priv_prelude::*;

/// Something that happened on a link, timestamped in milliseconds since the link's
/// [`ClockOrigin`](crate::ClockOrigin).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    /// A packet of `size` bytes was offered to the link.
    Arrival {
        time: u64,
        size: usize,
    },
    /// The queue discipline dropped packets while a packet was being admitted.
    Drop {
        time: u64,
        packets: usize,
        bytes: usize,
    },
    /// A delivery opportunity of `size` bytes came up, whether or not anything used it.
    Opportunity {
        time: u64,
        size: usize,
    },
    /// The last byte of a packet left the link after waiting `delay` milliseconds.
    Departure {
        time: u64,
        size: usize,
        delay: u64,
    },
}

impl LinkEvent {
    pub fn time(&self) -> u64 {
        match *self {
            LinkEvent::Arrival { time, .. } => time,
            LinkEvent::Drop { time, .. } => time,
            LinkEvent::Opportunity { time, .. } => time,
            LinkEvent::Departure { time, .. } => time,
        }
    }
}

/// Formats the event as a line of a link's event log (without the trailing newline).
impl fmt::Display for LinkEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            LinkEvent::Arrival { time, size } => write!(f, "{} + {}", time, size),
            LinkEvent::Drop { time, packets, bytes } => write!(f, "{} d {} {}", time, packets, bytes),
            LinkEvent::Opportunity { time, size } => write!(f, "{} # {}", time, size),
            LinkEvent::Departure { time, size, delay } => write!(f, "{} - {} {}", time, size, delay),
        }
    }
}

/// Receives every event a link records. Observers are fire-and-forget: nothing they do can
/// influence scheduling, so `observe` has no way to report failure.
pub trait LinkObserver: Send {
    fn observe(&mut self, event: &LinkEvent);
}

impl LinkObserver for Vec<LinkEvent> {
    fn observe(&mut self, event: &LinkEvent) {
        self.push(*event);
    }
}

impl<O> LinkObserver for Arc<Mutex<O>>
where
    O: LinkObserver,
{
    fn observe(&mut self, event: &LinkEvent) {
        match self.lock() {
            Ok(mut observer) => observer.observe(event),
            Err(poisoned) => poisoned.into_inner().observe(event),
        }
    }
}

/// Forwards events to another task or thread. Events are silently discarded once the
/// receiver has gone away.
impl LinkObserver for mpsc::UnboundedSender<LinkEvent> {
    fn observe(&mut self, event: &LinkEvent) {
        let _ = self.unbounded_send(*event);
    }
}
