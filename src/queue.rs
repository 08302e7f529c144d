//! Queueing disciplines for packets waiting to cross a link.
//!
//! The link never looks inside its queue. It only enqueues, dequeues and compares sizes before
//! and after an enqueue to find out whether the discipline dropped anything.

use crate::priv_prelude::*;

/// A packet waiting in a [`PacketQueue`](crate::queue::PacketQueue).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueuedPacket {
    pub contents: Bytes,
    /// Milliseconds since the link's [`ClockOrigin`](crate::ClockOrigin).
    pub arrival_time: u64,
}

impl QueuedPacket {
    pub fn new(contents: Bytes, arrival_time: u64) -> QueuedPacket {
        QueuedPacket { contents, arrival_time }
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

/// An admission/drop discipline for packets buffered in front of a link.
pub trait PacketQueue: Send {
    /// Offers a packet to the queue. The queue may accept it, reject it, or make room for it by
    /// dropping other packets.
    fn enqueue(&mut self, packet: QueuedPacket);

    fn dequeue(&mut self) -> Option<QueuedPacket>;

    fn size_bytes(&self) -> usize;

    fn size_packets(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size_packets() == 0
    }

    /// A short description of the discipline and its limits, written to log headers.
    fn description(&self) -> String;
}

/// Packet and byte limits for a bounded queue. A queue with both limits set accepts a packet
/// only if neither would be exceeded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueLimits {
    pub packets: Option<usize>,
    pub bytes: Option<usize>,
}

impl QueueLimits {
    /// Parses a `key=value,...` argument string, eg. `"packets=100,bytes=150000"`.
    pub fn parse(args: &str) -> Result<QueueLimits, QueueConfigError> {
        let mut limits = QueueLimits::default();
        for arg in args.split(',').map(str::trim).filter(|arg| !arg.is_empty()) {
            let (key, value) = match arg.split_once('=') {
                Some(key_value) => key_value,
                None => return Err(QueueConfigError::MalformedArgument(arg.to_owned())),
            };
            let value = match value.trim().parse::<usize>() {
                Ok(value) => value,
                Err(_) => return Err(QueueConfigError::MalformedArgument(arg.to_owned())),
            };
            match key.trim() {
                "packets" => limits.packets = Some(value),
                "bytes" => limits.bytes = Some(value),
                key => return Err(QueueConfigError::UnknownArgument(key.to_owned())),
            }
        }
        Ok(limits)
    }

    pub fn is_bounded(&self) -> bool {
        self.packets.is_some() || self.bytes.is_some()
    }

    fn allows(&self, size_packets: usize, size_bytes: usize) -> bool {
        let packets_ok = self.packets.map_or(true, |limit| size_packets <= limit);
        let bytes_ok = self.bytes.map_or(true, |limit| size_bytes <= limit);
        packets_ok && bytes_ok
    }
}

impl fmt::Display for QueueLimits {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.packets, self.bytes) {
            (Some(packets), Some(bytes)) => write!(f, "packets={}, bytes={}", packets, bytes),
            (Some(packets), None) => write!(f, "packets={}", packets),
            (None, Some(bytes)) => write!(f, "bytes={}", bytes),
            (None, None) => Ok(()),
        }
    }
}

/// Error raised when a queue can't be configured.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueConfigError {
    #[error("unknown queue type {0:?}")]
    UnknownKind(String),
    #[error("unknown queue argument {0:?}")]
    UnknownArgument(String),
    #[error("malformed queue argument {0:?}")]
    MalformedArgument(String),
    #[error("{0} queue must have a byte or packet limit")]
    Unbounded(&'static str),
}

/// Builds a queue from a discipline name (`infinite`, `droptail` or `drophead`) and its
/// argument string.
pub fn from_config(kind: &str, args: &str) -> Result<Box<dyn PacketQueue>, QueueConfigError> {
    let queue: Box<dyn PacketQueue> = match kind {
        "infinite" => {
            if !args.trim().is_empty() {
                return Err(QueueConfigError::UnknownArgument(args.to_owned()));
            }
            Box::new(InfiniteQueue::new())
        },
        "droptail" => Box::new(DropTailQueue::new(QueueLimits::parse(args)?)?),
        "drophead" => Box::new(DropHeadQueue::new(QueueLimits::parse(args)?)?),
        kind => return Err(QueueConfigError::UnknownKind(kind.to_owned())),
    };
    Ok(queue)
}

#[derive(Default)]
struct Fifo {
    packets: VecDeque<QueuedPacket>,
    size_bytes: usize,
}

impl Fifo {
    fn push_back(&mut self, packet: QueuedPacket) {
        self.size_bytes += packet.len();
        self.packets.push_back(packet);
    }

    fn pop_front(&mut self) -> Option<QueuedPacket> {
        let packet = self.packets.pop_front()?;
        self.size_bytes -= packet.len();
        Some(packet)
    }
}

/// A queue which never drops anything.
#[derive(Default)]
pub struct InfiniteQueue {
    fifo: Fifo,
}

impl InfiniteQueue {
    pub fn new() -> InfiniteQueue {
        InfiniteQueue::default()
    }
}

impl PacketQueue for InfiniteQueue {
    fn enqueue(&mut self, packet: QueuedPacket) {
        self.fifo.push_back(packet);
    }

    fn dequeue(&mut self) -> Option<QueuedPacket> {
        self.fifo.pop_front()
    }

    fn size_bytes(&self) -> usize {
        self.fifo.size_bytes
    }

    fn size_packets(&self) -> usize {
        self.fifo.packets.len()
    }

    fn description(&self) -> String {
        String::from("infinite")
    }
}

/// A bounded queue which drops arriving packets that don't fit.
pub struct DropTailQueue {
    limits: QueueLimits,
    fifo: Fifo,
}

impl DropTailQueue {
    pub fn new(limits: QueueLimits) -> Result<DropTailQueue, QueueConfigError> {
        if !limits.is_bounded() {
            return Err(QueueConfigError::Unbounded("drop-tail"));
        }
        Ok(DropTailQueue { limits, fifo: Fifo::default() })
    }
}

impl PacketQueue for DropTailQueue {
    fn enqueue(&mut self, packet: QueuedPacket) {
        let size_packets = self.fifo.packets.len() + 1;
        let size_bytes = self.fifo.size_bytes + packet.len();
        if self.limits.allows(size_packets, size_bytes) {
            self.fifo.push_back(packet);
        }
    }

    fn dequeue(&mut self) -> Option<QueuedPacket> {
        self.fifo.pop_front()
    }

    fn size_bytes(&self) -> usize {
        self.fifo.size_bytes
    }

    fn size_packets(&self) -> usize {
        self.fifo.packets.len()
    }

    fn description(&self) -> String {
        format!("droptail [{}]", self.limits)
    }
}

/// A bounded queue which always accepts arriving packets, dropping from the head until the
/// queue fits its limits again.
pub struct DropHeadQueue {
    limits: QueueLimits,
    fifo: Fifo,
}

impl DropHeadQueue {
    pub fn new(limits: QueueLimits) -> Result<DropHeadQueue, QueueConfigError> {
        if !limits.is_bounded() {
            return Err(QueueConfigError::Unbounded("drop-head"));
        }
        Ok(DropHeadQueue { limits, fifo: Fifo::default() })
    }
}

impl PacketQueue for DropHeadQueue {
    fn enqueue(&mut self, packet: QueuedPacket) {
        self.fifo.push_back(packet);
        while !self.limits.allows(self.fifo.packets.len(), self.fifo.size_bytes) {
            let _dropped = self.fifo.pop_front();
        }
    }

    fn dequeue(&mut self) -> Option<QueuedPacket> {
        self.fifo.pop_front()
    }

    fn size_bytes(&self) -> usize {
        self.fifo.size_bytes
    }

    fn size_packets(&self) -> usize {
        self.fifo.packets.len()
    }

    fn description(&self) -> String {
        format!("drophead [{}]", self.limits)
    }
}
