//! Emulate a packet link whose capacity varies over time according to a trace. *Currently
//! unix-only*.
//!
//! A trace is a list of millisecond offsets, one per line. Each offset is a *delivery
//! opportunity*: an instant at which up to [`MAX_OPPORTUNITY_BYTES`] may leave the link. A
//! [`TraceLink`] queues packets offered to it and releases them as opportunities come up,
//! spreading large packets across several opportunities and packing small packets into one. Once
//! the trace runs out it either repeats (shifted by its own length) or, for one-shot links, the
//! link stops delivering for good.
//!
//! ```no_run
//! use tracelink::{Schedule, TraceLinkBuilder, queue::DropTailQueue, queue::QueueLimits};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Four opportunities every 4ms: roughly 12 Mbps.
//! let schedule: Schedule = "1\n2\n3\n4\n".parse()?;
//! let queue = DropTailQueue::new(QueueLimits { packets: Some(100), bytes: None })?;
//! let mut link = {
//!     TraceLinkBuilder::new("Uplink", schedule)
//!     .one_shot()
//!     .queue(queue)
//!     .log_file("uplink.log")
//!     .build()?
//! };
//! link.read_packet(vec![0u8; 1200])?;
//! while let Some(wait) = link.wait_time() {
//!     std::thread::sleep(wait);
//!     for packet in link.drain_output() {
//!         // forward `packet` to its destination
//!         # drop(packet);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Live rate updates
//!
//! A link can be handed a [`ScheduleFeed`], typically a [`LiveFeed`] reading decimal Mbps values
//! from a named pipe. Whenever the feed reports a new rate, the link's schedule is replaced by
//! the shortest repeating schedule with exactly that rate (see [`Rate::to_schedule`]). The time
//! the link had already spent in its old schedule is folded into the new schedule's base
//! timestamp so the link's notion of time stays continuous.
//!
//! # Recording
//!
//! Links report every arrival, drop, delivery opportunity and departure as a [`LinkEvent`] to
//! their [`LinkObserver`]s: an [`EventLog`] file, throughput and delay [`metrics`], an
//! [`Adversary`] tracking link utilization on its own thread, or anything else.
//!
//! # Async
//!
//! [`SinkStreamExt::with_trace_links`] wraps any `Stream + Sink` of packets so that traffic in
//! each direction is shaped by its own link, using `tokio` timers to wake up for the next
//! delivery opportunity.

mod adversary;
mod event;
mod event_log;
mod link;
mod link_builder;
mod live_feed;
pub mod metrics;
pub mod queue;
mod rate;
mod schedule;
mod shaper;
mod stream_ext;
mod time;

mod priv_prelude;
#[cfg(test)]
mod tests;

pub use self::{
    adversary::{Adversary, AdversaryTotals, ProbeWindow, PROBE_PERIOD},
    event::{LinkEvent, LinkObserver},
    event_log::{EventLog, LogHeader, SHELL_PREFIX_VAR},
    link::{AdmitError, TraceLink},
    link_builder::{LinkBuildError, TraceLinkBuilder},
    live_feed::{LiveFeed, ScheduleFeed},
    metrics::{BinnedSeries, DelayRecorder, Metrics, ThroughputRecorder},
    queue::{InfiniteQueue, PacketQueue, QueuedPacket},
    rate::{
        Rate, RateParseError, ScheduleLengthError, DEFAULT_REPETITIONS, IDLE_PERIOD_MS,
        MAX_SCHEDULE_LEN, MBPS_PER_OPPORTUNITY_PER_MS,
    },
    schedule::{Schedule, TraceError, MAX_OPPORTUNITY_BYTES},
    shaper::Shaped,
    stream_ext::SinkStreamExt,
    time::ClockOrigin,
};
