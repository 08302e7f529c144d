//! Timestamped scalar samples for throughput and delay displays.
//!
//! The link feeds a [`Metrics`](crate::metrics::Metrics) sink through
//! [`ThroughputRecorder`](crate::metrics::ThroughputRecorder) and
//! [`DelayRecorder`](crate::metrics::DelayRecorder). How the samples are rendered is up to the
//! sink. [`BinnedSeries`](crate::metrics::BinnedSeries) keeps a sliding window of fixed-width bins.

use crate::priv_prelude::*;

/// Throughput channel carrying the capacity offered by delivery opportunities.
pub const CAPACITY_CHANNEL: usize = 0;
/// Throughput channel carrying the bytes offered to the link.
pub const ARRIVAL_CHANNEL: usize = 1;
/// Throughput channel carrying the bytes that left the link.
pub const DEPARTURE_CHANNEL: usize = 2;
/// Delay channel carrying the queueing delay of departing packets.
pub const DELAY_CHANNEL: usize = 0;

/// A sink for timestamped samples, keyed by a small channel id.
pub trait Metrics: Send {
    /// Adds `value` to whatever `channel` has accumulated around `time`.
    fn add_value(&mut self, channel: usize, time: u64, value: u64);

    /// Raises the running maximum of `channel` around `time` to at least `value`.
    fn set_max_value(&mut self, channel: usize, time: u64, value: u64);
}

impl<M> Metrics for Arc<Mutex<M>>
where
    M: Metrics,
{
    fn add_value(&mut self, channel: usize, time: u64, value: u64) {
        match self.lock() {
            Ok(mut metrics) => metrics.add_value(channel, time, value),
            Err(poisoned) => poisoned.into_inner().add_value(channel, time, value),
        }
    }

    fn set_max_value(&mut self, channel: usize, time: u64, value: u64) {
        match self.lock() {
            Ok(mut metrics) => metrics.set_max_value(channel, time, value),
            Err(poisoned) => poisoned.into_inner().set_max_value(channel, time, value),
        }
    }
}

/// Feeds capacity, arrivals and departures (in bytes) to a [`Metrics`] sink.
pub struct ThroughputRecorder<M> {
    metrics: M,
}

impl<M: Metrics> ThroughputRecorder<M> {
    pub fn new(metrics: M) -> ThroughputRecorder<M> {
        ThroughputRecorder { metrics }
    }
}

impl<M: Metrics> LinkObserver for ThroughputRecorder<M> {
    fn observe(&mut self, event: &LinkEvent) {
        match *event {
            LinkEvent::Opportunity { time, size } => {
                self.metrics.add_value(CAPACITY_CHANNEL, time, size as u64);
            },
            LinkEvent::Arrival { time, size } => {
                self.metrics.add_value(ARRIVAL_CHANNEL, time, size as u64);
            },
            LinkEvent::Departure { time, size, .. } => {
                self.metrics.add_value(DEPARTURE_CHANNEL, time, size as u64);
            },
            LinkEvent::Drop { .. } => (),
        }
    }
}

/// Feeds the queueing delay of departing packets to a [`Metrics`] sink.
pub struct DelayRecorder<M> {
    metrics: M,
}

impl<M: Metrics> DelayRecorder<M> {
    pub fn new(metrics: M) -> DelayRecorder<M> {
        DelayRecorder { metrics }
    }
}

impl<M: Metrics> LinkObserver for DelayRecorder<M> {
    fn observe(&mut self, event: &LinkEvent) {
        if let LinkEvent::Departure { time, delay, .. } = *event {
            self.metrics.set_max_value(DELAY_CHANNEL, time, delay);
        }
    }
}

/// Per-channel values accumulated into fixed-width time bins.
///
/// Only the most recent `window_bins` bins are retained. A bin's value is `None` until
/// something is recorded on that channel.
pub struct BinnedSeries {
    bin_width_ms: u64,
    window_bins: usize,
    num_channels: usize,
    bins: BTreeMap<u64, Vec<Option<u64>>>,
}

impl BinnedSeries {
    pub fn new(num_channels: usize, bin_width_ms: u64, window_bins: usize) -> BinnedSeries {
        assert!(bin_width_ms > 0);
        BinnedSeries {
            bin_width_ms,
            window_bins: cmp::max(window_bins, 1),
            num_channels,
            bins: BTreeMap::new(),
        }
    }

    /// Three channels (capacity, arrivals, departures) in 500ms bins.
    pub fn throughput() -> BinnedSeries {
        BinnedSeries::new(3, 500, 240)
    }

    /// One channel (queueing delay) in 250ms bins.
    pub fn delay() -> BinnedSeries {
        BinnedSeries::new(1, 250, 480)
    }

    pub fn bin_width_ms(&self) -> u64 {
        self.bin_width_ms
    }

    /// The raw value of `channel` in the bin containing `time`.
    pub fn value(&self, channel: usize, time: u64) -> Option<u64> {
        let bin = self.bins.get(&(time / self.bin_width_ms))?;
        bin.get(channel).copied().flatten()
    }

    /// The byte count of `channel` in the bin containing `time`, as megabits per second.
    pub fn mbps(&self, channel: usize, time: u64) -> Option<f64> {
        let bytes = self.value(channel, time)?;
        let seconds = self.bin_width_ms as f64 / 1000.0;
        Some(bytes as f64 * 8.0 / 1_000_000.0 / seconds)
    }

    /// Iterates over retained bins as `(bin start time, per-channel values)`.
    pub fn bins(&self) -> impl Iterator<Item = (u64, &[Option<u64>])> + '_ {
        self.bins.iter().map(|(index, values)| (index * self.bin_width_ms, values.as_slice()))
    }

    fn slot(&mut self, channel: usize, time: u64) -> Option<&mut Option<u64>> {
        if channel >= self.num_channels {
            return None;
        }
        let index = time / self.bin_width_ms;
        let newest = match self.bins.last_key_value() {
            Some((&newest, _)) => cmp::max(newest, index),
            None => index,
        };
        let oldest_retained = (newest + 1).saturating_sub(self.window_bins as u64);
        if index < oldest_retained {
            return None;
        }
        while let Some(entry) = self.bins.first_entry() {
            if *entry.key() >= oldest_retained {
                break;
            }
            let _expired = entry.remove();
        }
        let num_channels = self.num_channels;
        let values = self.bins.entry(index).or_insert_with(|| vec![None; num_channels]);
        Some(&mut values[channel])
    }
}

impl Metrics for BinnedSeries {
    fn add_value(&mut self, channel: usize, time: u64, value: u64) {
        if let Some(slot) = self.slot(channel, time) {
            *slot = Some(slot.unwrap_or(0) + value);
        }
    }

    fn set_max_value(&mut self, channel: usize, time: u64, value: u64) {
        if let Some(slot) = self.slot(channel, time) {
            *slot = Some(cmp::max(slot.unwrap_or(0), value));
        }
    }
}
