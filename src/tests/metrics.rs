use crate::priv_prelude::*;
use crate::metrics::{ARRIVAL_CHANNEL, CAPACITY_CHANNEL, DELAY_CHANNEL, DEPARTURE_CHANNEL};
use super::{packet, recorded_link_with};

#[test]
fn accumulates_values_per_bin() {
    let mut series = BinnedSeries::new(2, 100, 10);
    series.add_value(0, 10, 5);
    series.add_value(0, 99, 7);
    series.add_value(0, 100, 1);
    series.set_max_value(1, 20, 3);
    series.set_max_value(1, 30, 2);

    assert_eq!(series.value(0, 50), Some(12));
    assert_eq!(series.value(0, 150), Some(1));
    assert_eq!(series.value(1, 0), Some(3));
    assert_eq!(series.value(1, 100), None);
    assert_eq!(series.value(0, 500), None);

    // Unknown channels are ignored.
    series.add_value(2, 10, 5);
    assert_eq!(series.value(2, 10), None);

    let bins: Vec<u64> = series.bins().map(|(start, _)| start).collect();
    assert_eq!(bins, vec![0, 100]);
}

#[test]
fn keeps_a_sliding_window() {
    let mut series = BinnedSeries::new(1, 10, 3);
    for time in (0..100).step_by(10) {
        series.add_value(0, time, 1);
    }
    let bins: Vec<u64> = series.bins().map(|(start, _)| start).collect();
    assert_eq!(bins, vec![70, 80, 90]);

    // Samples older than the window are dropped.
    series.add_value(0, 5, 1);
    assert_eq!(series.value(0, 5), None);
}

#[test]
fn converts_bytes_to_mbps() {
    let mut series = BinnedSeries::throughput();
    series.add_value(CAPACITY_CHANNEL, 0, 62_500);
    let mbps = series.mbps(CAPACITY_CHANNEL, 0).unwrap();
    assert!((mbps - 1.0).abs() < 1e-9);
}

#[test]
fn link_feeds_throughput_and_delay() {
    let throughput = Arc::new(Mutex::new(BinnedSeries::throughput()));
    let delay = Arc::new(Mutex::new(BinnedSeries::delay()));
    let (mut link, _recorded) = recorded_link_with({
        TraceLinkBuilder::new("Uplink", "10\n20\n".parse().unwrap())
        .clock(ClockOrigin::new())
        .throughput_graph(throughput.clone())
        .delay_graph(delay.clone())
    });
    let base = link.base_timestamp();

    link.admit(packet(1000), base).unwrap();
    link.admit(packet(1000), base + 2).unwrap();
    link.evaluate(base + 20);

    let throughput = throughput.lock().unwrap();
    let width = throughput.bin_width_ms();
    let total = |channel: usize| {
        throughput
        .bins()
        .filter_map(|(_, values)| values[channel])
        .sum::<u64>()
    };
    assert_eq!(width, 500);
    assert_eq!(total(CAPACITY_CHANNEL), 2 * MAX_OPPORTUNITY_BYTES as u64);
    assert_eq!(total(ARRIVAL_CHANNEL), 2000);
    assert_eq!(total(DEPARTURE_CHANNEL), 2000);

    let delay = delay.lock().unwrap();
    let max_delay = {
        delay
        .bins()
        .filter_map(|(_, values)| values[DELAY_CHANNEL])
        .max()
    };
    assert_eq!(max_delay, Some(18));
}
