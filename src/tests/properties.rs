use crate::priv_prelude::*;
use crate::queue::{DropHeadQueue, DropTailQueue, QueueLimits};
use proptest::prelude::*;
use super::{events, packet, recorded_link_with};

fn schedule_from(mut offsets: Vec<u64>) -> Schedule {
    offsets.sort_unstable();
    let period = offsets.last().copied().unwrap_or(0) + 1;
    offsets.push(period);
    Schedule::new(offsets).unwrap()
}

proptest! {
    /// Every admitted byte eventually either departs or is dropped, no opportunity carries more
    /// than its size, and packets leave in the order they arrived with a delay equal to the time
    /// they spent on the link.
    #[test]
    fn link_conserves_bytes_and_order(
        offsets in prop::collection::vec(0u64..20, 0..16),
        arrivals in prop::collection::vec((0u64..5, 1usize..=MAX_OPPORTUNITY_BYTES), 0..60),
        queue_limit in 1usize..8,
    ) {
        let schedule = schedule_from(offsets);
        let period = schedule.period();
        let queue = DropTailQueue::new(QueueLimits { packets: Some(queue_limit), bytes: None }).unwrap();
        let (mut link, recorded) = recorded_link_with({
            TraceLinkBuilder::new("Uplink", schedule)
            .queue(queue)
        });

        let mut now = link.base_timestamp();
        for (gap, size) in &arrivals {
            now += gap;
            link.admit(packet(*size), now).unwrap();
        }
        link.evaluate(now + period * (arrivals.len() as u64 + 1));
        prop_assert!(!link.has_backlog());

        let mut admitted = 0;
        let mut dropped = 0;
        let mut departed = 0;
        let mut capacity = 0;
        let mut in_flight = VecDeque::new();
        for event in events(&recorded) {
            match event {
                LinkEvent::Arrival { time, size } => {
                    admitted += size;
                    in_flight.push_back((time, size));
                },
                LinkEvent::Drop { packets, bytes, .. } => {
                    prop_assert_eq!(packets, 1);
                    let (_, size) = in_flight.pop_back().unwrap();
                    prop_assert_eq!(bytes, size);
                    dropped += bytes;
                },
                LinkEvent::Opportunity { size, .. } => capacity += size,
                LinkEvent::Departure { time, size, delay } => {
                    departed += size;
                    prop_assert!(departed <= capacity);
                    let (arrival_time, arrival_size) = in_flight.pop_front().unwrap();
                    prop_assert_eq!(size, arrival_size);
                    prop_assert_eq!(delay, time - arrival_time);
                },
            }
        }
        prop_assert!(in_flight.is_empty());
        prop_assert_eq!(departed + dropped, admitted);
        prop_assert_eq!(link.drain_output().count(), arrivals.len() - dropped_packets(&recorded));
    }

    /// A queue that evicts packets other than the one being admitted still accounts for every
    /// byte, and never loses a packet that has started crossing the link.
    #[test]
    fn head_drops_conserve_bytes(
        offsets in prop::collection::vec(0u64..20, 0..16),
        arrivals in prop::collection::vec((0u64..5, 1usize..=MAX_OPPORTUNITY_BYTES), 0..60),
        byte_limit in 1usize..6000,
    ) {
        let schedule = schedule_from(offsets);
        let period = schedule.period();
        let queue = DropHeadQueue::new(QueueLimits { packets: None, bytes: Some(byte_limit) }).unwrap();
        let (mut link, recorded) = recorded_link_with({
            TraceLinkBuilder::new("Uplink", schedule)
            .queue(queue)
        });

        let mut now = link.base_timestamp();
        for (gap, size) in &arrivals {
            now += gap;
            link.admit(packet(*size), now).unwrap();
        }
        link.evaluate(now + period * (arrivals.len() as u64 + 1));
        prop_assert!(!link.has_backlog());

        let mut admitted = 0;
        let mut dropped = 0;
        let mut departed = 0;
        let mut capacity = 0;
        for event in events(&recorded) {
            match event {
                LinkEvent::Arrival { size, .. } => admitted += size,
                LinkEvent::Drop { packets, bytes, .. } => {
                    prop_assert!(packets >= 1);
                    dropped += bytes;
                },
                LinkEvent::Opportunity { size, .. } => capacity += size,
                LinkEvent::Departure { size, .. } => {
                    departed += size;
                    prop_assert!(departed <= capacity);
                },
            }
        }
        prop_assert_eq!(departed + dropped, admitted);
    }

    /// The average rate of a generated schedule is exactly the requested rate.
    #[test]
    fn generated_schedules_have_exact_rates(
        numerator in 1u64..100_000,
        denominator in prop::sample::select(vec![1u64, 2, 10, 100, 1000]),
        repetitions in 1u64..6,
    ) {
        let rate = Rate::from_fraction(numerator, denominator);
        let (count, interval) = rate.opportunities_per_ms();
        let schedule = rate.to_schedule(repetitions).unwrap();
        prop_assert_eq!(schedule.len() as u64, count * repetitions);
        prop_assert_eq!(schedule.period(), interval * repetitions);

        // opportunities per ms * 12 == Mbps
        let lhs = schedule.len() as u128 * MBPS_PER_OPPORTUNITY_PER_MS as u128 * denominator as u128;
        let rhs = schedule.period() as u128 * numerator as u128;
        prop_assert_eq!(lhs, rhs);
    }
}

fn dropped_packets(recorded: &super::Recorded) -> usize {
    events(recorded)
    .iter()
    .map(|event| match event {
        LinkEvent::Drop { packets, .. } => *packets,
        _ => 0,
    })
    .sum()
}
