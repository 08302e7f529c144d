use crate::priv_prelude::*;
use super::recorded_link_with;

/// A feed whose writes are scripted by the test. Reads that find nothing queued would block.
#[derive(Clone, Default)]
struct ScriptedFeed {
    writes: Arc<Mutex<VecDeque<Vec<u8>>>>,
}

impl ScriptedFeed {
    fn write(&self, text: &str) {
        self.writes.lock().unwrap().push_back(text.as_bytes().to_vec());
    }
}

impl Read for ScriptedFeed {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.writes.lock().unwrap().pop_front() {
            Some(write) => {
                let len = cmp::min(buf.len(), write.len());
                buf[..len].copy_from_slice(&write[..len]);
                Ok(len)
            },
            None => Err(io::Error::from(io::ErrorKind::WouldBlock)),
        }
    }
}

struct ClosedFeed;

impl Read for ClosedFeed {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Ok(0)
    }
}

fn rate(text: &str) -> Rate {
    text.parse().unwrap()
}

#[test]
fn reports_only_new_rates() {
    let writer = ScriptedFeed::default();
    let mut feed = LiveFeed::new(writer.clone()).initial_rate(rate("7.5"));

    assert_eq!(feed.poll_rate(), None);

    writer.write("7.5,");
    assert_eq!(feed.poll_rate(), None);

    writer.write("9.0,");
    assert_eq!(feed.poll_rate(), Some(rate("9")));
    assert_eq!(feed.last_sample(), rate("9"));

    writer.write("9,");
    assert_eq!(feed.poll_rate(), None);
}

#[test]
fn uses_the_first_token_of_a_read() {
    let writer = ScriptedFeed::default();
    let mut feed = LiveFeed::new(writer.clone());

    writer.write("12,24,36,");
    assert_eq!(feed.poll_rate(), Some(rate("12")));
    assert_eq!(feed.poll_rate(), None);

    writer.write(",\n 6 ,");
    assert_eq!(feed.poll_rate(), Some(rate("6")));

    writer.write(",,");
    assert_eq!(feed.poll_rate(), None);
}

#[test]
fn first_report_of_zero_is_not_a_change() {
    let writer = ScriptedFeed::default();
    let mut feed = LiveFeed::new(writer.clone());
    writer.write("0,");
    assert_eq!(feed.poll_rate(), None);
}

#[test]
fn closed_feed_never_updates() {
    let mut feed = LiveFeed::new(ClosedFeed).initial_rate(rate("3"));
    assert_eq!(feed.poll_rate(), None);
    assert!(feed.poll_schedule().is_none());
    assert_eq!(feed.last_sample(), rate("3"));
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "unparsable rate")]
fn malformed_rate_is_a_bug() {
    let writer = ScriptedFeed::default();
    let mut feed = LiveFeed::new(writer.clone());
    writer.write("fast,");
    let _ = feed.poll_rate();
}

#[test]
fn schedules_use_the_configured_repetitions() {
    let writer = ScriptedFeed::default();
    let mut feed = LiveFeed::new(writer.clone()).repetitions(2);
    writer.write("24,");
    let schedule = feed.poll_schedule().unwrap();
    assert_eq!(schedule.offsets(), &[1, 1, 2, 2]);
}

#[test]
fn new_rate_replaces_the_link_schedule() {
    let writer = ScriptedFeed::default();
    let feed = LiveFeed::new(writer.clone()).initial_rate(rate("7.5"));
    let (mut link, _recorded) = recorded_link_with({
        TraceLinkBuilder::new("Uplink", "1\n2\n3\n4\n".parse().unwrap())
        .live_feed(feed)
    });
    let base = link.base_timestamp();

    link.evaluate(base + 2);
    assert_eq!(link.next_delivery(), 2);

    writer.write("7.5,");
    link.evaluate(base + 2);
    assert_eq!(link.schedule().offsets(), &[1, 2, 3, 4]);
    assert_eq!(link.base_timestamp(), base);

    writer.write("9.0,");
    link.evaluate(base + 2);
    assert_eq!(link.schedule(), &rate("9").to_schedule(DEFAULT_REPETITIONS).unwrap());
    assert_eq!(link.base_timestamp(), base + 3);
    assert_eq!(link.next_delivery(), 0);
    assert_eq!(link.time_until_next_action(base + 2), Some(5));
}

#[test]
fn unterminated_reads_are_ignored() {
    let writer = ScriptedFeed::default();
    let mut feed = LiveFeed::new(writer.clone()).initial_rate(rate("3"));

    writer.write("7.");
    assert_eq!(feed.poll_rate(), None);
    assert_eq!(feed.last_sample(), rate("3"));

    // Only terminated tokens count, even when a partial one trails them.
    writer.write("7.5,12");
    assert_eq!(feed.poll_rate(), Some(rate("7.5")));
}

#[test]
fn rates_with_oversized_schedules_keep_the_current_schedule() {
    let writer = ScriptedFeed::default();
    let feed = LiveFeed::new(writer.clone()).initial_rate(rate("7.5"));
    let (mut link, _recorded) = recorded_link_with({
        TraceLinkBuilder::new("Uplink", "1\n2\n3\n4\n".parse().unwrap())
        .live_feed(feed)
    });
    let base = link.base_timestamp();

    writer.write("9999999999999999999,");
    link.evaluate(base + 1);
    writer.write("7.123456789,");
    link.evaluate(base + 2);
    assert_eq!(link.schedule().offsets(), &[1, 2, 3, 4]);
    assert_eq!(link.base_timestamp(), base);
    assert_eq!(link.next_delivery(), 2);

    writer.write("24,");
    link.evaluate(base + 2);
    assert_eq!(link.schedule(), &rate("24").to_schedule(DEFAULT_REPETITIONS).unwrap());
    assert_eq!(link.base_timestamp(), base + 3);
}

#[test]
fn oversized_rate_is_not_remembered() {
    let writer = ScriptedFeed::default();
    let mut feed = LiveFeed::new(writer.clone()).initial_rate(rate("9"));
    writer.write("7.123456789,");
    assert!(feed.poll_schedule().is_none());
    assert_eq!(feed.last_sample(), rate("9"));
}
