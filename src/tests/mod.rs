use crate::priv_prelude::*;

mod live_feed;
mod metrics;
mod properties;

/// Events recorded by a link, shared with the test that built it.
pub(crate) type Recorded = Arc<Mutex<Vec<LinkEvent>>>;

pub(crate) fn recorded() -> Recorded {
    Arc::new(Mutex::new(Vec::new()))
}

pub(crate) fn events(recorded: &Recorded) -> Vec<LinkEvent> {
    recorded.lock().unwrap().clone()
}

pub(crate) fn departures(recorded: &Recorded) -> Vec<(u64, usize, u64)> {
    events(recorded)
    .into_iter()
    .filter_map(|event| match event {
        LinkEvent::Departure { time, size, delay } => Some((time, size, delay)),
        _ => None,
    })
    .collect()
}

pub(crate) fn opportunity_times(recorded: &Recorded) -> Vec<u64> {
    events(recorded)
    .into_iter()
    .filter_map(|event| match event {
        LinkEvent::Opportunity { time, .. } => Some(time),
        _ => None,
    })
    .collect()
}

/// Builds a repeating link over `trace` with an unbounded queue, recording its events.
pub(crate) fn recorded_link(trace: &str) -> (TraceLink, Recorded) {
    recorded_link_with({
        TraceLinkBuilder::new("Uplink", trace.parse().unwrap())
        .clock(ClockOrigin::new())
    })
}

pub(crate) fn recorded_link_with(builder: TraceLinkBuilder) -> (TraceLink, Recorded) {
    let recorded = recorded();
    let link = {
        builder
        .observer(recorded.clone())
        .build()
        .unwrap()
    };
    (link, recorded)
}

pub(crate) fn packet(len: usize) -> Bytes {
    Bytes::from(vec![0xa5u8; len])
}

/// A log shared between whatever writes it (possibly on another thread) and the test.
#[derive(Clone, Default)]
pub(crate) struct SharedLog {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedLog {
    pub(crate) fn lines(&self) -> Vec<String> {
        let bytes = self.bytes.lock().unwrap();
        String::from_utf8_lossy(&bytes).lines().map(String::from).collect()
    }
}

impl Write for SharedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
