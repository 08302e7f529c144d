use crate::priv_prelude::*;

/// How often the adversary's probe thread samples the link.
pub const PROBE_PERIOD: Duration = Duration::from_millis(100);

/// What the adversary saw of the link during one probe period.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProbeWindow {
    pub opportunities: u64,
    pub departures: u64,
    pub capacity_bytes: u64,
    pub departed_bytes: u64,
    /// Queueing delay of the most recent departure. Carried over into the next window.
    pub queueing_delay: u64,
}

impl ProbeWindow {
    pub fn observe(&mut self, event: &LinkEvent) {
        match *event {
            LinkEvent::Opportunity { size, .. } => {
                self.opportunities += 1;
                self.capacity_bytes += size as u64;
            },
            LinkEvent::Departure { size, delay, .. } => {
                self.departures += 1;
                self.departed_bytes += size as u64;
                self.queueing_delay = delay;
            },
            LinkEvent::Arrival { .. } | LinkEvent::Drop { .. } => (),
        }
    }

    /// Fraction of the offered capacity that was used, or zero if there was no capacity.
    pub fn link_utilization(&self) -> f64 {
        if self.capacity_bytes == 0 {
            0.0
        } else {
            self.departed_bytes as f64 / self.capacity_bytes as f64
        }
    }

    fn next(&self) -> ProbeWindow {
        ProbeWindow {
            queueing_delay: self.queueing_delay,
            ..ProbeWindow::default()
        }
    }
}

/// Everything the adversary saw between being spawned and being stopped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdversaryTotals {
    pub opportunities: u64,
    pub departures: u64,
    pub capacity_bytes: u64,
    pub departed_bytes: u64,
    pub probes: u64,
}

impl AdversaryTotals {
    fn absorb(&mut self, window: &ProbeWindow) {
        self.opportunities += window.opportunities;
        self.departures += window.departures;
        self.capacity_bytes += window.capacity_bytes;
        self.departed_bytes += window.departed_bytes;
        self.probes += 1;
    }
}

/// Tracks how much of a link's capacity is being used and how long packets are queueing.
///
/// The adversary is a [`LinkObserver`](crate::LinkObserver): the link posts its opportunity and
/// departure events into a channel, and a background thread folds them into a
/// [`ProbeWindow`](crate::ProbeWindow) and every [`PROBE_PERIOD`](crate::PROBE_PERIOD) writes
/// `<time> <link utilization> <queueing delay>` to the adversary's log. Dropping the adversary
/// (or calling [`stop`](crate::Adversary::stop)) signals the thread and waits for it to exit.
pub struct Adversary {
    event_tx: mpsc::UnboundedSender<LinkEvent>,
    stop_tx_opt: Option<oneshot::Sender<()>>,
    join_handle_opt: Option<thread::JoinHandle<io::Result<AdversaryTotals>>>,
}

impl Adversary {
    /// Creates the adversary's log file and starts probing.
    pub fn spawn(log_path: impl AsRef<Path>, clock: ClockOrigin) -> io::Result<Adversary> {
        let file = File::create(log_path)?;
        Adversary::with_writer(LineWriter::new(file), clock)
    }

    /// Starts probing, logging to `writer`.
    pub fn with_writer<W>(writer: W, clock: ClockOrigin) -> io::Result<Adversary>
    where
        W: Write + Send + 'static,
    {
        let (event_tx, event_rx) = mpsc::unbounded();
        let (stop_tx, stop_rx) = oneshot::channel();
        let join_handle = {
            thread::Builder::new()
            .name(String::from("adversary-probe"))
            .spawn(move || probe_loop(writer, clock, event_rx, stop_rx))?
        };
        Ok(Adversary {
            event_tx,
            stop_tx_opt: Some(stop_tx),
            join_handle_opt: Some(join_handle),
        })
    }

    /// Stops the probe thread, waits for it to flush its log and returns what it saw.
    pub fn stop(mut self) -> io::Result<AdversaryTotals> {
        self.stop_inner()
    }

    fn stop_inner(&mut self) -> io::Result<AdversaryTotals> {
        if let Some(stop_tx) = self.stop_tx_opt.take() {
            let _ = stop_tx.send(());
        }
        match self.join_handle_opt.take() {
            None => Ok(AdversaryTotals::default()),
            Some(join_handle) => match join_handle.join() {
                Ok(res) => res,
                Err(_panic) => Err(io::Error::new(io::ErrorKind::Other, "adversary probe thread panicked")),
            },
        }
    }
}

impl LinkObserver for Adversary {
    fn observe(&mut self, event: &LinkEvent) {
        match event {
            LinkEvent::Opportunity { .. } | LinkEvent::Departure { .. } => {
                let _ = self.event_tx.unbounded_send(*event);
            },
            LinkEvent::Arrival { .. } | LinkEvent::Drop { .. } => (),
        }
    }
}

impl Drop for Adversary {
    fn drop(&mut self) {
        if let Err(err) = self.stop_inner() {
            warn!("adversary probe thread failed: {}", err);
        }
    }
}

fn probe_loop<W: Write>(
    mut writer: W,
    clock: ClockOrigin,
    mut event_rx: mpsc::UnboundedReceiver<LinkEvent>,
    stop_rx: oneshot::Receiver<()>,
) -> io::Result<AdversaryTotals> {
    writeln!(
        writer,
        "# adversary probe every {}ms: <time> <link utilization> <queueing delay>",
        PROBE_PERIOD.as_millis(),
    )?;
    let mut totals = AdversaryTotals::default();
    let mut window = ProbeWindow::default();
    loop {
        let stopping = match stop_rx.recv_timeout(PROBE_PERIOD) {
            Err(oneshot::RecvTimeoutError::Timeout) => false,
            Ok(()) | Err(oneshot::RecvTimeoutError::Disconnected) => true,
        };
        while let Ok(Some(event)) = event_rx.try_next() {
            window.observe(&event);
        }
        writeln!(
            writer,
            "{} {:.4} {}",
            clock.now(),
            window.link_utilization(),
            window.queueing_delay,
        )?;
        totals.absorb(&window);
        window = window.next();
        if stopping {
            break;
        }
    }
    writer.flush()?;
    trace!("adversary probe thread exiting after {} probes", totals.probes);
    Ok(totals)
}
