use crate::priv_prelude::*;

/// Error raised when a [`TraceLink`](crate::TraceLink) can't be built.
#[derive(Debug, Error)]
pub enum LinkBuildError {
    #[error("{}: error opening for writing: {}", path.display(), source)]
    LogFile {
        path: PathBuf,
        source: io::Error,
    },
    #[error("{}: error opening live feed: {}", path.display(), source)]
    LiveFeed {
        path: PathBuf,
        source: io::Error,
    },
    #[error("{}: error starting adversary: {}", path.display(), source)]
    Adversary {
        path: PathBuf,
        source: io::Error,
    },
}

/// Builder for creating a [`TraceLink`](crate::TraceLink).
pub struct TraceLinkBuilder {
    name: String,
    schedule: Schedule,
    trace_name: String,
    repeat: bool,
    log_path_opt: Option<PathBuf>,
    command_line: String,
    packet_queue: Box<dyn PacketQueue>,
    clock_opt: Option<ClockOrigin>,
    live_feed_opt: Option<Box<dyn ScheduleFeed>>,
    live_feed_path_opt: Option<PathBuf>,
    adversary_log_path_opt: Option<PathBuf>,
    observers: Vec<Box<dyn LinkObserver>>,
}

impl TraceLinkBuilder {
    /// Starts building a link called `name` (eg. `"Uplink"`) that follows `schedule`.
    ///
    /// By default the link repeats its schedule forever, buffers packets in an
    /// [`InfiniteQueue`](crate::queue::InfiniteQueue), keeps no log and measures time from
    /// [`ClockOrigin::process`](crate::ClockOrigin::process).
    pub fn new(name: impl Into<String>, schedule: Schedule) -> TraceLinkBuilder {
        TraceLinkBuilder {
            name: name.into(),
            schedule,
            trace_name: String::from("<inline>"),
            repeat: true,
            log_path_opt: None,
            command_line: String::new(),
            packet_queue: Box::new(InfiniteQueue::new()),
            clock_opt: None,
            live_feed_opt: None,
            live_feed_path_opt: None,
            adversary_log_path_opt: None,
            observers: Vec::new(),
        }
    }

    /// Starts building a link which follows the trace file at `path`.
    pub fn from_trace_file(
        name: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<TraceLinkBuilder, TraceError> {
        let path = path.as_ref();
        let schedule = Schedule::from_file(path)?;
        let mut builder = TraceLinkBuilder::new(name, schedule);
        builder.trace_name = path.display().to_string();
        Ok(builder)
    }

    /// Uses the schedule only once. After its last opportunity the link is finished.
    pub fn one_shot(mut self) -> Self {
        self.repeat = false;
        self
    }

    /// Writes an event log to `path`.
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path_opt = Some(path.into());
        self
    }

    /// The command line recorded in the event log header.
    pub fn command_line(mut self, command_line: impl Into<String>) -> Self {
        self.command_line = command_line.into();
        self
    }

    /// Buffers packets in `packet_queue` instead of an unbounded queue.
    pub fn queue<Q>(mut self, packet_queue: Q) -> Self
    where
        Q: PacketQueue + 'static,
    {
        self.packet_queue = Box::new(packet_queue);
        self
    }

    /// Buffers packets in an already boxed queue, eg. one from
    /// [`queue::from_config`](crate::queue::from_config).
    pub fn boxed_queue(mut self, packet_queue: Box<dyn PacketQueue>) -> Self {
        self.packet_queue = packet_queue;
        self
    }

    /// Measures time from `clock` instead of the process-wide origin.
    pub fn clock(mut self, clock: ClockOrigin) -> Self {
        self.clock_opt = Some(clock);
        self
    }

    /// Lets `live_feed` replace the schedule while the link runs.
    pub fn live_feed<F>(mut self, live_feed: F) -> Self
    where
        F: ScheduleFeed + 'static,
    {
        self.live_feed_opt = Some(Box::new(live_feed));
        self
    }

    /// Lets rates written to the named pipe at `path` replace the schedule while the link runs.
    /// The pipe is opened when the link is built.
    pub fn live_feed_pipe(mut self, path: impl Into<PathBuf>) -> Self {
        self.live_feed_path_opt = Some(path.into());
        self
    }

    /// Runs an [`Adversary`](crate::Adversary) alongside the link, logging to `path`.
    pub fn adversary_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.adversary_log_path_opt = Some(path.into());
        self
    }

    /// Records capacity, arrivals and departures into `metrics`. See
    /// [`ThroughputRecorder`](crate::metrics::ThroughputRecorder).
    pub fn throughput_graph<M>(self, metrics: M) -> Self
    where
        M: Metrics + 'static,
    {
        self.observer(ThroughputRecorder::new(metrics))
    }

    /// Records the queueing delay of departing packets into `metrics`. See
    /// [`DelayRecorder`](crate::metrics::DelayRecorder).
    pub fn delay_graph<M>(self, metrics: M) -> Self
    where
        M: Metrics + 'static,
    {
        self.observer(DelayRecorder::new(metrics))
    }

    /// Sends every event the link records to `observer`.
    pub fn observer<O>(mut self, observer: O) -> Self
    where
        O: LinkObserver + 'static,
    {
        self.observers.push(Box::new(observer));
        self
    }

    /// Builds the link. Its first period starts now.
    pub fn build(self) -> Result<TraceLink, LinkBuildError> {
        let TraceLinkBuilder {
            name,
            schedule,
            trace_name,
            repeat,
            log_path_opt,
            command_line,
            packet_queue,
            clock_opt,
            live_feed_opt,
            live_feed_path_opt,
            adversary_log_path_opt,
            mut observers,
        } = self;
        let clock = clock_opt.unwrap_or_else(ClockOrigin::process);
        let base_timestamp = clock.now();

        if let Some(log_path) = log_path_opt {
            let header = LogHeader {
                link_name: name.clone(),
                trace: trace_name,
                log_path: log_path.clone(),
                command_line,
                queue: packet_queue.description(),
                init_timestamp: clock.unix_millis(),
                base_timestamp,
            };
            let event_log = match EventLog::create(&header) {
                Ok(event_log) => event_log,
                Err(source) => return Err(LinkBuildError::LogFile { path: log_path, source }),
            };
            observers.insert(0, Box::new(event_log));
        }

        if let Some(adversary_log_path) = adversary_log_path_opt {
            let adversary = match Adversary::spawn(&adversary_log_path, clock) {
                Ok(adversary) => adversary,
                Err(source) => {
                    return Err(LinkBuildError::Adversary { path: adversary_log_path, source });
                },
            };
            observers.push(Box::new(adversary));
        }

        let live_feed_opt = match (live_feed_opt, live_feed_path_opt) {
            (Some(live_feed), _) => Some(live_feed),
            (None, Some(path)) => match LiveFeed::open(&path) {
                Ok(live_feed) => {
                    debug!("{}: reading live rate updates from {}", name, path.display());
                    Some(Box::new(live_feed) as Box<dyn ScheduleFeed>)
                },
                Err(source) => return Err(LinkBuildError::LiveFeed { path, source }),
            },
            (None, None) => None,
        };

        info!("{}: starting {:?} at base timestamp {}", name, schedule, base_timestamp);
        Ok(TraceLink::new(
            name,
            clock,
            schedule,
            base_timestamp,
            repeat,
            packet_queue,
            live_feed_opt,
            observers,
        ))
    }
}
