use crate::priv_prelude::*;

/// Name of the environment variable whose value, when set, is recorded in event log headers.
pub const SHELL_PREFIX_VAR: &str = "LINK_SHELL_PREFIX";

/// The descriptive block written at the top of an event log.
#[derive(Clone, Debug)]
pub struct LogHeader {
    pub link_name: String,
    pub trace: String,
    pub log_path: PathBuf,
    pub command_line: String,
    pub queue: String,
    pub init_timestamp: u64,
    pub base_timestamp: u64,
}

impl LogHeader {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(
            writer,
            "# tracelink ({}) [{}] > {}",
            self.link_name, self.trace, self.log_path.display(),
        )?;
        writeln!(writer, "# command line: {}", self.command_line)?;
        writeln!(writer, "# queue: {}", self.queue)?;
        writeln!(writer, "# init timestamp: {}", self.init_timestamp)?;
        writeln!(writer, "# base timestamp: {}", self.base_timestamp)?;
        if let Ok(prefix) = std::env::var(SHELL_PREFIX_VAR) {
            writeln!(writer, "# shell prefix: {}", prefix)?;
        }
        Ok(())
    }
}

/// An append-only, line-oriented record of everything that happened on a link, for offline
/// analysis.
///
/// ```text
/// <time> + <size>                    packet arrival
/// <time> d <packets> <bytes>         drop
/// <time> # <opportunity size>        delivery opportunity
/// <time> - <size> <queueing delay>   departure
/// ```
pub struct EventLog {
    writer: Box<dyn Write + Send>,
    failed: bool,
}

impl EventLog {
    /// Creates (or truncates) the log file at `header.log_path` and writes the header.
    pub fn create(header: &LogHeader) -> io::Result<EventLog> {
        let file = File::create(&header.log_path)?;
        EventLog::with_writer(LineWriter::new(file), header)
    }

    /// Writes the header to an arbitrary writer and logs to it from then on.
    pub fn with_writer<W>(mut writer: W, header: &LogHeader) -> io::Result<EventLog>
    where
        W: Write + Send + 'static,
    {
        header.write_to(&mut writer)?;
        writer.flush()?;
        Ok(EventLog {
            writer: Box::new(writer),
            failed: false,
        })
    }
}

impl LinkObserver for EventLog {
    fn observe(&mut self, event: &LinkEvent) {
        if self.failed {
            return;
        }
        if let Err(err) = writeln!(self.writer, "{}", event) {
            warn!("event log write failed, no further events will be logged: {}", err);
            self.failed = true;
        }
    }
}

impl Drop for EventLog {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}
