use crate::priv_prelude::*;

/// The most bytes a single delivery opportunity can carry. This is the default maximum TUN
/// payload size.
pub const MAX_OPPORTUNITY_BYTES: usize = 1504;

/// Error raised when a trace can't be loaded into a [`Schedule`](crate::Schedule).
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("{}: error opening for reading: {}", path.display(), source)]
    Open {
        path: PathBuf,
        source: io::Error,
    },
    #[error("error reading trace: {0}")]
    Read(#[from] io::Error),
    #[error("line {line}: invalid empty line")]
    EmptyLine {
        line: usize,
    },
    #[error("line {line}: invalid timestamp {text:?}")]
    InvalidTimestamp {
        line: usize,
        text: String,
    },
    #[error("line {line}: timestamps must be monotonically nondecreasing")]
    Decreasing {
        line: usize,
    },
    #[error("no valid timestamps found")]
    Empty,
    #[error("trace must last for a nonzero amount of time")]
    ZeroDuration,
}

/// The delivery opportunities of one period of a link's trace.
///
/// Each entry is a millisecond offset, relative to the start of the period, at which up to
/// [`MAX_OPPORTUNITY_BYTES`](crate::MAX_OPPORTUNITY_BYTES) may leave the link. Offsets never
/// decrease, and the last offset is the length of the period so it is always non-zero.
#[derive(Clone, PartialEq, Eq)]
pub struct Schedule {
    offsets: Vec<u64>,
}

impl Schedule {
    /// Validates `offsets` and wraps them in a `Schedule`.
    pub fn new(offsets: Vec<u64>) -> Result<Schedule, TraceError> {
        for (index, pair) in offsets.windows(2).enumerate() {
            if pair[1] < pair[0] {
                return Err(TraceError::Decreasing { line: index + 2 });
            }
        }
        match offsets.last() {
            None => Err(TraceError::Empty),
            Some(0) => Err(TraceError::ZeroDuration),
            Some(_) => Ok(Schedule { offsets }),
        }
    }

    /// Wraps offsets already known to be non-empty, non-decreasing and to end above zero.
    pub(crate) fn from_offsets_unchecked(offsets: Vec<u64>) -> Schedule {
        debug_assert!(offsets.windows(2).all(|pair| pair[0] <= pair[1]));
        debug_assert!(offsets.last().map_or(false, |&period| period > 0));
        Schedule { offsets }
    }

    /// Loads a trace file: one millisecond offset per line.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Schedule, TraceError> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(source) => {
                return Err(TraceError::Open { path: path.to_owned(), source });
            },
        };
        Schedule::from_reader(BufReader::new(file))
    }

    /// Parses a trace from any buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Schedule, TraceError> {
        let mut offsets: Vec<u64> = Vec::new();
        for (index, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_number = index + 1;
            if line.is_empty() {
                return Err(TraceError::EmptyLine { line: line_number });
            }
            let offset = match line.trim().parse::<u64>() {
                Ok(offset) => offset,
                Err(_) => {
                    return Err(TraceError::InvalidTimestamp {
                        line: line_number,
                        text: line,
                    });
                },
            };
            if let Some(&prev) = offsets.last() {
                if offset < prev {
                    return Err(TraceError::Decreasing { line: line_number });
                }
            }
            offsets.push(offset);
        }
        Schedule::new(offsets)
    }

    /// The number of delivery opportunities in one period.
    #[cfg_attr(feature="cargo-clippy", allow(clippy::len_without_is_empty))]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// The offset of the opportunity at `index`. Panics if `index` is out of range.
    pub fn offset(&self, index: usize) -> u64 {
        self.offsets[index]
    }

    /// The length of one period in milliseconds. Always non-zero.
    pub fn period(&self) -> u64 {
        self.offsets[self.offsets.len() - 1]
    }

    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }
}

impl FromStr for Schedule {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Schedule, TraceError> {
        Schedule::from_reader(s.as_bytes())
    }
}

impl fmt::Debug for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Schedule({} opportunities / {}ms)", self.len(), self.period())
    }
}
