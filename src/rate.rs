use crate::priv_prelude::*;

/// One delivery opportunity per millisecond carries 1504 bytes, ie. roughly 12 Mbps.
pub const MBPS_PER_OPPORTUNITY_PER_MS: u64 = 12;

/// How many times the minimal repeating pattern is unrolled when a rate is turned into a
/// schedule.
pub const DEFAULT_REPETITIONS: u64 = 5;

/// Period of the schedule generated for a zero rate: a single opportunity per day.
pub const IDLE_PERIOD_MS: u64 = 24 * 60 * 60 * 1000;

/// The most decimal digits a rate may carry after the point.
const MAX_FRACTION_DIGITS: u32 = 12;

/// The most opportunities a generated schedule may hold.
pub const MAX_SCHEDULE_LEN: u64 = 1_000_000;

/// Error raised when a textual rate can't be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateParseError {
    #[error("empty rate")]
    Empty,
    #[error("invalid rate {0:?}")]
    Invalid(String),
    #[error("rate {0:?} has too many digits")]
    TooPrecise(String),
}

/// Error raised when a rate can't be turned into a schedule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleLengthError {
    #[error("rate {rate} needs more than {max} opportunities per schedule")]
    TooLong {
        rate: Rate,
        max: u64,
    },
}

/// A link rate in Mbps, held as an exact reduced fraction so that any terminating decimal is
/// represented without rounding.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Rate {
    numerator: u64,
    denominator: u64,
}

impl Rate {
    pub const ZERO: Rate = Rate { numerator: 0, denominator: 1 };

    /// Creates the rate `numerator / denominator` Mbps. Panics if `denominator` is zero.
    pub fn from_fraction(numerator: u64, denominator: u64) -> Rate {
        assert!(denominator != 0, "rate denominator must be non-zero");
        let divisor = gcd(numerator, denominator);
        Rate {
            numerator: numerator / divisor,
            denominator: denominator / divisor,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.numerator == 0
    }

    pub fn as_mbps(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// The rate in delivery opportunities per millisecond, as a reduced `(numerator,
    /// denominator)` pair.
    pub fn opportunities_per_ms(&self) -> (u64, u64) {
        let numerator = self.numerator as u128;
        let denominator = self.denominator as u128 * MBPS_PER_OPPORTUNITY_PER_MS as u128;
        let divisor = gcd_u128(numerator, denominator);
        ((numerator / divisor) as u64, (denominator / divisor) as u64)
    }

    /// Builds the shortest repeating integer schedule that delivers exactly this rate.
    ///
    /// With the rate reduced to `n / d` opportunities per millisecond, the schedule fires `n`
    /// opportunities together every `d` milliseconds, unrolled `repetitions` times. Offsets
    /// start at `d` so that the schedule's period is exactly `repetitions * d`. A zero rate
    /// yields a single opportunity after [`IDLE_PERIOD_MS`](crate::IDLE_PERIOD_MS). Rates whose
    /// schedule would exceed [`MAX_SCHEDULE_LEN`](crate::MAX_SCHEDULE_LEN) opportunities are
    /// refused.
    pub fn to_schedule(&self, repetitions: u64) -> Result<Schedule, ScheduleLengthError> {
        let (count, interval) = self.opportunities_per_ms();
        let repetitions = cmp::max(repetitions, 1);
        if count == 0 {
            return Ok(Schedule::from_offsets_unchecked(vec![IDLE_PERIOD_MS]));
        }
        let too_long = ScheduleLengthError::TooLong { rate: *self, max: MAX_SCHEDULE_LEN };
        let len = match count.checked_mul(repetitions) {
            Some(len) if len <= MAX_SCHEDULE_LEN => len,
            _ => return Err(too_long),
        };
        if interval.checked_mul(repetitions).is_none() {
            return Err(too_long);
        }
        let mut offsets = Vec::with_capacity(len as usize);
        for repetition in 1..=repetitions {
            let offset = repetition * interval;
            offsets.extend((0..count).map(|_| offset));
        }
        Ok(Schedule::from_offsets_unchecked(offsets))
    }
}

impl FromStr for Rate {
    type Err = RateParseError;

    /// Parses a non-negative decimal such as `"7.5"` or `"12"` exactly.
    fn from_str(s: &str) -> Result<Rate, RateParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RateParseError::Empty);
        }
        let (whole, fraction) = match s.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (s, ""),
        };
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
            return Err(RateParseError::Invalid(s.to_owned()));
        }
        let fraction = fraction.trim_end_matches('0');
        if fraction.len() > MAX_FRACTION_DIGITS as usize {
            return Err(RateParseError::TooPrecise(s.to_owned()));
        }

        let too_precise = || RateParseError::TooPrecise(s.to_owned());
        let mut numerator: u64 = 0;
        for digit in whole.bytes().chain(fraction.bytes()) {
            numerator = numerator
                .checked_mul(10)
                .and_then(|n| n.checked_add(u64::from(digit - b'0')))
                .ok_or_else(too_precise)?;
        }
        let denominator = 10u64.pow(fraction.len() as u32);
        Ok(Rate::from_fraction(numerator, denominator))
    }
}

impl fmt::Debug for Rate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{} Mbps", self.numerator)
        } else {
            write!(f, "{}/{} Mbps", self.numerator, self.denominator)
        }
    }
}

fn gcd(mut x: u64, mut y: u64) -> u64 {
    while y > 0 {
        let r = x % y;
        x = y;
        y = r;
    }
    cmp::max(x, 1)
}

fn gcd_u128(mut x: u128, mut y: u128) -> u128 {
    while y > 0 {
        let r = x % y;
        x = y;
        y = r;
    }
    cmp::max(x, 1)
}
