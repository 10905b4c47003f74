//! Exact trace timestamps
//!
//! Scheduler traces print timestamps as `SECONDS.FRACTION` (microsecond
//! resolution by default, nanoseconds with `perf sched script --ns`).
//! They are kept as integral nanoseconds so that ordering, subtraction and
//! equality of distribution times are exact.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const NANOS_PER_SEC: u64 = 1_000_000_000;
const FRACTION_DIGITS: usize = 9;

/// Errors produced when a timestamp field cannot be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("timestamp is empty")]
    Empty,

    #[error("timestamp contains a non-digit: {0:?}")]
    InvalidDigit(String),

    #[error("timestamp overflows the nanosecond range: {0:?}")]
    Overflow(String),
}

/// A point on the trace clock, in nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The trace clock origin
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    pub fn as_nanos(self) -> u64 {
        self.0
    }

    /// Elapsed time from `earlier` to `self`, zero if `earlier` is later
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

impl FromStr for Timestamp {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(TimestampError::Empty);
        }

        let (secs, fraction) = s.split_once('.').unwrap_or((s, ""));
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if secs.is_empty() || !all_digits(secs) || !all_digits(fraction) {
            return Err(TimestampError::InvalidDigit(s.to_string()));
        }

        let overflow = || TimestampError::Overflow(s.to_string());
        let secs: u64 = secs.parse().map_err(|_| overflow())?;

        // Right-pad to nanoseconds; anything finer is truncated
        let mut nanos: u64 = 0;
        for i in 0..FRACTION_DIGITS {
            let digit = fraction.as_bytes().get(i).map_or(0, |b| u64::from(b - b'0'));
            nanos = nanos * 10 + digit;
        }

        secs.checked_mul(NANOS_PER_SEC)
            .and_then(|n| n.checked_add(nanos))
            .map(Timestamp)
            .ok_or_else(overflow)
    }
}

impl fmt::Display for Timestamp {
    /// Renders as seconds with at least microsecond precision, matching
    /// the layout the trace itself uses
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_seconds(self.0))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Format a nanosecond count as `SECONDS.FRACTION`, trimming trailing
/// zeros but keeping six fractional digits
pub fn format_seconds(nanos: u64) -> String {
    let secs = nanos / NANOS_PER_SEC;
    let frac = format!("{:09}", nanos % NANOS_PER_SEC);
    let trimmed = frac.trim_end_matches('0');
    let keep = trimmed.len().max(6);
    format!("{}.{}", secs, &frac[..keep])
}

/// Format a duration the same way timestamps are formatted
pub fn format_duration(duration: Duration) -> String {
    format_seconds(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_microsecond_timestamp() {
        let ts: Timestamp = "7890.123456".parse().unwrap();
        assert_eq!(ts.as_nanos(), 7_890_123_456_000);
    }

    #[test]
    fn test_parse_nanosecond_timestamp() {
        let ts: Timestamp = "12.000000789".parse().unwrap();
        assert_eq!(ts.as_nanos(), 12_000_000_789);
    }

    #[test]
    fn test_parse_truncates_sub_nanosecond_digits() {
        let ts: Timestamp = "1.0000000019".parse().unwrap();
        assert_eq!(ts.as_nanos(), 1_000_000_001);
    }

    #[test]
    fn test_parse_whole_seconds() {
        let ts: Timestamp = "20".parse().unwrap();
        assert_eq!(ts.as_nanos(), 20 * NANOS_PER_SEC);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!("".parse::<Timestamp>(), Err(TimestampError::Empty));
        assert!(matches!(
            "12.3a".parse::<Timestamp>(),
            Err(TimestampError::InvalidDigit(_))
        ));
        assert!(matches!(
            ".5".parse::<Timestamp>(),
            Err(TimestampError::InvalidDigit(_))
        ));
        assert!(matches!(
            "99999999999999999999.0".parse::<Timestamp>(),
            Err(TimestampError::Overflow(_))
        ));
    }

    #[test]
    fn test_display_keeps_microseconds() {
        let ts: Timestamp = "20.5".parse().unwrap();
        assert_eq!(ts.to_string(), "20.500000");

        let ts: Timestamp = "3.000000125".parse().unwrap();
        assert_eq!(ts.to_string(), "3.000000125");
    }

    #[test]
    fn test_saturating_since() {
        let early: Timestamp = "8.0".parse().unwrap();
        let late: Timestamp = "20.0".parse().unwrap();
        assert_eq!(late.saturating_since(early), Duration::from_secs(12));
        assert_eq!(early.saturating_since(late), Duration::ZERO);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_micros(1500)), "0.001500");
    }
}
