//! Retention age expressions
//!
//! An age is either relative to now (`35d`, `24h`, `1.5h`, `1h30m...h`
//! compounds ending in hours) or an absolute timestamp such as
//! `2006-01-02 15:04:05.999999999`. Both resolve to a cutoff instant; rows
//! older than the cutoff are eligible for cleanup.

use crate::error::{CptError, Result};
use chrono::{Duration, Local, NaiveDateTime};

/// Timestamp layout accepted for absolute ages, fraction optional
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A parsed retention age
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Age {
    /// Strictly positive span subtracted from now
    Relative(Duration),
    /// Literal cutoff instant
    Absolute(NaiveDateTime),
}

impl Age {
    /// Parse an age expression
    pub fn parse(expr: &str) -> Result<Self> {
        let invalid = || CptError::AgeFormat(expr.to_string());

        let span = if let Some(days) = expr.strip_suffix('d') {
            let days: i64 = days.parse().map_err(|_| invalid())?;
            let hours = days.checked_mul(24).ok_or_else(invalid)?;
            Some(parse_duration(&format!("{}h", hours)).ok_or_else(invalid)?)
        } else if expr.ends_with('h') {
            Some(parse_duration(expr).ok_or_else(invalid)?)
        } else {
            None
        };

        match span {
            Some(span) if span > Duration::zero() => Ok(Self::Relative(span)),
            Some(_) => Err(invalid()),
            None => NaiveDateTime::parse_from_str(expr, TIMESTAMP_FORMAT)
                .map(Self::Absolute)
                .map_err(|_| invalid()),
        }
    }

    /// Cutoff instant relative to `now`
    pub fn cutoff_at(&self, now: NaiveDateTime) -> NaiveDateTime {
        match self {
            Self::Relative(span) => now - *span,
            Self::Absolute(instant) => *instant,
        }
    }

    /// Cutoff instant relative to the local wall clock
    ///
    /// Engine timestamp columns hold local time without a zone.
    pub fn cutoff(&self) -> NaiveDateTime {
        self.cutoff_at(Local::now().naive_local())
    }
}

/// Parse a duration such as `300ms`, `-1.5h` or `2h45m`
///
/// Accepts an optional sign followed by one or more decimal numbers, each
/// with a unit of `ns`, `us` (`µs`), `ms`, `s`, `m` or `h`. Returns `None`
/// for malformed input or spans that overflow.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let (negative, mut rest) = match input.as_bytes().first()? {
        b'-' => (true, &input[1..]),
        b'+' => (false, &input[1..]),
        _ => (false, input),
    };

    if rest == "0" {
        return Some(Duration::zero());
    }
    if rest.is_empty() {
        return None;
    }

    let mut total_nanos: i128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        if number.is_empty() || number == "." || number.matches('.').count() > 1 {
            return None;
        }

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let unit_nanos: i128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3_600 * 1_000_000_000,
            _ => return None,
        };

        total_nanos = total_nanos.checked_add(scale(number, unit_nanos)?)?;
        rest = tail;
    }

    if negative {
        total_nanos = -total_nanos;
    }
    i64::try_from(total_nanos).ok().map(Duration::nanoseconds)
}

/// `number * unit` in nanoseconds, truncating sub-nanosecond fractions
fn scale(number: &str, unit_nanos: i128) -> Option<i128> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));

    let whole: i128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut nanos = whole.checked_mul(unit_nanos)?;

    let mut place = unit_nanos;
    for digit in fraction.bytes() {
        place /= 10;
        if place == 0 {
            break;
        }
        nanos = nanos.checked_add(i128::from(digit - b'0') * place)?;
    }
    Some(nanos)
}
