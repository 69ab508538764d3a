//! Timestamps and time precision.
//!
//! A metric's timestamp is stored exactly as the caller supplied it, in one
//! of several shapes (epoch number, text, date, date-time). Some write
//! destinations only accept integer nanoseconds regardless of the precision a
//! schema declares, so [`Timestamp::to_nanoseconds`] performs that conversion
//! lazily at send time without touching the stored value.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, TimestampError};

/// Number of characters an epoch value is right-padded to for nanoseconds.
const NANOSECOND_DIGITS: usize = 19;

/// Magnitude past which a float epoch no longer fits in an `i64`.
const I64_FLOAT_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Formats tried, in order, for textual timestamps carrying an offset.
const ZONED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f %z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Formats tried, in order, for textual timestamps without an offset.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Time resolution of a written point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Precision {
    /// Nanoseconds (`ns`).
    #[default]
    #[serde(rename = "ns", alias = "n")]
    Nanoseconds,
    /// Microseconds (`u`).
    #[serde(rename = "u", alias = "us", alias = "µs")]
    Microseconds,
    /// Milliseconds (`ms`).
    #[serde(rename = "ms")]
    Milliseconds,
    /// Seconds (`s`).
    #[serde(rename = "s")]
    Seconds,
    /// Minutes (`m`).
    #[serde(rename = "m")]
    Minutes,
    /// Hours (`h`).
    #[serde(rename = "h")]
    Hours,
}

impl Precision {
    /// The wire token for this precision.
    pub fn as_str(self) -> &'static str {
        match self {
            Precision::Nanoseconds => "ns",
            Precision::Microseconds => "u",
            Precision::Milliseconds => "ms",
            Precision::Seconds => "s",
            Precision::Minutes => "m",
            Precision::Hours => "h",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precision {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ns" | "n" => Ok(Precision::Nanoseconds),
            "u" | "us" | "µs" => Ok(Precision::Microseconds),
            "ms" => Ok(Precision::Milliseconds),
            "s" => Ok(Precision::Seconds),
            "m" => Ok(Precision::Minutes),
            "h" => Ok(Precision::Hours),
            other => Err(ConfigError::InvalidPrecision {
                token: other.to_string(),
            }),
        }
    }
}

/// A point timestamp in any of the accepted input shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    /// An epoch number in whatever unit the caller chose.
    Epoch(i64),
    /// A fractional epoch number, kept as given until conversion.
    Float(f64),
    /// A calendar date-time.
    DateTime(DateTime<Utc>),
    /// A calendar date, read as midnight UTC.
    Date(NaiveDate),
    /// A textual date or date-time, parsed on conversion.
    Text(String),
}

impl Timestamp {
    /// Converts this timestamp to integer nanoseconds since the epoch.
    ///
    /// - `Epoch` values are right-padded with zeros to 19 characters, so
    ///   seconds, milliseconds and microseconds all land on nanoseconds.
    ///   Values already 19 characters or longer are kept as they are.
    /// - `Float` values are truncated toward zero, then padded like `Epoch`.
    /// - `Text` is parsed as RFC 3339, `YYYY-MM-DD HH:MM:SS[.f][ ±zone]` or
    ///   `YYYY-MM-DD`; times without an offset are read as UTC.
    /// - `Date` is expanded to midnight UTC.
    /// - `DateTime` is converted exactly.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::Unparseable`] for text in none of the
    /// accepted formats and [`TimestampError::OutOfRange`] when the result
    /// does not fit in an `i64` or a float epoch is not finite.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use measura::timestamp::Timestamp;
    ///
    /// assert_eq!(
    ///     Timestamp::Epoch(1_500_000_000).to_nanoseconds().unwrap(),
    ///     1_500_000_000_000_000_000
    /// );
    /// assert_eq!(
    ///     Timestamp::from("1970-01-01T00:00:01Z").to_nanoseconds().unwrap(),
    ///     1_000_000_000
    /// );
    /// ```
    pub fn to_nanoseconds(&self) -> Result<i64, TimestampError> {
        match self {
            Timestamp::Epoch(n) => pad_epoch(*n),
            Timestamp::Float(f) => pad_epoch(truncate_epoch(*f)?),
            Timestamp::Text(text) => datetime_nanos(&parse_text(text)?, text),
            Timestamp::Date(date) => {
                let midnight = date.and_time(chrono::NaiveTime::MIN).and_utc();
                datetime_nanos(&midnight, &date.to_string())
            }
            Timestamp::DateTime(dt) => datetime_nanos(dt, &dt.to_rfc3339()),
        }
    }
}

fn pad_epoch(n: i64) -> Result<i64, TimestampError> {
    let digits = format!("{n:0<width$}", width = NANOSECOND_DIGITS);
    digits.parse().map_err(|_| TimestampError::OutOfRange {
        input: n.to_string(),
    })
}

#[allow(clippy::cast_possible_truncation)] // bounds checked above the cast
fn truncate_epoch(f: f64) -> Result<i64, TimestampError> {
    let whole = f.trunc();
    if !whole.is_finite() || whole.abs() >= I64_FLOAT_BOUND {
        return Err(TimestampError::OutOfRange {
            input: f.to_string(),
        });
    }
    Ok(whole as i64)
}

fn datetime_nanos(dt: &DateTime<Utc>, input: &str) -> Result<i64, TimestampError> {
    dt.timestamp_nanos_opt()
        .ok_or_else(|| TimestampError::OutOfRange {
            input: input.to_string(),
        })
}

fn parse_text(text: &str) -> Result<DateTime<Utc>, TimestampError> {
    let text_trimmed = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text_trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text_trimmed, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text_trimmed, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text_trimmed, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }

    Err(TimestampError::Unparseable {
        input: text.to_string(),
    })
}

impl From<i64> for Timestamp {
    fn from(v: i64) -> Self {
        Timestamp::Epoch(v)
    }
}

impl From<i32> for Timestamp {
    fn from(v: i32) -> Self {
        Timestamp::Epoch(i64::from(v))
    }
}

impl From<f64> for Timestamp {
    fn from(v: f64) -> Self {
        Timestamp::Float(v)
    }
}

impl From<&str> for Timestamp {
    fn from(v: &str) -> Self {
        Timestamp::Text(v.to_string())
    }
}

impl From<String> for Timestamp {
    fn from(v: String) -> Self {
        Timestamp::Text(v)
    }
}

impl From<NaiveDate> for Timestamp {
    fn from(v: NaiveDate) -> Self {
        Timestamp::Date(v)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(v: DateTime<Utc>) -> Self {
        Timestamp::DateTime(v)
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(v: NaiveDateTime) -> Self {
        Timestamp::DateTime(v.and_utc())
    }
}
