//! Naive (zone-less) timestamps as written by the audit log producer.
//!
//! Log records carry local wall-clock strings such as
//! `2016-07-05T01:16:00.001282`. Inputs with an explicit UTC offset are
//! normalised to UTC and then treated the same way.

use std::fmt;
use std::str::FromStr;

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::error::ReplayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(PrimitiveDateTime);

impl Timestamp {
    pub fn new(value: PrimitiveDateTime) -> Self {
        Self(value)
    }

    /// Midnight at the start of `date`.
    pub fn start_of(date: Date) -> Self {
        Self(date.midnight())
    }

    pub fn date(&self) -> Date {
        self.0.date()
    }

    pub fn as_primitive(&self) -> PrimitiveDateTime {
        self.0
    }

    /// Parses an ISO-8601-like string.
    ///
    /// Accepts `T` or a space between date and time, optional seconds and
    /// fractional seconds, a bare date (midnight), and RFC 3339 strings with
    /// an offset.
    pub fn parse(value: &str) -> Result<Self, ReplayError> {
        let trimmed = value.trim();
        parse_naive(trimmed)
            .or_else(|| parse_offset(trimmed))
            .map(Self)
            .ok_or_else(|| ReplayError::InvalidTimestamp {
                value: value.to_string(),
            })
    }
}

fn parse_naive(value: &str) -> Option<PrimitiveDateTime> {
    let normalized;
    let value = if value.len() > 10 && value.as_bytes()[10] == b' ' {
        normalized = format!("{}T{}", &value[..10], &value[11..]);
        normalized.as_str()
    } else {
        value
    };

    PrimitiveDateTime::parse(
        value,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(
            value,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        )
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(value, format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    })
    .ok()
    .or_else(|| {
        Date::parse(value, format_description!("[year]-[month]-[day]"))
            .ok()
            .map(Date::midnight)
    })
}

fn parse_offset(value: &str) -> Option<PrimitiveDateTime> {
    let utc = OffsetDateTime::parse(value, &Rfc3339)
        .ok()?
        .to_offset(UtcOffset::UTC);
    Some(PrimitiveDateTime::new(utc.date(), utc.time()))
}

impl FromStr for Timestamp {
    type Err = ReplayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timestamp::parse(s)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = if self.0.nanosecond() == 0 {
            self.0
                .format(format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"))
        } else {
            self.0.format(format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"
            ))
        };
        let text = text.map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl From<PrimitiveDateTime> for Timestamp {
    fn from(value: PrimitiveDateTime) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parses_minute_precision() {
        let ts = Timestamp::parse("2016-01-01T03:00").unwrap();
        assert_eq!(ts.as_primitive(), datetime!(2016-01-01 03:00));
    }

    #[test]
    fn parses_fractional_seconds() {
        let ts = Timestamp::parse("2016-07-05T01:16:00.001282").unwrap();
        assert_eq!(ts.as_primitive(), datetime!(2016-07-05 01:16:00.001282));
    }

    #[test]
    fn parses_space_separator_and_bare_date() {
        let spaced = Timestamp::parse("2016-01-09 05:00:00").unwrap();
        assert_eq!(spaced.as_primitive(), datetime!(2016-01-09 05:00));

        let date = Timestamp::parse("2016-01-09").unwrap();
        assert_eq!(date.as_primitive(), datetime!(2016-01-09 00:00));
    }

    #[test]
    fn normalises_offsets_to_utc() {
        let ts = Timestamp::parse("2016-01-09T05:00:00+02:00").unwrap();
        assert_eq!(ts.as_primitive(), datetime!(2016-01-09 03:00));

        let zulu = Timestamp::parse("2016-01-09T05:00:00Z").unwrap();
        assert_eq!(zulu.as_primitive(), datetime!(2016-01-09 05:00));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Timestamp::parse("not a date"),
            Err(ReplayError::InvalidTimestamp { .. })
        ));
        assert!(Timestamp::parse("2016-13-01T00:00").is_err());
    }

    #[test]
    fn orders_chronologically() {
        let a = Timestamp::parse("2016-01-09T00:20").unwrap();
        let b = Timestamp::parse("2016-01-09T00:20:00.000001").unwrap();
        assert!(a < b);
        assert_eq!(a.to_string(), "2016-01-09T00:20:00");
    }
}
