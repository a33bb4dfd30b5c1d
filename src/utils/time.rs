//! The canonical instant used by the frame clock, availability windows and
//! trajectory samples.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::errors::{Error, Result};

/// A measurement of wall-clock time, stored as fractional seconds since the
/// Unix epoch. Parses from and formats to ISO-8601 UTC strings; arithmetic
/// works in plain `f64` seconds so interpolation stays cheap.
#[derive(Debug, Default, Copy, Clone, PartialEq, PartialOrd)]
pub struct Timestamp(f64);

impl Timestamp {
    #[inline]
    pub fn from_seconds(seconds: f64) -> Timestamp {
        Timestamp(seconds)
    }

    #[inline]
    pub fn from_millis(millis: f64) -> Timestamp {
        Timestamp(millis / 1000.0)
    }

    /// The current wall-clock time.
    pub fn now() -> Timestamp {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(elapsed.as_secs() as f64 + f64::from(elapsed.subsec_nanos()) * 1e-9)
    }

    /// Parses an ISO-8601 / RFC-3339 instant. A date-time without an offset is
    /// treated as UTC.
    pub fn parse(v: &str) -> Result<Timestamp> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
            return Ok(Timestamp::from_datetime(&dt.with_timezone(&Utc)));
        }

        for fmt in &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(v, fmt) {
                return Ok(Timestamp::from_datetime(&Utc.from_utc_datetime(&naive)));
            }
            if let Ok(date) = chrono::NaiveDate::parse_from_str(v, fmt) {
                let naive = date.and_hms(0, 0, 0);
                return Ok(Timestamp::from_datetime(&Utc.from_utc_datetime(&naive)));
            }
        }

        Err(Error::TimeInvalid(v.to_string()))
    }

    /// Formats as an ISO-8601 UTC string with millisecond precision.
    pub fn to_iso8601(self) -> String {
        let secs = self.0.floor();
        let nanos = ((self.0 - secs) * 1e9).round() as u32;
        let nanos = nanos.min(999_999_999);
        match Utc.timestamp_opt(secs as i64, nanos) {
            chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            _ => format!("{}s", self.0),
        }
    }

    #[inline]
    pub fn seconds(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn millis(self) -> f64 {
        self.0 * 1000.0
    }

    /// Elapsed seconds since `earlier`; negative if `earlier` is in the
    /// future.
    #[inline]
    pub fn seconds_since(self, earlier: Timestamp) -> f64 {
        self.0 - earlier.0
    }

    #[inline]
    pub fn min(self, other: Timestamp) -> Timestamp {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    #[inline]
    pub fn max(self, other: Timestamp) -> Timestamp {
        if self.0 >= other.0 {
            self
        } else {
            other
        }
    }

    fn from_datetime(dt: &DateTime<Utc>) -> Timestamp {
        Timestamp(dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) * 1e-9)
    }
}

impl Add<f64> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn add(self, seconds: f64) -> Timestamp {
        Timestamp(self.0 + seconds)
    }
}

impl AddAssign<f64> for Timestamp {
    #[inline]
    fn add_assign(&mut self, seconds: f64) {
        self.0 += seconds;
    }
}

impl Sub for Timestamp {
    type Output = f64;

    #[inline]
    fn sub(self, rhs: Timestamp) -> f64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl ::serde::Serialize for Timestamp {
    fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

impl<'de> ::serde::Deserialize<'de> for Timestamp {
    fn deserialize<D: ::serde::Deserializer<'de>>(
        deserializer: D,
    ) -> ::std::result::Result<Self, D::Error> {
        struct Visitor;

        impl<'de> ::serde::de::Visitor<'de> for Visitor {
            type Value = Timestamp;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an ISO-8601 string or epoch seconds")
            }

            fn visit_f64<E: ::serde::de::Error>(self, v: f64) -> ::std::result::Result<Timestamp, E> {
                Ok(Timestamp::from_seconds(v))
            }

            fn visit_i64<E: ::serde::de::Error>(self, v: i64) -> ::std::result::Result<Timestamp, E> {
                Ok(Timestamp::from_seconds(v as f64))
            }

            fn visit_u64<E: ::serde::de::Error>(self, v: u64) -> ::std::result::Result<Timestamp, E> {
                Ok(Timestamp::from_seconds(v as f64))
            }

            fn visit_str<E: ::serde::de::Error>(self, v: &str) -> ::std::result::Result<Timestamp, E> {
                Timestamp::parse(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_round_trip() {
        let ts = Timestamp::parse("2024-01-01T00:00:00Z").unwrap();
        assert_eq!(ts.to_iso8601(), "2024-01-01T00:00:00.000Z");

        let half = ts + 0.5;
        assert_eq!(half.to_iso8601(), "2024-01-01T00:00:00.500Z");
        assert!((half - ts - 0.5).abs() < 1e-9);
    }

    #[test]
    fn lenient_parsing() {
        assert!(Timestamp::parse("2024-06-01T12:30:00").is_ok());
        assert!(Timestamp::parse("2024-06-01 12:30:00").is_ok());
        assert!(Timestamp::parse("2024-06-01").is_ok());
        assert!(Timestamp::parse("not a time").is_err());
    }
}
