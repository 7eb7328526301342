//! Defines the strict ISO-8601 instant type used for transaction dates and
//! creation timestamps.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, format_description::BorrowedFormatItem,
    macros::format_description,
};

/// The wire format for instants: `YYYY-MM-DDTHH:mm:ss.sssZ`.
///
/// Exactly three fractional digits and a trailing `Z` are required. Other ISO
/// variants (no milliseconds, different sub-second precision, timezone
/// offsets) do not parse.
const INSTANT_FORMAT: &[BorrowedFormatItem] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
);

/// A UTC instant with millisecond precision.
///
/// This type round-trips the fixed-width pattern `YYYY-MM-DDTHH:mm:ss.sssZ`
/// through its [Display], [FromStr] and serde implementations, and rejects
/// every other date-time format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(OffsetDateTime);

impl Timestamp {
    /// The current time, truncated to millisecond precision so that values
    /// survive a round-trip through the wire format unchanged.
    pub fn now() -> Self {
        let now = OffsetDateTime::now_utc();
        let millis = now.nanosecond() / 1_000_000;
        Self(
            now.replace_nanosecond(millis * 1_000_000)
                .expect("truncated nanoseconds are in range"),
        )
    }

    /// The calendar date (UTC) of the instant.
    pub fn date(&self) -> Date {
        self.0.date()
    }

    /// The underlying date-time.
    pub fn as_date_time(&self) -> OffsetDateTime {
        self.0
    }

    /// Create a timestamp from a date-time, truncating to millisecond
    /// precision.
    pub fn from_date_time(date_time: OffsetDateTime) -> Self {
        let millis = date_time.nanosecond() / 1_000_000;
        Self(
            date_time
                .to_offset(time::UtcOffset::UTC)
                .replace_nanosecond(millis * 1_000_000)
                .expect("truncated nanoseconds are in range"),
        )
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self.0.format(INSTANT_FORMAT).map_err(|_| fmt::Error)?;
        write!(f, "{formatted}")
    }
}

impl FromStr for Timestamp {
    type Err = time::error::Parse;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrimitiveDateTime::parse(s, INSTANT_FORMAT).map(|date_time| Self(date_time.assume_utc()))
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|_| {
            de::Error::custom(format!(
                "invalid instant \"{raw}\": expected YYYY-MM-DDTHH:mm:ss.sssZ"
            ))
        })
    }
}
