//! Calendar and wall-clock helpers.
//!
//! Dates travel as `YYYY-MM-DD` and times of day as `HH:MM` everywhere outside
//! the core (JSON, SQLite), so parsing is strict about both shapes.

use chrono::{Datelike, NaiveDate, NaiveTime};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeParseError {
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    Date(String),
    #[error("invalid time '{0}', expected HH:MM")]
    Time(String),
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, TimeParseError> {
    if raw.len() != 10 {
        return Err(TimeParseError::Date(raw.to_string()));
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| TimeParseError::Date(raw.to_string()))
}

pub fn parse_time(raw: &str) -> Result<NaiveTime, TimeParseError> {
    if raw.len() != 5 {
        return Err(TimeParseError::Time(raw.to_string()));
    }
    NaiveTime::parse_from_str(raw, TIME_FORMAT).map_err(|_| TimeParseError::Time(raw.to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Weekday ordinal with Sunday = 0 through Saturday = 6.
pub fn weekday_ordinal(date: NaiveDate) -> u8 {
    // num_days_from_sunday is always < 7
    date.weekday().num_days_from_sunday() as u8
}

/// Serde adapter for `HH:MM` times of day.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_time(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time(&raw).map_err(serde::de::Error::custom)
    }
}
