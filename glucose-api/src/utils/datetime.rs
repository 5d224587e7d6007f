//! Lenient parsing of wall-clock timestamps.
//!
//! Measurements are stored in the subject's local time without a zone. Clients send that time in
//! a few shapes (with or without seconds, `T` or a space as separator, sometimes with an offset
//! attached). When an offset is attached, the wall-clock part is kept and the offset dropped.
//!
//! Only years 1 through 9999 are accepted, so whole-month arithmetic around any parsed instant
//! stays within chrono's range.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};

const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

pub fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();

    let datetime = match DateTime::parse_from_rfc3339(s) {
        Ok(datetime) => Some(datetime.naive_local()),
        Err(_) => NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok()),
    };
    datetime.filter(in_range)
}

/// A date-time as accepted by [`parse_naive_datetime`], or a bare `YYYY-MM-DD` date meaning its
/// first instant.
pub fn parse_date_or_datetime(s: &str) -> Option<NaiveDateTime> {
    parse_naive_datetime(s).or_else(|| {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .filter(in_range)
    })
}

fn in_range(datetime: &NaiveDateTime) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&datetime.year())
}

/// Deserialize an optional timestamp with [`parse_naive_datetime`]. Use together with
/// `#[serde(default)]`.
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    s.map(|s| {
        parse_naive_datetime(&s).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid date-time \"{}\"", s))
        })
    })
    .transpose()
}
