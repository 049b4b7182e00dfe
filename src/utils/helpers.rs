//! Helper functions and utilities
//!
//! This module contains common helper functions used throughout the application.

use chrono::{NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

/// Wire format for every timestamp the service reads or writes
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current time in UTC, truncated to whole seconds
pub fn now() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Format a timestamp in the wire format
pub fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(DATETIME_FORMAT).to_string()
}

/// Parse a timestamp in the wire format
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
}

/// Truncate text to a maximum length with ellipsis
pub fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_length.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Serde adapter for `yyyy-MM-dd HH:mm:ss` timestamps
pub mod datetime_format {
    use super::{format_timestamp, parse_timestamp};
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_timestamp(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for optional `yyyy-MM-dd HH:mm:ss` timestamps
pub mod option_datetime_format {
    use super::{format_timestamp, parse_timestamp};
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => serializer.serialize_str(&format_timestamp(*value)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => parse_timestamp(raw)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Deserialize a comma-separated query value (`1,2,3`) into a list
pub fn comma_separated<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };

    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| item.parse::<T>().map_err(serde::de::Error::custom))
        .collect::<Result<Vec<T>, _>>()
        .map(Some)
}

/// Escape `%`, `_` and `\` so user text matches literally inside `LIKE`
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_timestamp_round_trip_format() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(18, 5, 0))
            .unwrap();
        assert_eq!(format_timestamp(ts), "2024-03-09 18:05:00");
        assert_eq!(parse_timestamp("2024-03-09 18:05:00").unwrap(), ts);
        assert!(parse_timestamp("2024-03-09T18:05:00").is_err());
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("a long annotation", 9), "a long...");
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100% fun_run"), "100\\% fun\\_run");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[derive(Deserialize)]
    struct Ids {
        #[serde(default, deserialize_with = "comma_separated")]
        ids: Option<Vec<i64>>,
    }

    #[test]
    fn test_comma_separated() {
        let parsed: Ids = serde_json::from_str(r#"{"ids":"1, 2,3"}"#).unwrap();
        assert_eq!(parsed.ids, Some(vec![1, 2, 3]));

        let parsed: Ids = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(parsed.ids, None);

        assert!(serde_json::from_str::<Ids>(r#"{"ids":"1,x"}"#).is_err());
    }
}
