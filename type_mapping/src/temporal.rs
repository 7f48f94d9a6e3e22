//! Date/time normalization
//!
//! Every temporal value that crosses the JSON codec or a result row is normalized into a
//! single in-memory representation, `DateTime<Utc>`. Accepted wire forms:
//!
//! - epoch milliseconds, as a JSON integer or as a string of digits
//! - RFC 3339 (`2024-01-02T03:04:05+08:00`)
//! - `YYYY-MM-DD HH:MM:SS[.fff]`, `YYYY-MM-DDTHH:MM:SS[.fff]`, `YYYY-MM-DD HH:MM`
//! - `YYYY-MM-DD`, `YYYY/MM/DD[ HH:MM:SS]`
//!
//! Text without a zone is interpreted as UTC.

use crate::errors::TemporalError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;

/// Canonical textual timestamp form
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Canonical textual date form
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const DATETIME_PATTERNS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

const DATE_PATTERNS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parse a textual temporal value, failing when no accepted form matches
pub fn parse(text: &str) -> Result<DateTime<Utc>, TemporalError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TemporalError(String::new()));
    }

    if is_epoch_millis(text) {
        return text
            .parse::<i64>()
            .ok()
            .and_then(from_epoch_millis)
            .ok_or_else(|| TemporalError(text.to_string()));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    for pattern in DATETIME_PATTERNS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
            return Ok(naive.and_utc());
        }
    }

    for pattern in DATE_PATTERNS {
        if let Ok(date) = NaiveDate::parse_from_str(text, pattern) {
            return Ok(date.and_time(NaiveTime::MIN).and_utc());
        }
    }

    Err(TemporalError(text.to_string()))
}

/// Normalize a raw JSON value into a timestamp; anything unusable becomes `None`
pub fn normalize_temporal(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::Null => None,
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .and_then(from_epoch_millis),
        Value::String(s) => parse(s).ok(),
        _ => None,
    }
}

pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
}

pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

pub fn format_date(value: &DateTime<Utc>) -> String {
    value.format(DATE_FORMAT).to_string()
}

fn is_epoch_millis(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Serde adapter for `Option<DateTime<Utc>>` fields inside JSON columns.
///
/// Reading accepts every form [`normalize_temporal`] accepts and degrades a malformed
/// fragment to `None` instead of failing the whole document. Writing uses
/// [`DATETIME_FORMAT`].
///
/// ```
/// use chrono::{DateTime, Utc};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Lecturer {
///     name: String,
///     #[serde(default, with = "type_mapping::temporal::lenient")]
///     birth: Option<DateTime<Utc>>,
/// }
///
/// let lecturer: Lecturer = serde_json::from_str(r#"{"name":"wu","birth":""}"#).unwrap();
/// assert_eq!(lecturer.name, "wu");
/// assert!(lecturer.birth.is_none());
/// ```
pub mod lenient {
    use super::{format_datetime, normalize_temporal};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_str(&format_datetime(v)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(normalize_temporal(&raw))
    }
}
