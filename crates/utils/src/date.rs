//! Lenient calendar-date parsing for request bodies.
//!
//! Clients send due dates and achievement dates either as plain `YYYY-MM-DD`
//! (HTML date inputs) or as full ISO timestamps. Both collapse to a `NaiveDate`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, de::Error as _};

pub fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|ts| ts.date())
}

/// `deserialize_with` helper for optional date fields. `null` and `""` both map to `None`.
pub fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_flexible_date(&s)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid date: {s}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_iso_dates() {
        let expected = NaiveDate::from_ymd_opt(2025, 8, 15).unwrap();
        assert_eq!(parse_flexible_date("2025-08-15"), Some(expected));
        assert_eq!(parse_flexible_date("2025-08-15T00:00:00.000Z"), Some(expected));
        assert_eq!(parse_flexible_date("2025-08-15 09:30:00"), Some(expected));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_flexible_date(""), None);
        assert_eq!(parse_flexible_date("next tuesday"), None);
    }

    #[test]
    fn optional_helper_treats_empty_string_as_none() {
        #[derive(serde::Deserialize)]
        struct Body {
            #[serde(default, deserialize_with = "deserialize_optional_date")]
            due: Option<NaiveDate>,
        }

        let body: Body = serde_json::from_str(r#"{"due": ""}"#).unwrap();
        assert!(body.due.is_none());
        let body: Body = serde_json::from_str(r#"{}"#).unwrap();
        assert!(body.due.is_none());
        let body: Body = serde_json::from_str(r#"{"due": "2024-01-10"}"#).unwrap();
        assert_eq!(body.due, NaiveDate::from_ymd_opt(2024, 1, 10));
    }
}
