//! `deserialize_with` helpers for values that arrive straight from HTML form
//! inputs: numbers typed as strings, `""` for an untouched field, and dates
//! from `<input type="date">` / `datetime-local` without an offset.
//!
//! Offset-less dates are read as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum Raw {
    Number(f64),
    Text(String),
}

fn number_from<E: de::Error>(raw: Raw) -> Result<Option<f64>, E> {
    match raw {
        Raw::Number(n) => Ok(Some(n)),
        Raw::Text(text) if text.trim().is_empty() => Ok(None),
        Raw::Text(text) => text
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| E::custom(format!("expected a number, got \"{}\"", text))),
    }
}

fn datetime_from<E: de::Error>(raw: Raw) -> Result<Option<DateTime<Utc>>, E> {
    match raw {
        Raw::Number(millis) => DateTime::from_timestamp_millis(millis as i64)
            .map(Some)
            .ok_or_else(|| E::custom("timestamp out of range")),
        Raw::Text(text) if text.trim().is_empty() => Ok(None),
        Raw::Text(text) => parse_datetime(&text)
            .map(Some)
            .ok_or_else(|| E::custom(format!("expected a date, got \"{}\"", text))),
    }
}

/// RFC 3339, `YYYY-MM-DDTHH:MM[:SS[.fff]]` or `YYYY-MM-DD`.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    number_from::<D::Error>(Raw::deserialize(deserializer)?)?
        .ok_or_else(|| de::Error::custom("a number is required"))
}

/// Use together with `#[serde(default)]`.
pub fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Raw>::deserialize(deserializer)? {
        Some(raw) => number_from::<D::Error>(raw),
        None => Ok(None),
    }
}

pub fn datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    datetime_from::<D::Error>(Raw::deserialize(deserializer)?)?
        .ok_or_else(|| de::Error::custom("a date is required"))
}

/// Use together with `#[serde(default)]`.
pub fn optional_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Raw>::deserialize(deserializer)? {
        Some(raw) => datetime_from::<D::Error>(raw),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "number")]
        amount: f64,
        #[serde(default, deserialize_with = "optional_number")]
        latitude: Option<f64>,
        #[serde(deserialize_with = "datetime")]
        start: DateTime<Utc>,
        #[serde(default, deserialize_with = "optional_datetime")]
        date: Option<DateTime<Utc>>,
    }

    fn sample(json: &str) -> Result<Sample, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn numbers_may_be_strings() {
        let s = sample(r#"{ "amount": "12.50", "latitude": " 38.7 ", "start": "2024-05-01" }"#).unwrap();
        assert_eq!(s.amount, 12.5);
        assert_eq!(s.latitude, Some(38.7));

        let s = sample(r#"{ "amount": 3, "start": "2024-05-01" }"#).unwrap();
        assert_eq!(s.amount, 3.0);
        assert_eq!(s.latitude, None);
    }

    #[test]
    fn blank_optionals_are_none() {
        let s = sample(r#"{ "amount": 1, "latitude": "", "start": "2024-05-01", "date": "" }"#).unwrap();
        assert_eq!(s.latitude, None);
        assert_eq!(s.date, None);

        let s = sample(r#"{ "amount": 1, "latitude": null, "start": "2024-05-01", "date": null }"#).unwrap();
        assert_eq!(s.latitude, None);
        assert_eq!(s.date, None);
    }

    #[test]
    fn required_values_reject_blank_and_garbage() {
        assert!(sample(r#"{ "amount": "", "start": "2024-05-01" }"#).is_err());
        assert!(sample(r#"{ "amount": "twelve", "start": "2024-05-01" }"#).is_err());
        assert!(sample(r#"{ "amount": 1, "start": "" }"#).is_err());
        assert!(sample(r#"{ "amount": 1, "start": "01/05/2024" }"#).is_err());
    }

    #[test]
    fn accepts_form_and_iso_dates() {
        let midnight = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let ten = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();

        assert_eq!(parse_datetime("2024-05-01"), Some(midnight));
        assert_eq!(parse_datetime("2024-05-01T10:00"), Some(ten));
        assert_eq!(parse_datetime("2024-05-01T10:00:00"), Some(ten));
        assert_eq!(parse_datetime("2024-05-01T10:00:00.000Z"), Some(ten));
        assert_eq!(parse_datetime("2024-05-01T12:00:00+02:00"), Some(ten));
        assert_eq!(parse_datetime("next tuesday"), None);
    }
}
