//! services/api/src/web/extract.rs
//!
//! Request extractors and serde helpers shared by the handlers. Rejections are
//! turned into `AppError` so malformed input gets the same JSON error body as
//! a failed validation.

use anglerhub_core::query::TimeRange;
use anglerhub_core::validation::ValidationErrors;
use axum::extract::{FromRequest, FromRequestParts};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::AppError;

/// `axum::Json` with a JSON error response on rejection.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// `axum::extract::Query` with a JSON error response on rejection.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);

//=========================================================================================
// Serde helpers
//=========================================================================================

/// Query-string boolean: `1`, `true`, `on` and `yes` are true, anything else false.
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.is_some_and(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "on" | "yes"
        )
    }))
}

/// Keeps an explicit `null` apart from a missing key. Use with
/// `#[serde(default, deserialize_with = "present")]` on an `Option<Option<T>>`.
pub fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

//=========================================================================================
// Dates
//=========================================================================================

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` (read as UTC)
/// or a bare date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(at.and_utc());
        }
    }
    parse_date(raw).map(|day| day.and_time(NaiveTime::MIN).and_utc())
}

/// A calendar day, either bare or as the date part of a timestamp.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            raw.get(..10)
                .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        })
}

/// Validates a required timestamp field.
pub fn timestamp_field(
    errors: &mut ValidationErrors,
    field: &str,
    raw: Option<&str>,
) -> Option<DateTime<Utc>> {
    match raw {
        None => {
            errors.add(field, format!("The {field} field is required."));
            None
        }
        Some(raw) => {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                errors.add(field, format!("The {field} field must be a valid date."));
            }
            parsed
        }
    }
}

/// Validates a required date field.
pub fn date_field(
    errors: &mut ValidationErrors,
    field: &str,
    raw: Option<&str>,
) -> Option<NaiveDate> {
    match raw {
        None => {
            errors.add(field, format!("The {field} field is required."));
            None
        }
        Some(raw) => {
            let parsed = parse_date(raw);
            if parsed.is_none() {
                errors.add(field, format!("The {field} field must be a valid date."));
            }
            parsed
        }
    }
}

/// Turns a `start_date`/`end_date` query pair into a range covering both days
/// entirely. The range only applies when both bounds are given.
pub fn day_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Option<TimeRange>, AppError> {
    let (Some(start), Some(end)) = (start, end) else {
        return Ok(None);
    };
    let mut errors = ValidationErrors::new();
    let start = date_field(&mut errors, "start_date", Some(start));
    let end = date_field(&mut errors, "end_date", Some(end));
    errors.into_result()?;
    let (Some(start), Some(end)) = (start, end) else {
        return Ok(None);
    };
    if end < start {
        return Err(ValidationErrors::single(
            "end_date",
            "The end_date field must be a date after or equal to start_date.",
        )
        .into());
    }
    let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    Ok(Some(TimeRange {
        start: start.and_time(NaiveTime::MIN).and_utc(),
        end: end.and_time(end_of_day).and_utc(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    #[case("2024-06-01T05:30:00Z", Utc.with_ymd_and_hms(2024, 6, 1, 5, 30, 0).unwrap())]
    #[case("2024-06-01T07:30:00+02:00", Utc.with_ymd_and_hms(2024, 6, 1, 5, 30, 0).unwrap())]
    #[case("2024-06-01 05:30:00", Utc.with_ymd_and_hms(2024, 6, 1, 5, 30, 0).unwrap())]
    #[case("2024-06-01T05:30", Utc.with_ymd_and_hms(2024, 6, 1, 5, 30, 0).unwrap())]
    #[case("2024-06-01", Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())]
    fn timestamps_in_common_shapes(#[case] raw: &str, #[case] expected: DateTime<Utc>) {
        assert_eq!(parse_timestamp(raw), Some(expected));
    }

    #[test]
    fn garbage_is_not_a_timestamp() {
        assert_eq!(parse_timestamp("last tuesday"), None);
        assert_eq!(parse_date("2024-13-01"), None);
    }

    #[test]
    fn day_range_covers_both_days() {
        let range = day_range(Some("2024-06-01"), Some("2024-06-02"))
            .unwrap()
            .unwrap();
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()));
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 6, 2, 23, 59, 59).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap()));
    }

    #[test]
    fn day_range_needs_both_bounds() {
        assert_eq!(day_range(Some("2024-06-01"), None).unwrap(), None);
    }

    #[test]
    fn reversed_day_range_is_rejected() {
        assert!(day_range(Some("2024-06-02"), Some("2024-06-01")).is_err());
    }

    #[derive(Deserialize)]
    struct Flags {
        #[serde(default, deserialize_with = "flag")]
        on: bool,
    }

    #[rstest]
    #[case(Some("1"), true)]
    #[case(Some("true"), true)]
    #[case(Some("Yes"), true)]
    #[case(Some("0"), false)]
    #[case(Some("false"), false)]
    #[case(None, false)]
    fn query_flags(#[case] raw: Option<&str>, #[case] expected: bool) {
        let document = match raw {
            Some(raw) => serde_json::json!({ "on": raw }),
            None => serde_json::json!({}),
        };
        let parsed: Flags = serde_json::from_value(document).unwrap();
        assert_eq!(parsed.on, expected);
    }
}
