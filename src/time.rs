//! Timestamp normalization.
//!
//! CSAF requires `date-time` values with an explicit offset; CVRF documents
//! carry a mix of offset-qualified, naive and date-only strings. Everything
//! is normalized to UTC with millisecond precision.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::sections::ConversionContext;

/// ISO-8601 UTC with millisecond precision and an explicit offset.
const OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f+00:00";

/// The current moment as a normalized CSAF timestamp.
#[must_use]
pub fn now_utc_timestamp() -> String {
    Utc::now().format(OUTPUT_FORMAT).to_string()
}

/// Normalize a free-form timestamp string to UTC.
///
/// Inputs without an offset are assumed to already be UTC. Unparsable
/// inputs are logged with their original text, raise the failure flag and
/// yield `None`; callers must handle the `None`.
pub fn utc_timestamp(input: &str, ctx: &mut ConversionContext) -> Option<String> {
    match parse_utc(input) {
        Some(parsed) => Some(parsed.format(OUTPUT_FORMAT).to_string()),
        None => {
            ctx.fail(format!("invalid time stamp provided: '{input}'"));
            None
        }
    }
}

fn parse_utc(input: &str) -> Option<DateTime<Utc>> {
    let trimmed = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = trimmed.parse::<NaiveDateTime>() {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}
