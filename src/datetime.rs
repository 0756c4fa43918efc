use chrono::{DateTime, NaiveDateTime, Utc};

/// Formats used by the `date` field of chat exports. The export writes local
/// time without an offset; it is interpreted as UTC.
const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Parses a date as found in an export: a naive ISO-8601 timestamp, an
/// RFC 3339 timestamp with offset, or a unix timestamp in seconds (the
/// `date_unixtime` field).
///
/// Returns `None` for anything else.
pub fn parse_export_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if is_unix_timestamp(value) {
        return value
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

/// Returns `true` when the value is made only of ASCII digits, with an
/// optional leading minus sign.
pub fn is_unix_timestamp(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
