//! Display helpers for record timestamps and counters.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse a backend timestamp into UTC.
///
/// Accepts RFC 3339 (with `Z` or an offset) and the naive ISO forms the
/// backend emits for database datetimes, which are taken to be UTC.
/// Returns `None` for empty strings or unrecognised formats.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    const FMTS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in FMTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }

    tracing::debug!(timestamp = s, "unrecognised record timestamp");
    None
}

/// Render a record timestamp as `YYYY-MM-DD HH:MM:SS`, or `N/A`.
///
/// # Examples
///
/// ```
/// use panel_core::formatting::format_timestamp;
///
/// assert_eq!(format_timestamp(Some("2024-05-01T08:30:00Z")), "2024-05-01 08:30:00");
/// assert_eq!(format_timestamp(None), "N/A");
/// ```
pub fn format_timestamp(raw: Option<&str>) -> String {
    match raw.and_then(parse_timestamp) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "N/A".to_string(),
    }
}

/// Render a counter with thousands separators, dropping any fraction.
///
/// # Examples
///
/// ```
/// use panel_core::formatting::format_count;
///
/// assert_eq!(format_count(1234567.0), "1,234,567");
/// assert_eq!(format_count(0.0), "0");
/// ```
pub fn format_count(value: f64) -> String {
    let negative = value < 0.0;
    let digits = (value.abs().trunc() as u64).to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}
