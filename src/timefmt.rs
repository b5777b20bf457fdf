//! Timestamp display helpers. Both formatters are total: bad input comes back
//! unchanged instead of failing.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;

/// Parse the timestamp forms the backend emits. Naive values are local time.
pub fn parse_timestamp(input: &str) -> Option<DateTime<Local>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Local));
    }
    let naive = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    Local.from_local_datetime(&naive).earliest()
}

/// Short hybrid form used in lists: "just now", "5m ago", "3h ago", "2d ago",
/// then "Mar 5" (or "Mar 5, 2023" outside the current year).
pub fn format_timestamp(input: &str) -> String {
    format_timestamp_at(input, Local::now())
}

pub fn format_timestamp_at(input: &str, now: DateTime<Local>) -> String {
    if input.trim().is_empty() {
        return String::new();
    }
    let Some(ts) = parse_timestamp(input) else {
        return input.to_string();
    };

    let secs = (now - ts).num_seconds().max(0);
    if secs < MINUTE {
        "just now".to_string()
    } else if secs < HOUR {
        format!("{}m ago", secs / MINUTE)
    } else if secs < DAY {
        format!("{}h ago", secs / HOUR)
    } else if secs < WEEK {
        format!("{}d ago", secs / DAY)
    } else if ts.year() == now.year() {
        ts.format("%b %-d").to_string()
    } else {
        ts.format("%b %-d, %Y").to_string()
    }
}

/// Long relative form: "1 second ago", "12 minutes ago", "3 days ago".
pub fn format_relative(input: &str) -> String {
    format_relative_at(input, Local::now())
}

pub fn format_relative_at(input: &str, now: DateTime<Local>) -> String {
    if input.trim().is_empty() {
        return String::new();
    }
    let Some(ts) = parse_timestamp(input) else {
        return input.to_string();
    };

    let secs = (now - ts).num_seconds().max(0);
    let (n, unit) = if secs < MINUTE {
        (secs, "second")
    } else if secs < HOUR {
        (secs / MINUTE, "minute")
    } else if secs < DAY {
        (secs / HOUR, "hour")
    } else {
        (secs / DAY, "day")
    };

    if n == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", n, unit)
    }
}
