//! Display formatting for service timestamps
//!
//! Timestamps are opaque everywhere else; they are only parsed here, and a
//! value that does not parse is shown verbatim.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::fmt::Display;

/// Clock time of a message, e.g. `14:05`
pub fn message_time(timestamp: &str) -> String {
    message_time_in(timestamp, &Local)
}

/// Age of a session relative to now: `Today`, `Yesterday`, `3 days ago`, `Mar 1`
pub fn session_age(timestamp: &str) -> String {
    session_age_at(timestamp, &Local::now())
}

fn parse_in<Tz: TimeZone>(timestamp: &str, tz: &Tz) -> Option<DateTime<Tz>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(dt.with_timezone(tz));
    }
    // The service also emits naive local timestamps
    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
}

fn message_time_in<Tz: TimeZone>(timestamp: &str, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    parse_in(timestamp, tz).map_or_else(
        || timestamp.to_string(),
        |dt| dt.format("%H:%M").to_string(),
    )
}

fn session_age_at<Tz: TimeZone>(timestamp: &str, now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    let Some(date) = parse_in(timestamp, &now.timezone()) else {
        return timestamp.to_string();
    };

    // Whole elapsed days, not calendar days
    let days = now.clone().signed_duration_since(date.clone()).num_days();
    match days {
        i64::MIN..=0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=6 => format!("{days} days ago"),
        _ => date.format("%b %-d").to_string(),
    }
}
