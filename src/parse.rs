//! Turning command-line text into task field values.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::{Priority, Tags};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
];

/// Parses a due date relative to `now`.
///
/// Accepts `today`, `tomorrow`, `yesterday`, `+3d`, `+2w`, ISO date-times and a
/// handful of numeric date layouts. Date-only input resolves to midnight.
/// Returns `None` for unrecognized input and for offsets that overflow the calendar.
pub fn parse_date(input: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let trimmed = input.trim();
    let s = trimmed.to_lowercase();
    if s.is_empty() {
        return None;
    }

    match s.as_str() {
        "today" => return Some(now),
        "tomorrow" => return now.checked_add_signed(Duration::days(1)),
        "yesterday" => return now.checked_sub_signed(Duration::days(1)),
        _ => {}
    }

    if let Some(rel) = s.strip_prefix('+') {
        let unit_at = rel.char_indices().last().map(|(i, _)| i).unwrap_or(0);
        let (num, unit) = rel.split_at(unit_at);
        let n = num.parse::<u32>().ok().map(i64::from)?;
        let offset = match unit {
            "d" => Duration::try_days(n)?,
            "w" => Duration::try_weeks(n)?,
            _ => return None,
        };
        // Offsets past the representable calendar are rejected, not wrapped.
        return now.checked_add_signed(offset);
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    None
}

/// Maps a priority token to a level. Anything unrecognized is medium.
pub fn parse_priority(token: &str) -> Priority {
    match token.trim().to_lowercase().as_str() {
        "high" | "h" => Priority::High,
        "low" | "l" => Priority::Low,
        _ => Priority::Medium,
    }
}

/// Splits raw tag text on commas, semicolons and whitespace, dropping
/// empties and repeats.
pub fn parse_tags(input: &str) -> Tags {
    input
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect()
}

/// A positive integer id, or `None`.
pub fn validate_task_id(input: &str) -> Option<i64> {
    input.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

/// Collapses runs of whitespace and strips `<`, `>`, `"` and `'`.
pub fn sanitize_description(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\''))
        .collect()
}

pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let keep = max_len.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Coarsest whole unit of the elapsed time: `3d`, `5h`, `12m` or `40s`.
pub fn format_duration(start: NaiveDateTime, end: NaiveDateTime) -> String {
    let diff = end - start;
    if diff.num_days() > 0 {
        format!("{}d", diff.num_days())
    } else if diff.num_hours() > 0 {
        format!("{}h", diff.num_hours())
    } else if diff.num_minutes() > 0 {
        format!("{}m", diff.num_minutes())
    } else {
        format!("{}s", diff.num_seconds().max(0))
    }
}
