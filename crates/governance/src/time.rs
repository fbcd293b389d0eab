//! Elapsed-time strings such as `"45 minutes"` or `"2 hours 15 minutes"`.
//!
//! Recorded time is kept in 15 minute increments. Parsing is lenient and never
//! fails; call [`is_valid_time_format`] first when strict validation matters.

use std::sync::LazyLock;

use regex::Regex;

pub const TIME_INCREMENT_MINUTES: u32 = 15;
pub const NOT_SPECIFIED: &str = "Not specified";

static MINUTES_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+) minutes$").expect("valid minutes pattern"));
static HOURS_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+) hours?$").expect("valid hours pattern"));
static HOURS_AND_MINUTES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+) hours? (\d+) minutes$").expect("valid hours and minutes pattern")
});

/// Hours and minutes as written, before the increment rule is applied.
fn parse_parts(value: &str) -> Option<(u32, u32)> {
    let value = value.trim();
    if let Some(caps) = HOURS_AND_MINUTES.captures(value) {
        return Some((caps[1].parse().ok()?, caps[2].parse().ok()?));
    }
    if let Some(caps) = HOURS_ONLY.captures(value) {
        return Some((caps[1].parse().ok()?, 0));
    }
    if let Some(caps) = MINUTES_ONLY.captures(value) {
        return Some((0, caps[1].parse().ok()?));
    }
    None
}

fn total_minutes(hours: u32, minutes: u32) -> Option<u32> {
    hours.checked_mul(60)?.checked_add(minutes)
}

pub fn is_valid_time_format(value: &str) -> bool {
    parse_parts(value)
        .and_then(|(hours, minutes)| total_minutes(hours, minutes))
        .is_some_and(|total| total % TIME_INCREMENT_MINUTES == 0)
}

pub fn parse_time_to_minutes(value: &str) -> u32 {
    parse_parts(value)
        .and_then(|(hours, minutes)| total_minutes(hours, minutes))
        .unwrap_or(0)
}

pub fn format_time(minutes: u32) -> String {
    let hours = minutes / 60;
    let remainder = minutes % 60;
    let mut parts = Vec::with_capacity(2);
    match hours {
        0 => {}
        1 => parts.push("1 hour".to_string()),
        n => parts.push(format!("{n} hours")),
    }
    if remainder > 0 {
        parts.push(format!("{remainder} minutes"));
    }
    parts.join(" ")
}

/// Renders an aggregated total, using the sentinel for an empty total.
pub fn format_total(minutes: u32) -> String {
    if minutes == 0 {
        NOT_SPECIFIED.to_string()
    } else {
        format_time(minutes)
    }
}

/// Task time plus the time of every subtask passed in. Callers pass only
/// non-archived subtasks.
pub fn aggregate_minutes<'a>(
    task_time: &str,
    subtask_times: impl IntoIterator<Item = &'a str>,
) -> u32 {
    subtask_times
        .into_iter()
        .map(parse_time_to_minutes)
        .fold(parse_time_to_minutes(task_time), u32::saturating_add)
}
