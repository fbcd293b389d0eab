//! Field rules shared by the create and update paths of every manager.
//!
//! Each check returns the first failure as a [`GovernanceError::Validation`]
//! carrying a reason that can be shown to the user verbatim.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    db::{subtasks::MAX_SUBTASK_TITLE_CHARS, tasks::MAX_TASK_ASSIGNEES, types::WorkStatus},
    error::{GovernanceError, GovernanceResult},
    recurrence::RECURRENCE_INTERVAL_MESSAGE,
    time::is_valid_time_format,
};

const MIN_PRIORITY: i64 = 1;
const MAX_PRIORITY: i64 = 10;

pub fn required_text(value: &str, field: &str) -> GovernanceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(GovernanceError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

pub fn subtask_title(value: &str) -> GovernanceResult<String> {
    let title = required_text(value, "Subtask title")?;
    if title.chars().count() > MAX_SUBTASK_TITLE_CHARS {
        return Err(GovernanceError::validation(format!(
            "Subtask title cannot exceed {MAX_SUBTASK_TITLE_CHARS} characters"
        )));
    }
    Ok(title)
}

/// Due dates are compared by calendar day, so "today" is always accepted.
pub fn due_date(due: DateTime<Utc>, today: NaiveDate) -> GovernanceResult<DateTime<Utc>> {
    if due.date_naive() < today {
        return Err(GovernanceError::validation("Due date cannot be in the past"));
    }
    Ok(due)
}

pub fn priority(raw: i64) -> GovernanceResult<u8> {
    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&raw) {
        return Err(GovernanceError::validation(format!(
            "Priority must be an integer between {MIN_PRIORITY} and {MAX_PRIORITY}"
        )));
    }
    u8::try_from(raw).map_err(|_| GovernanceError::validation("Priority is out of range"))
}

pub fn status(raw: &str) -> GovernanceResult<WorkStatus> {
    raw.parse()
}

/// An empty string clears the recorded time.
pub fn time_taken(raw: &str) -> GovernanceResult<String> {
    let value = raw.trim();
    if value.is_empty() || is_valid_time_format(value) {
        return Ok(value.to_string());
    }
    Err(GovernanceError::validation(
        "Time taken must be in 15-minute increments, e.g. \"45 minutes\", \"2 hours\" or \"1 hour 30 minutes\"",
    ))
}

pub fn recurrence_interval(raw: i64) -> GovernanceResult<u32> {
    u32::try_from(raw)
        .ok()
        .filter(|days| *days > 0)
        .ok_or_else(|| GovernanceError::validation(RECURRENCE_INTERVAL_MESSAGE))
}

/// A stored interval only makes sense on a recurring item.
pub fn recurrence_interval_for(
    is_recurring: bool,
    raw: Option<i64>,
) -> GovernanceResult<Option<u32>> {
    if !is_recurring {
        return Ok(None);
    }
    raw.map(recurrence_interval).transpose()
}

pub fn tags(raw: Vec<String>) -> Vec<String> {
    raw.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Order-preserving de-duplication.
pub fn dedup_ids(ids: impl IntoIterator<Item = Uuid>) -> Vec<Uuid> {
    let mut seen = Vec::new();
    for id in ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

pub fn ensure_assignee_capacity(count: usize) -> GovernanceResult<()> {
    if count > MAX_TASK_ASSIGNEES {
        return Err(GovernanceError::capacity(format!(
            "A maximum of {MAX_TASK_ASSIGNEES} assignees is allowed"
        )));
    }
    Ok(())
}

pub fn ensure_has_assignee(count: usize) -> GovernanceResult<()> {
    if count == 0 {
        return Err(GovernanceError::capacity("At least one assignee is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn names_are_trimmed_and_required() {
        assert_eq!(required_text("  Launch  ", "Project name").unwrap(), "Launch");
        let err = required_text("   ", "Project name").unwrap_err();
        assert!(matches!(err, GovernanceError::Validation(m) if m == "Project name is required"));
    }

    #[test]
    fn subtask_titles_are_capped_in_characters() {
        assert!(subtask_title(&"é".repeat(200)).is_ok());
        assert!(subtask_title(&"a".repeat(201)).is_err());
    }

    #[test]
    fn due_date_today_is_accepted_yesterday_is_not() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 10).unwrap();
        let early_today = Utc.with_ymd_and_hms(2026, 5, 10, 0, 0, 1).unwrap();
        let yesterday = Utc.with_ymd_and_hms(2026, 5, 9, 23, 59, 59).unwrap();

        assert!(due_date(early_today, today).is_ok());
        assert!(due_date(yesterday, today).is_err());
    }

    #[test]
    fn priority_bounds() {
        assert_eq!(priority(1).unwrap(), 1);
        assert_eq!(priority(10).unwrap(), 10);
        assert!(priority(0).is_err());
        assert!(priority(11).is_err());
        assert!(priority(-3).is_err());
    }

    #[test]
    fn time_taken_accepts_empty_and_quarter_hours() {
        assert_eq!(time_taken("").unwrap(), "");
        assert_eq!(time_taken(" 1 hour 15 minutes ").unwrap(), "1 hour 15 minutes");
        assert!(time_taken("20 minutes").is_err());
        assert!(time_taken("1.5 hours").is_err());
    }

    #[test]
    fn recurrence_interval_must_be_positive() {
        assert_eq!(recurrence_interval(7).unwrap(), 7);
        assert!(recurrence_interval(0).is_err());
        assert!(recurrence_interval(-1).is_err());
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(dedup_ids([a, b, a, c, b]), vec![a, b, c]);
    }

    #[test]
    fn capacity_limits() {
        assert!(ensure_assignee_capacity(5).is_ok());
        assert!(matches!(
            ensure_assignee_capacity(6).unwrap_err(),
            GovernanceError::Capacity(_)
        ));
        assert!(matches!(
            ensure_has_assignee(0).unwrap_err(),
            GovernanceError::Capacity(_)
        ));
    }
}
