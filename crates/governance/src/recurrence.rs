//! Successor generation for recurring tasks and subtasks.
//!
//! The next due date is the previous due date plus the interval in calendar days.
//! When the completion happened has no influence on it.

use chrono::{DateTime, Days, Utc};
use uuid::Uuid;

use crate::{
    db::{subtasks::Subtask, tasks::Task, types::WorkStatus},
    error::{GovernanceError, GovernanceResult},
};

pub const RECURRENCE_INTERVAL_MESSAGE: &str =
    "Recurrence interval must be a positive number of days for recurring items";
pub const RECURRENCE_DUE_DATE_MESSAGE: &str = "Due date is required for recurring items";

/// Recurrence fields of a work item as they will be stored.
#[derive(Debug, Clone, Copy)]
pub struct RecurrenceRule {
    pub is_recurring: bool,
    pub interval_days: Option<u32>,
    pub due_date: Option<DateTime<Utc>>,
}

impl RecurrenceRule {
    pub fn validate(&self) -> GovernanceResult<()> {
        if !self.is_recurring {
            return Ok(());
        }
        if !self.interval_days.is_some_and(|days| days > 0) {
            return Err(GovernanceError::validation(RECURRENCE_INTERVAL_MESSAGE));
        }
        if self.due_date.is_none() {
            return Err(GovernanceError::validation(RECURRENCE_DUE_DATE_MESSAGE));
        }
        Ok(())
    }

    /// Due date of the next occurrence, or `None` for one-off items.
    pub fn next_due_date(&self) -> GovernanceResult<Option<DateTime<Utc>>> {
        if !self.is_recurring {
            return Ok(None);
        }
        self.validate()?;
        match (self.due_date, self.interval_days) {
            (Some(due), Some(days)) => advance(due, days).map(Some),
            _ => Ok(None),
        }
    }
}

pub fn advance(due_date: DateTime<Utc>, interval_days: u32) -> GovernanceResult<DateTime<Utc>> {
    due_date
        .checked_add_days(Days::new(u64::from(interval_days)))
        .ok_or_else(|| GovernanceError::validation("Recurrence pushes the due date out of range"))
}

/// Work items that can spawn their own next occurrence.
pub trait Recurring: Sized {
    fn recurrence(&self) -> RecurrenceRule;

    /// A fresh copy due at `due_date`, with status reset and archive state cleared.
    fn successor(&self, due_date: DateTime<Utc>, now: DateTime<Utc>) -> Self;
}

pub fn next_occurrence<T: Recurring>(item: &T, now: DateTime<Utc>) -> GovernanceResult<Option<T>> {
    Ok(item
        .recurrence()
        .next_due_date()?
        .map(|due| item.successor(due, now)))
}

impl Recurring for Task {
    fn recurrence(&self) -> RecurrenceRule {
        RecurrenceRule {
            is_recurring: self.is_recurring,
            interval_days: self.recurrence_interval,
            due_date: self.due_date,
        }
    }

    fn successor(&self, due_date: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Task {
            id: Uuid::new_v4(),
            status: WorkStatus::ToDo,
            due_date: Some(due_date),
            archived: false,
            archived_at: None,
            version: 1,
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }
}

impl Recurring for Subtask {
    fn recurrence(&self) -> RecurrenceRule {
        RecurrenceRule {
            is_recurring: self.is_recurring,
            interval_days: self.recurrence_interval,
            due_date: self.due_date,
        }
    }

    fn successor(&self, due_date: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Subtask {
            id: Uuid::new_v4(),
            status: WorkStatus::ToDo,
            due_date: Some(due_date),
            archived: false,
            archived_at: None,
            version: 1,
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }
}
