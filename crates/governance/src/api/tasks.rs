use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::tasks::Task;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
    pub assignee_ids: Option<Vec<Uuid>>,
    pub is_recurring: Option<bool>,
    pub recurrence_interval: Option<i64>,
    pub time_taken: Option<String>,
}

/// `project_id` is accepted only so that an attempt to move a task can be
/// rejected explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    pub project_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
    pub assignee_ids: Option<Vec<Uuid>>,
    pub is_recurring: Option<bool>,
    pub recurrence_interval: Option<i64>,
    pub time_taken: Option<String>,
    pub version: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskUpdateResponse {
    pub task: Task,
    /// Next occurrence created when a recurring task was completed.
    pub successor: Option<Task>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSummary {
    pub task_id: Uuid,
    pub task_minutes: u32,
    pub subtask_minutes: u32,
    pub total_minutes: u32,
    pub total: String,
}
