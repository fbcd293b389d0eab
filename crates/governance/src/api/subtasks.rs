use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::subtasks::Subtask;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSubtaskRequest {
    pub parent_task_id: Uuid,
    /// Optional; when given it must name the parent task's project.
    pub project_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
    pub owner_id: Option<Uuid>,
    pub assignee_ids: Option<Vec<Uuid>>,
    pub is_recurring: Option<bool>,
    pub recurrence_interval: Option<i64>,
    pub time_taken: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSubtaskRequest {
    pub parent_task_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
    pub owner_id: Option<Uuid>,
    pub assignee_ids: Option<Vec<Uuid>>,
    pub is_recurring: Option<bool>,
    pub recurrence_interval: Option<i64>,
    pub time_taken: Option<String>,
    pub version: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskUpdateResponse {
    pub subtask: Subtask,
    pub successor: Option<Subtask>,
}
