use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ArchiveState, SortOrder, identity::UserData, types::WorkStatus};

pub const MAX_SUBTASK_TITLE_CHARS: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: Uuid,
    pub parent_task_id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: WorkStatus,
    pub priority: u8,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub owner_id: Uuid,
    #[serde(default)]
    pub assignee_ids: Vec<Uuid>,
    #[serde(default)]
    pub is_recurring: bool,
    pub recurrence_interval: Option<u32>,
    #[serde(default)]
    pub time_taken: String,
    #[serde(default)]
    pub archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subtask {
    pub fn is_owner(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    pub fn is_assignee(&self, user_id: Uuid) -> bool {
        self.assignee_ids.contains(&user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskWithUsers {
    pub subtask: Subtask,
    pub owner: Option<UserData>,
    pub assignees: Vec<UserData>,
}

#[derive(Debug, Clone, Default)]
pub struct SubtaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<WorkStatus>,
    pub priority: Option<u8>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub tags: Option<Vec<String>>,
    pub owner_id: Option<Uuid>,
    pub assignee_ids: Option<Vec<Uuid>>,
    pub is_recurring: Option<bool>,
    pub recurrence_interval: Option<Option<u32>>,
    pub time_taken: Option<String>,
    pub archive: Option<ArchiveState>,
}

impl SubtaskChanges {
    pub fn archive(state: ArchiveState) -> Self {
        Self {
            archive: Some(state),
            ..Self::default()
        }
    }

    pub fn apply(&self, subtask: &mut Subtask) {
        if let Some(title) = &self.title {
            subtask.title = title.clone();
        }
        if let Some(description) = &self.description {
            subtask.description = description.clone();
        }
        if let Some(status) = self.status {
            subtask.status = status;
        }
        if let Some(priority) = self.priority {
            subtask.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            subtask.due_date = due_date;
        }
        if let Some(tags) = &self.tags {
            subtask.tags = tags.clone();
        }
        if let Some(owner_id) = self.owner_id {
            subtask.owner_id = owner_id;
        }
        if let Some(assignee_ids) = &self.assignee_ids {
            subtask.assignee_ids = assignee_ids.clone();
        }
        if let Some(is_recurring) = self.is_recurring {
            subtask.is_recurring = is_recurring;
        }
        if let Some(interval) = self.recurrence_interval {
            subtask.recurrence_interval = interval;
        }
        if let Some(time_taken) = &self.time_taken {
            subtask.time_taken = time_taken.clone();
        }
        if let Some(archive) = self.archive {
            subtask.archived = archive.archived;
            subtask.archived_at = archive.archived_at;
        }
    }
}

/// Archived subtasks only show up when `include_archived` is set explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubtaskQuery {
    pub parent_task_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub include_archived: bool,
    pub sort: SortOrder,
}

impl SubtaskQuery {
    pub fn for_task(parent_task_id: Uuid) -> Self {
        Self {
            parent_task_id: Some(parent_task_id),
            ..Self::default()
        }
    }

    pub fn for_project(project_id: Uuid) -> Self {
        Self {
            project_id: Some(project_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, subtask: &Subtask) -> bool {
        if !self.include_archived && subtask.archived {
            return false;
        }
        self.parent_task_id
            .is_none_or(|parent| subtask.parent_task_id == parent)
            && self
                .project_id
                .is_none_or(|project_id| subtask.project_id == project_id)
    }
}
