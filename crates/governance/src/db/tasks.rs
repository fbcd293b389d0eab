use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ArchiveState, SortOrder, identity::UserData, types::WorkStatus};

pub const MAX_TASK_ASSIGNEES: usize = 5;
pub const DEFAULT_PRIORITY: u8 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
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

impl Task {
    pub fn is_owner(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    pub fn is_assignee(&self, user_id: Uuid) -> bool {
        self.assignee_ids.contains(&user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskWithUsers {
    pub task: Task,
    pub owner: Option<UserData>,
    pub assignees: Vec<UserData>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
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

impl TaskChanges {
    pub fn archive(state: ArchiveState) -> Self {
        Self {
            archive: Some(state),
            ..Self::default()
        }
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(tags) = &self.tags {
            task.tags = tags.clone();
        }
        if let Some(owner_id) = self.owner_id {
            task.owner_id = owner_id;
        }
        if let Some(assignee_ids) = &self.assignee_ids {
            task.assignee_ids = assignee_ids.clone();
        }
        if let Some(is_recurring) = self.is_recurring {
            task.is_recurring = is_recurring;
        }
        if let Some(interval) = self.recurrence_interval {
            task.recurrence_interval = interval;
        }
        if let Some(time_taken) = &self.time_taken {
            task.time_taken = time_taken.clone();
        }
        if let Some(archive) = self.archive {
            task.archived = archive.archived;
            task.archived_at = archive.archived_at;
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TaskQuery {
    pub project_id: Option<Uuid>,
    pub include_archived: bool,
    pub sort: SortOrder,
}

impl TaskQuery {
    pub fn for_project(project_id: Uuid) -> Self {
        Self {
            project_id: Some(project_id),
            ..Self::default()
        }
    }

    pub fn including_archived(mut self) -> Self {
        self.include_archived = true;
        self
    }

    pub fn sorted(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn matches(&self, task: &Task) -> bool {
        if !self.include_archived && task.archived {
            return false;
        }
        self.project_id.is_none_or(|project_id| task.project_id == project_id)
    }
}
