use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ArchiveState, types::WorkStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub member_ids: Vec<Uuid>,
    pub status: WorkStatus,
    pub priority: Option<u8>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn is_owner(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    /// The owner always has access, whatever the member list says.
    pub fn has_access(&self, user_id: Uuid) -> bool {
        self.is_owner(user_id) || self.member_ids.contains(&user_id)
    }

    pub fn archive_state(&self) -> ArchiveState {
        ArchiveState {
            archived: self.archived,
            archived_at: self.archived_at,
        }
    }
}

/// Field-level change set; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub member_ids: Option<Vec<Uuid>>,
    pub status: Option<WorkStatus>,
    pub priority: Option<Option<u8>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub tags: Option<Vec<String>>,
    pub archive: Option<ArchiveState>,
}

impl ProjectChanges {
    pub fn apply(&self, project: &mut Project) {
        if let Some(name) = &self.name {
            project.name = name.clone();
        }
        if let Some(description) = &self.description {
            project.description = description.clone();
        }
        if let Some(member_ids) = &self.member_ids {
            project.member_ids = member_ids.clone();
        }
        if let Some(status) = self.status {
            project.status = status;
        }
        if let Some(priority) = self.priority {
            project.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            project.due_date = due_date;
        }
        if let Some(tags) = &self.tags {
            project.tags = tags.clone();
        }
        if let Some(archive) = self.archive {
            project.archived = archive.archived;
            project.archived_at = archive.archived_at;
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectQuery {
    pub include_archived: bool,
    /// Restrict to projects this user owns or is a member of.
    pub accessible_to: Option<Uuid>,
}

impl ProjectQuery {
    pub fn matches(&self, project: &Project) -> bool {
        if !self.include_archived && project.archived {
            return false;
        }
        match self.accessible_to {
            Some(user_id) => project.has_access(user_id),
            None => true,
        }
    }
}
