//! Records and the persistence seam of the engine.
//!
//! `EntityStore` is the only way lifecycle managers touch storage. Updates take
//! field-level change sets, so two writers patching different fields of one record
//! never clobber each other; a stale `expected_version` makes the update match
//! nothing, which callers turn into a conflict.

pub mod identity;
pub mod memory;
pub mod projects;
pub mod subtasks;
pub mod tasks;
pub mod types;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use self::{
    identity::User,
    projects::{Project, ProjectChanges, ProjectQuery},
    subtasks::{Subtask, SubtaskChanges, SubtaskQuery},
    tasks::{Task, TaskChanges, TaskQuery},
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {0} already exists")]
    Duplicate(Uuid),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// `archived` and `archived_at` always travel together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveState {
    pub archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
}

impl ArchiveState {
    pub fn archived_at(at: DateTime<Utc>) -> Self {
        Self {
            archived: true,
            archived_at: Some(at),
        }
    }

    pub fn active() -> Self {
        Self {
            archived: false,
            archived_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    CreatedAt,
    /// Earliest due date first, undated items last.
    DueDate,
}

/// Everything a store holds, in a serializable form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError>;

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, StoreError>;

    async fn find_projects(&self, query: &ProjectQuery) -> Result<Vec<Project>, StoreError>;

    async fn insert_project(&self, project: Project) -> Result<Project, StoreError>;

    /// Returns `None` when no project matches `id` (and `expected_version`, if given).
    async fn update_project(
        &self,
        id: Uuid,
        changes: &ProjectChanges,
        expected_version: Option<i64>,
    ) -> Result<Option<Project>, StoreError>;

    async fn delete_project(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    async fn find_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>, StoreError>;

    async fn insert_task(&self, task: Task) -> Result<Task, StoreError>;

    async fn update_task(
        &self,
        id: Uuid,
        changes: &TaskChanges,
        expected_version: Option<i64>,
    ) -> Result<Option<Task>, StoreError>;

    /// Updates the project and applies `task_changes` to every one of its tasks,
    /// archived or not, as one atomic write. Returns the project and the number of
    /// tasks touched, or `None` under the same rules as [`Self::update_project`].
    async fn update_project_with_tasks(
        &self,
        id: Uuid,
        changes: &ProjectChanges,
        task_changes: &TaskChanges,
        expected_version: Option<i64>,
    ) -> Result<Option<(Project, u64)>, StoreError>;

    async fn delete_task(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn find_subtask(&self, id: Uuid) -> Result<Option<Subtask>, StoreError>;

    async fn find_subtasks(&self, query: &SubtaskQuery) -> Result<Vec<Subtask>, StoreError>;

    async fn insert_subtask(&self, subtask: Subtask) -> Result<Subtask, StoreError>;

    async fn update_subtask(
        &self,
        id: Uuid,
        changes: &SubtaskChanges,
        expected_version: Option<i64>,
    ) -> Result<Option<Subtask>, StoreError>;
}
