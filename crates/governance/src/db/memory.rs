use std::{collections::HashMap, path::Path};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    EntityStore, Snapshot, SortOrder, StoreError,
    identity::User,
    projects::{Project, ProjectChanges, ProjectQuery},
    subtasks::{Subtask, SubtaskChanges, SubtaskQuery},
    tasks::{Task, TaskChanges, TaskQuery},
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    projects: HashMap<Uuid, Project>,
    tasks: HashMap<Uuid, Task>,
    subtasks: HashMap<Uuid, Subtask>,
}

/// Process-local `EntityStore`. Each call holds the table lock for its whole
/// read-modify-write, so a single update is atomic with respect to others.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let tables = Tables {
            users: snapshot.users.into_iter().map(|u| (u.id, u)).collect(),
            projects: snapshot.projects.into_iter().map(|p| (p.id, p)).collect(),
            tasks: snapshot.tasks.into_iter().map(|t| (t.id, t)).collect(),
            subtasks: snapshot.subtasks.into_iter().map(|s| (s.id, s)).collect(),
        };
        Self {
            tables: RwLock::new(tables),
        }
    }

    pub async fn load_snapshot(path: &Path) -> Result<Self, StoreError> {
        let raw = tokio::fs::read_to_string(path).await?;
        let snapshot: Snapshot = serde_json::from_str(&raw)?;
        tracing::debug!(
            path = %path.display(),
            users = snapshot.users.len(),
            projects = snapshot.projects.len(),
            tasks = snapshot.tasks.len(),
            subtasks = snapshot.subtasks.len(),
            "loaded store snapshot"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    pub async fn snapshot(&self) -> Snapshot {
        let tables = self.tables.read().await;
        let mut projects: Vec<Project> = tables.projects.values().cloned().collect();
        projects.sort_by_key(|p| (p.created_at, p.id));
        let mut tasks: Vec<Task> = tables.tasks.values().cloned().collect();
        sort_records(&mut tasks, SortOrder::CreatedAt, |t| (t.due_date, t.created_at, t.id));
        let mut subtasks: Vec<Subtask> = tables.subtasks.values().cloned().collect();
        sort_records(&mut subtasks, SortOrder::CreatedAt, |s| {
            (s.due_date, s.created_at, s.id)
        });
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Snapshot {
            users,
            projects,
            tasks,
            subtasks,
        }
    }

    pub async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(&user.id) {
            return Err(StoreError::Duplicate(user.id));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }
}

type SortKey = (Option<DateTime<Utc>>, DateTime<Utc>, Uuid);

fn sort_records<T>(records: &mut [T], order: SortOrder, key: impl Fn(&T) -> SortKey) {
    match order {
        SortOrder::CreatedAt => records.sort_by_key(|r| {
            let (_, created_at, id) = key(r);
            (created_at, id)
        }),
        SortOrder::DueDate => records.sort_by_key(|r| {
            let (due, created_at, id) = key(r);
            (due.is_none(), due, created_at, id)
        }),
    }
}

fn version_matches(current: i64, expected: Option<i64>) -> bool {
    expected.is_none_or(|expected| expected == current)
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect())
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        Ok(self.tables.read().await.projects.get(&id).cloned())
    }

    async fn find_projects(&self, query: &ProjectQuery) -> Result<Vec<Project>, StoreError> {
        let tables = self.tables.read().await;
        let mut projects: Vec<Project> = tables
            .projects
            .values()
            .filter(|project| query.matches(project))
            .cloned()
            .collect();
        projects.sort_by_key(|p| (p.created_at, p.id));
        Ok(projects)
    }

    async fn insert_project(&self, project: Project) -> Result<Project, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.projects.contains_key(&project.id) {
            return Err(StoreError::Duplicate(project.id));
        }
        tables.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn update_project(
        &self,
        id: Uuid,
        changes: &ProjectChanges,
        expected_version: Option<i64>,
    ) -> Result<Option<Project>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(project) = tables.projects.get_mut(&id) else {
            return Ok(None);
        };
        if !version_matches(project.version, expected_version) {
            return Ok(None);
        }
        changes.apply(project);
        project.version += 1;
        project.updated_at = Utc::now();
        Ok(Some(project.clone()))
    }

    async fn update_project_with_tasks(
        &self,
        id: Uuid,
        changes: &ProjectChanges,
        task_changes: &TaskChanges,
        expected_version: Option<i64>,
    ) -> Result<Option<(Project, u64)>, StoreError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let project = match tables.projects.get_mut(&id) {
            Some(project) if version_matches(project.version, expected_version) => {
                changes.apply(project);
                project.version += 1;
                project.updated_at = now;
                project.clone()
            }
            _ => return Ok(None),
        };

        let mut updated = 0;
        for task in tables
            .tasks
            .values_mut()
            .filter(|task| task.project_id == id)
        {
            task_changes.apply(task);
            task.version += 1;
            task.updated_at = now;
            updated += 1;
        }
        Ok(Some((project, updated)))
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.projects.remove(&id).is_some())
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(self.tables.read().await.tasks.get(&id).cloned())
    }

    async fn find_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>, StoreError> {
        let tables = self.tables.read().await;
        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter(|task| query.matches(task))
            .cloned()
            .collect();
        sort_records(&mut tasks, query.sort, |t| (t.due_date, t.created_at, t.id));
        Ok(tasks)
    }

    async fn insert_task(&self, task: Task) -> Result<Task, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.tasks.contains_key(&task.id) {
            return Err(StoreError::Duplicate(task.id));
        }
        tables.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn update_task(
        &self,
        id: Uuid,
        changes: &TaskChanges,
        expected_version: Option<i64>,
    ) -> Result<Option<Task>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(task) = tables.tasks.get_mut(&id) else {
            return Ok(None);
        };
        if !version_matches(task.version, expected_version) {
            return Ok(None);
        }
        changes.apply(task);
        task.version += 1;
        task.updated_at = Utc::now();
        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.tasks.remove(&id).is_some())
    }

    async fn find_subtask(&self, id: Uuid) -> Result<Option<Subtask>, StoreError> {
        Ok(self.tables.read().await.subtasks.get(&id).cloned())
    }

    async fn find_subtasks(&self, query: &SubtaskQuery) -> Result<Vec<Subtask>, StoreError> {
        let tables = self.tables.read().await;
        let mut subtasks: Vec<Subtask> = tables
            .subtasks
            .values()
            .filter(|subtask| query.matches(subtask))
            .cloned()
            .collect();
        sort_records(&mut subtasks, query.sort, |s| {
            (s.due_date, s.created_at, s.id)
        });
        Ok(subtasks)
    }

    async fn insert_subtask(&self, subtask: Subtask) -> Result<Subtask, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.subtasks.contains_key(&subtask.id) {
            return Err(StoreError::Duplicate(subtask.id));
        }
        tables.subtasks.insert(subtask.id, subtask.clone());
        Ok(subtask)
    }

    async fn update_subtask(
        &self,
        id: Uuid,
        changes: &SubtaskChanges,
        expected_version: Option<i64>,
    ) -> Result<Option<Subtask>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(subtask) = tables.subtasks.get_mut(&id) else {
            return Ok(None);
        };
        if !version_matches(subtask.version, expected_version) {
            return Ok(None);
        }
        changes.apply(subtask);
        subtask.version += 1;
        subtask.updated_at = Utc::now();
        Ok(Some(subtask.clone()))
    }
}
