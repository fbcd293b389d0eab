#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use governance::{
    FixedClock, GovernanceState, MemoryStore,
    db::{
        EntityStore, StoreError,
        identity::{Actor, User},
        projects::{Project, ProjectChanges, ProjectQuery},
        subtasks::{Subtask, SubtaskChanges, SubtaskQuery},
        tasks::{Task, TaskChanges, TaskQuery},
        types::{Role, WorkStatus},
    },
    notify::{NewNotification, Notification, NotificationError, NotificationSink},
};
use uuid::Uuid;

pub fn start_of_test() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<NewNotification>>,
}

impl RecordingSink {
    pub fn sent(&self) -> Vec<NewNotification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn create(&self, notification: NewNotification) -> Result<Notification, NotificationError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(Notification {
            id: Uuid::new_v4(),
            recipient_id: notification.recipient_id,
            message: notification.message,
            acting_user_id: notification.acting_user_id,
            deadline: notification.deadline,
            created_at: Utc::now(),
        })
    }
}

pub struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    async fn create(&self, _: NewNotification) -> Result<Notification, NotificationError> {
        Err(NotificationError::Delivery("mail relay unreachable".to_string()))
    }
}

/// A competing write that lands right after the next read of its record.
pub enum Interleaved {
    TaskAssignees { task_id: Uuid, assignee_ids: Vec<Uuid> },
    ProjectDescription { project_id: Uuid, description: String },
}

/// Wraps the fixture store so another writer can slip in between a manager's
/// read and its commit.
pub struct InterleavingStore {
    inner: Arc<MemoryStore>,
    pending: Mutex<Option<Interleaved>>,
}

impl InterleavingStore {
    fn take_if(&self, matches: impl Fn(&Interleaved) -> bool) -> Option<Interleaved> {
        let mut pending = self.pending.lock().unwrap();
        if pending.as_ref().is_some_and(|write| matches(write)) {
            pending.take()
        } else {
            None
        }
    }

    async fn apply(&self, write: Interleaved) {
        match write {
            Interleaved::TaskAssignees {
                task_id,
                assignee_ids,
            } => {
                let changes = TaskChanges {
                    assignee_ids: Some(assignee_ids),
                    ..TaskChanges::default()
                };
                self.inner.update_task(task_id, &changes, None).await.unwrap();
            }
            Interleaved::ProjectDescription {
                project_id,
                description,
            } => {
                let changes = ProjectChanges {
                    description: Some(Some(description)),
                    ..ProjectChanges::default()
                };
                self.inner
                    .update_project(project_id, &changes, None)
                    .await
                    .unwrap();
            }
        }
    }
}

#[async_trait]
impl EntityStore for InterleavingStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.inner.find_user(id).await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.inner.find_user_by_username(username).await
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        self.inner.find_users(ids).await
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        let project = self.inner.find_project(id).await?;
        let write = self.take_if(|write| {
            matches!(write, Interleaved::ProjectDescription { project_id, .. } if *project_id == id)
        });
        if let Some(write) = write {
            self.apply(write).await;
        }
        Ok(project)
    }

    async fn find_projects(&self, query: &ProjectQuery) -> Result<Vec<Project>, StoreError> {
        self.inner.find_projects(query).await
    }

    async fn insert_project(&self, project: Project) -> Result<Project, StoreError> {
        self.inner.insert_project(project).await
    }

    async fn update_project(
        &self,
        id: Uuid,
        changes: &ProjectChanges,
        expected_version: Option<i64>,
    ) -> Result<Option<Project>, StoreError> {
        self.inner.update_project(id, changes, expected_version).await
    }

    async fn update_project_with_tasks(
        &self,
        id: Uuid,
        changes: &ProjectChanges,
        task_changes: &TaskChanges,
        expected_version: Option<i64>,
    ) -> Result<Option<(Project, u64)>, StoreError> {
        self.inner
            .update_project_with_tasks(id, changes, task_changes, expected_version)
            .await
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool, StoreError> {
        self.inner.delete_project(id).await
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let task = self.inner.find_task(id).await?;
        let write = self.take_if(|write| {
            matches!(write, Interleaved::TaskAssignees { task_id, .. } if *task_id == id)
        });
        if let Some(write) = write {
            self.apply(write).await;
        }
        Ok(task)
    }

    async fn find_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>, StoreError> {
        self.inner.find_tasks(query).await
    }

    async fn insert_task(&self, task: Task) -> Result<Task, StoreError> {
        self.inner.insert_task(task).await
    }

    async fn update_task(
        &self,
        id: Uuid,
        changes: &TaskChanges,
        expected_version: Option<i64>,
    ) -> Result<Option<Task>, StoreError> {
        self.inner.update_task(id, changes, expected_version).await
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, StoreError> {
        self.inner.delete_task(id).await
    }

    async fn find_subtask(&self, id: Uuid) -> Result<Option<Subtask>, StoreError> {
        self.inner.find_subtask(id).await
    }

    async fn find_subtasks(&self, query: &SubtaskQuery) -> Result<Vec<Subtask>, StoreError> {
        self.inner.find_subtasks(query).await
    }

    async fn insert_subtask(&self, subtask: Subtask) -> Result<Subtask, StoreError> {
        self.inner.insert_subtask(subtask).await
    }

    async fn update_subtask(
        &self,
        id: Uuid,
        changes: &SubtaskChanges,
        expected_version: Option<i64>,
    ) -> Result<Option<Subtask>, StoreError> {
        self.inner.update_subtask(id, changes, expected_version).await
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub sink: Arc<RecordingSink>,
    pub state: GovernanceState,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(start_of_test()));
        let sink = Arc::new(RecordingSink::default());
        let state = GovernanceState::new(store.clone(), clock.clone(), sink.clone());
        Self {
            store,
            clock,
            sink,
            state,
        }
    }

    /// Same store and clock, but notifications always fail.
    pub fn with_failing_notifications(&self) -> GovernanceState {
        GovernanceState::new(self.store.clone(), self.clock.clone(), Arc::new(FailingSink))
    }

    /// Same store and clock, with `write` landing right after the next read of
    /// its record.
    pub fn with_interleaved_write(&self, write: Interleaved) -> GovernanceState {
        let store = InterleavingStore {
            inner: self.store.clone(),
            pending: Mutex::new(Some(write)),
        };
        GovernanceState::new(Arc::new(store), self.clock.clone(), self.sink.clone())
    }

    pub async fn user(&self, username: &str, role: Role, department: Option<&str>) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: Some(format!("{username}@example.com")),
            first_name: Some(username.to_string()),
            last_name: None,
            role,
            department: department.map(str::to_string),
            created_at: start_of_test(),
        };
        self.store.insert_user(user).await.unwrap()
    }

    pub async fn project(&self, owner: &User, members: &[&User]) -> Project {
        let now = self.clock_now();
        let project = Project {
            id: Uuid::new_v4(),
            name: "Website relaunch".to_string(),
            description: None,
            owner_id: owner.id,
            member_ids: members.iter().map(|member| member.id).collect(),
            status: WorkStatus::ToDo,
            priority: None,
            due_date: None,
            tags: Vec::new(),
            archived: false,
            archived_at: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_project(project).await.unwrap()
    }

    /// Seeds a task directly, bypassing creation rules.
    pub async fn task(&self, project: &Project, owner: &User, assignees: &[&User]) -> Task {
        let now = self.clock_now();
        let task = Task {
            id: Uuid::new_v4(),
            project_id: project.id,
            title: "Draft landing page".to_string(),
            description: None,
            status: WorkStatus::ToDo,
            priority: 5,
            due_date: None,
            tags: Vec::new(),
            owner_id: owner.id,
            assignee_ids: assignees.iter().map(|user| user.id).collect(),
            is_recurring: false,
            recurrence_interval: None,
            time_taken: String::new(),
            archived: false,
            archived_at: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_task(task).await.unwrap()
    }

    pub async fn subtask(&self, task: &Task, time_taken: &str, archived: bool) -> Subtask {
        let now = self.clock_now();
        let subtask = Subtask {
            id: Uuid::new_v4(),
            parent_task_id: task.id,
            project_id: task.project_id,
            title: "Collect copy".to_string(),
            description: None,
            status: WorkStatus::ToDo,
            priority: 5,
            due_date: None,
            tags: Vec::new(),
            owner_id: task.owner_id,
            assignee_ids: Vec::new(),
            is_recurring: false,
            recurrence_interval: None,
            time_taken: time_taken.to_string(),
            archived,
            archived_at: archived.then_some(now),
            version: 1,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_subtask(subtask).await.unwrap()
    }

    pub async fn reload_task(&self, id: Uuid) -> Task {
        self.store.find_task(id).await.unwrap().unwrap()
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        use governance::Clock;
        self.clock.now()
    }
}

pub fn actor(user: &User) -> Actor {
    Actor::from(user)
}
