use tracing::instrument;
use uuid::Uuid;

use super::{
    ASSIGNEE_NOT_MEMBER, ProjectManager, department_directory, ensure_assignee_change,
    ensure_member, populate_users, project_visibility, validation,
};
use crate::{
    GovernanceState,
    api::tasks::{CreateTaskRequest, TaskUpdateResponse, TimeSummary, UpdateTaskRequest},
    authz,
    db::{
        ArchiveState, SortOrder,
        identity::{Actor, User},
        projects::Project,
        subtasks::SubtaskQuery,
        tasks::{DEFAULT_PRIORITY, MAX_TASK_ASSIGNEES, Task, TaskChanges, TaskQuery, TaskWithUsers},
        types::WorkStatus,
    },
    error::{GovernanceError, GovernanceResult},
    notify::NewNotification,
    recurrence::{RecurrenceRule, next_occurrence},
    time,
};

pub struct TaskManager<'a> {
    state: &'a GovernanceState,
}

impl<'a> TaskManager<'a> {
    pub fn new(state: &'a GovernanceState) -> Self {
        Self { state }
    }

    /// The creator becomes owner and first assignee. Supplied assignees are
    /// appended after de-duplication and must belong to the project.
    #[instrument(
        name = "tasks.create",
        skip(self, data, actor),
        fields(user_id = %actor.id, project_id = %data.project_id)
    )]
    pub async fn create(&self, data: CreateTaskRequest, actor: &Actor) -> GovernanceResult<Task> {
        let title = validation::required_text(&data.title, "Task title")?;
        let priority = data
            .priority
            .map(validation::priority)
            .transpose()?
            .unwrap_or(DEFAULT_PRIORITY);
        let due_date = data
            .due_date
            .map(|due| validation::due_date(due, self.state.clock().today()))
            .transpose()?;
        let time_taken = data
            .time_taken
            .as_deref()
            .map(validation::time_taken)
            .transpose()?
            .unwrap_or_default();
        let status = data
            .status
            .as_deref()
            .map(validation::status)
            .transpose()?
            .unwrap_or_default();
        let is_recurring = data.is_recurring.unwrap_or(false);
        let recurrence_interval =
            validation::recurrence_interval_for(is_recurring, data.recurrence_interval)?;
        RecurrenceRule {
            is_recurring,
            interval_days: recurrence_interval,
            due_date,
        }
        .validate()?;

        let assignee_ids = validation::dedup_ids(
            std::iter::once(actor.id).chain(data.assignee_ids.unwrap_or_default()),
        );
        validation::ensure_assignee_capacity(assignee_ids.len())?;

        let project = self.load_project(data.project_id).await?;
        ProjectManager::ensure_open(&project)?;
        for &user_id in assignee_ids.iter().filter(|id| **id != actor.id) {
            ensure_member(self.state.store(), user_id, &project, ASSIGNEE_NOT_MEMBER).await?;
        }

        let now = self.state.clock().now();
        let task = Task {
            id: Uuid::new_v4(),
            project_id: project.id,
            title,
            description: data.description,
            status,
            priority,
            due_date,
            tags: validation::tags(data.tags.unwrap_or_default()),
            owner_id: actor.id,
            assignee_ids,
            is_recurring,
            recurrence_interval,
            time_taken,
            archived: false,
            archived_at: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        let task = self.state.store().insert_task(task).await?;
        tracing::info!(task_id = %task.id, "task created");
        Ok(task)
    }

    /// Field validation runs before the task is even loaded, so a malformed
    /// patch is reported as such whoever sends it.
    #[instrument(
        name = "tasks.update",
        skip(self, data, actor),
        fields(user_id = %actor.id, task_id = %id)
    )]
    pub async fn update(
        &self,
        id: Uuid,
        data: UpdateTaskRequest,
        actor: &Actor,
    ) -> GovernanceResult<TaskUpdateResponse> {
        let today = self.state.clock().today();
        let title = data
            .title
            .as_deref()
            .map(|title| validation::required_text(title, "Task title"))
            .transpose()?;
        let due_date = data
            .due_date
            .map(|due| validation::due_date(due, today))
            .transpose()?;
        let priority = data.priority.map(validation::priority).transpose()?;
        let time_taken = data
            .time_taken
            .as_deref()
            .map(validation::time_taken)
            .transpose()?;
        let status = data
            .status
            .as_deref()
            .map(validation::status)
            .transpose()?;
        let interval_patch = validation::recurrence_interval_for(
            data.is_recurring != Some(false),
            data.recurrence_interval,
        )?;
        let assignee_ids = data.assignee_ids.map(validation::dedup_ids);
        if let Some(ids) = &assignee_ids {
            validation::ensure_has_assignee(ids.len())?;
            validation::ensure_assignee_capacity(ids.len())?;
        }
        if data.project_id.is_some() {
            return Err(GovernanceError::conflict(
                "A task cannot be moved to another project",
            ));
        }

        let existing = self.load(id).await?;
        self.ensure_can_mutate(actor, &existing).await?;

        if let Some(next) = &assignee_ids {
            ensure_assignee_change(
                self.state.store(),
                actor,
                &existing.assignee_ids,
                next,
                existing.project_id,
            )
            .await?;
        }

        let is_recurring = data.is_recurring.unwrap_or(existing.is_recurring);
        let recurrence_interval = if is_recurring {
            interval_patch.or(existing.recurrence_interval)
        } else {
            None
        };
        RecurrenceRule {
            is_recurring,
            interval_days: recurrence_interval,
            due_date: due_date.or(existing.due_date),
        }
        .validate()?;
        let recurrence_touched = data.is_recurring.is_some() || data.recurrence_interval.is_some();

        let changes = TaskChanges {
            title,
            description: data.description.map(Some),
            status,
            priority,
            due_date: due_date.map(Some),
            tags: data.tags.map(validation::tags),
            owner_id: None,
            assignee_ids,
            is_recurring: recurrence_touched.then_some(is_recurring),
            recurrence_interval: recurrence_touched.then_some(recurrence_interval),
            time_taken,
            archive: None,
        };

        let task = self
            .state
            .store()
            .update_task(id, &changes, data.version)
            .await?
            .ok_or_else(|| GovernanceError::conflict("task version mismatch"))?;
        tracing::info!(task_id = %task.id, version = task.version, "task updated");

        let completed_now =
            existing.status != WorkStatus::Completed && task.status == WorkStatus::Completed;
        let successor = if completed_now {
            self.successor_if_project_open(&task).await?
        } else {
            None
        };

        Ok(TaskUpdateResponse { task, successor })
    }

    /// Hands ownership to the user named by `identifier` (a user id or a
    /// username). The previous owner joins the assignees.
    #[instrument(
        name = "tasks.assign_owner",
        skip(self, acting),
        fields(user_id = %acting.id, task_id = %task_id)
    )]
    pub async fn assign_owner(
        &self,
        task_id: Uuid,
        identifier: &str,
        acting: &Actor,
    ) -> GovernanceResult<Task> {
        let store = self.state.store();
        let target = self.resolve_user(identifier).await?;
        let existing = self.load(task_id).await?;
        self.ensure_can_mutate(acting, &existing).await?;

        let project = self.load_project(existing.project_id).await?;
        if !authz::has_project_access(target.id, &project) {
            return Err(GovernanceError::permission(
                "The new owner does not have access to this project",
            ));
        }

        let assignee_ids: Vec<Uuid> = validation::dedup_ids(
            existing
                .assignee_ids
                .iter()
                .copied()
                .chain(std::iter::once(existing.owner_id)),
        )
        .into_iter()
        .filter(|id| *id != target.id)
        .collect();
        if 1 + assignee_ids.len() > MAX_TASK_ASSIGNEES {
            return Err(GovernanceError::capacity(format!(
                "A task can involve at most {MAX_TASK_ASSIGNEES} people including its owner"
            )));
        }

        let changes = TaskChanges {
            owner_id: Some(target.id),
            assignee_ids: Some(assignee_ids),
            ..TaskChanges::default()
        };
        let task = store
            .update_task(task_id, &changes, Some(existing.version))
            .await?
            .ok_or_else(|| GovernanceError::conflict("task version mismatch"))?;
        tracing::info!(task_id = %task.id, owner_id = %target.id, "task ownership transferred");

        let notification = NewNotification {
            recipient_id: target.id,
            message: format!("You are now the owner of task \"{}\"", task.title),
            acting_user_id: acting.id,
            deadline: task.due_date,
        };
        if let Err(error) = self.state.notifications().create(notification).await {
            tracing::warn!(?error, recipient_id = %target.id, "failed to notify new task owner");
        }

        Ok(task)
    }

    #[instrument(
        name = "tasks.add_assignee",
        skip(self, actor),
        fields(user_id = %actor.id, task_id = %task_id, assignee_id = %user_id)
    )]
    pub async fn add_assignee(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        actor: &Actor,
    ) -> GovernanceResult<Task> {
        let existing = self.load(task_id).await?;
        if !authz::can_add_assignee(actor, &existing) {
            return Err(GovernanceError::permission(
                "You do not have permission to add assignees to this task",
            ));
        }
        let project = self.load_project(existing.project_id).await?;
        ensure_member(self.state.store(), user_id, &project, ASSIGNEE_NOT_MEMBER).await?;
        if existing.is_assignee(user_id) {
            return Ok(existing);
        }

        let mut assignee_ids = existing.assignee_ids.clone();
        assignee_ids.push(user_id);
        validation::ensure_assignee_capacity(assignee_ids.len())?;

        let task = self.commit_assignees(&existing, assignee_ids).await?;
        tracing::info!(task_id = %task.id, assignee_id = %user_id, "assignee added");
        Ok(task)
    }

    #[instrument(
        name = "tasks.remove_assignee",
        skip(self, actor),
        fields(user_id = %actor.id, task_id = %task_id, assignee_id = %user_id)
    )]
    pub async fn remove_assignee(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        actor: &Actor,
    ) -> GovernanceResult<Task> {
        let existing = self.load(task_id).await?;
        if !authz::can_remove_assignee(actor, &existing) {
            return Err(GovernanceError::permission(
                "Only the task owner or a manager can remove assignees",
            ));
        }
        if !existing.is_assignee(user_id) {
            return Ok(existing);
        }

        let assignee_ids: Vec<Uuid> = existing
            .assignee_ids
            .iter()
            .copied()
            .filter(|id| *id != user_id)
            .collect();
        validation::ensure_has_assignee(assignee_ids.len())?;

        let task = self.commit_assignees(&existing, assignee_ids).await?;
        tracing::info!(task_id = %task.id, assignee_id = %user_id, "assignee removed");
        Ok(task)
    }

    #[instrument(
        name = "tasks.archive",
        skip(self, actor),
        fields(user_id = %actor.id, task_id = %id)
    )]
    pub async fn archive_task(&self, id: Uuid, actor: &Actor) -> GovernanceResult<Task> {
        let existing = self.load(id).await?;
        if !authz::can_archive_task(actor, &existing) {
            return Err(GovernanceError::permission(
                "You do not have permission to archive this task",
            ));
        }
        if existing.archived {
            return Ok(existing);
        }
        let state = ArchiveState::archived_at(self.state.clock().now());
        let task = self.commit_archive(id, state).await?;
        tracing::info!(task_id = %task.id, "task archived");
        Ok(task)
    }

    #[instrument(
        name = "tasks.unarchive",
        skip(self, actor),
        fields(user_id = %actor.id, task_id = %id)
    )]
    pub async fn unarchive_task(&self, id: Uuid, actor: &Actor) -> GovernanceResult<Task> {
        let existing = self.load(id).await?;
        if !authz::can_unarchive_task(actor, &existing) {
            return Err(GovernanceError::permission(
                "Only the task owner or an assignee can unarchive this task",
            ));
        }
        let project = self.load_project(existing.project_id).await?;
        if project.archived {
            return Err(GovernanceError::conflict(
                "Cannot unarchive a task while its project is archived",
            ));
        }
        if !existing.archived {
            return Ok(existing);
        }
        let task = self.commit_archive(id, ArchiveState::active()).await?;
        tracing::info!(task_id = %task.id, "task unarchived");
        Ok(task)
    }

    #[instrument(
        name = "tasks.delete",
        skip(self, actor),
        fields(user_id = %actor.id, task_id = %id)
    )]
    pub async fn delete(&self, id: Uuid, actor: &Actor) -> GovernanceResult<()> {
        let existing = self.load(id).await?;
        if !existing.is_owner(actor.id) {
            return Err(GovernanceError::permission(
                "Only the task owner can delete this task",
            ));
        }
        if !self.state.store().delete_task(id).await? {
            return Err(GovernanceError::not_found("Task", id));
        }
        tracing::info!(task_id = %id, "task deleted");
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> GovernanceResult<Task> {
        self.load(id).await
    }

    pub async fn get_with_users(&self, id: Uuid) -> GovernanceResult<TaskWithUsers> {
        let task = self.load(id).await?;
        let (owner, assignees) =
            populate_users(self.state.store(), task.owner_id, &task.assignee_ids).await?;
        Ok(TaskWithUsers {
            task,
            owner,
            assignees,
        })
    }

    /// Active tasks of a project, earliest due date first.
    #[instrument(
        name = "tasks.list_for_project",
        skip(self, actor),
        fields(user_id = %actor.id, project_id = %project_id)
    )]
    pub async fn list_for_project(
        &self,
        project_id: Uuid,
        actor: &Actor,
    ) -> GovernanceResult<Vec<Task>> {
        let store = self.state.store();
        self.load_project(project_id).await?;
        if !project_visibility(store, actor, project_id).await? {
            return Err(GovernanceError::permission(
                "You do not have permission to view tasks in this project",
            ));
        }
        let tasks = store
            .find_tasks(&TaskQuery::for_project(project_id).sorted(SortOrder::DueDate))
            .await?;
        Ok(tasks)
    }

    /// Time recorded on the task plus its active subtasks.
    pub async fn time_summary(&self, task_id: Uuid) -> GovernanceResult<TimeSummary> {
        let task = self.load(task_id).await?;
        let subtasks = self
            .state
            .store()
            .find_subtasks(&SubtaskQuery::for_task(task_id))
            .await?;

        let task_minutes = time::parse_time_to_minutes(&task.time_taken);
        let total_minutes = time::aggregate_minutes(
            &task.time_taken,
            subtasks.iter().map(|subtask| subtask.time_taken.as_str()),
        );
        Ok(TimeSummary {
            task_id,
            task_minutes,
            subtask_minutes: total_minutes.saturating_sub(task_minutes),
            total_minutes,
            total: time::format_total(total_minutes),
        })
    }

    /// Persists the next occurrence of a recurring task. One-off tasks yield `None`.
    #[instrument(name = "tasks.create_recurring", skip(self, original), fields(task_id = %original.id))]
    pub async fn create_recurring_task(&self, original: &Task) -> GovernanceResult<Option<Task>> {
        let Some(successor) = next_occurrence(original, self.state.clock().now())? else {
            return Ok(None);
        };
        let successor = self.state.store().insert_task(successor).await?;
        tracing::info!(
            task_id = %original.id,
            successor_id = %successor.id,
            due_date = ?successor.due_date,
            "created next occurrence of recurring task"
        );
        Ok(Some(successor))
    }

    /// No next occurrence is created inside a project that no longer takes tasks.
    async fn successor_if_project_open(&self, task: &Task) -> GovernanceResult<Option<Task>> {
        let project = self.load_project(task.project_id).await?;
        if let Err(reason) = ProjectManager::ensure_open(&project) {
            tracing::info!(task_id = %task.id, %reason, "skipped next occurrence of recurring task");
            return Ok(None);
        }
        self.create_recurring_task(task).await
    }

    async fn load(&self, id: Uuid) -> GovernanceResult<Task> {
        self.state
            .store()
            .find_task(id)
            .await?
            .ok_or_else(|| GovernanceError::not_found("Task", id))
    }

    async fn load_project(&self, id: Uuid) -> GovernanceResult<Project> {
        ProjectManager::new(self.state).get(id).await
    }

    async fn ensure_can_mutate(&self, actor: &Actor, task: &Task) -> GovernanceResult<()> {
        let directory = department_directory(self.state.store(), &task.assignee_ids).await?;
        if !authz::can_mutate_task(actor, task, &directory) {
            return Err(GovernanceError::permission(
                "You do not have permission to modify this task",
            ));
        }
        Ok(())
    }

    async fn resolve_user(&self, identifier: &str) -> GovernanceResult<User> {
        let store = self.state.store();
        let user = match Uuid::parse_str(identifier) {
            Ok(id) => store.find_user(id).await?,
            Err(_) => store.find_user_by_username(identifier).await?,
        };
        user.ok_or_else(|| GovernanceError::not_found("User", identifier))
    }

    /// Writes against the version the new list was computed from.
    async fn commit_assignees(
        &self,
        existing: &Task,
        assignee_ids: Vec<Uuid>,
    ) -> GovernanceResult<Task> {
        let changes = TaskChanges {
            assignee_ids: Some(assignee_ids),
            ..TaskChanges::default()
        };
        self.state
            .store()
            .update_task(existing.id, &changes, Some(existing.version))
            .await?
            .ok_or_else(|| GovernanceError::conflict("task version mismatch"))
    }

    async fn commit_archive(&self, id: Uuid, state: ArchiveState) -> GovernanceResult<Task> {
        self.state
            .store()
            .update_task(id, &TaskChanges::archive(state), None)
            .await?
            .ok_or_else(|| GovernanceError::not_found("Task", id))
    }
}
