use tracing::instrument;
use uuid::Uuid;

use super::{
    ASSIGNEE_NOT_MEMBER, ProjectManager, department_directory, ensure_assignee_change,
    ensure_member, populate_users, validation,
};
use crate::{
    GovernanceState,
    api::subtasks::{CreateSubtaskRequest, SubtaskUpdateResponse, UpdateSubtaskRequest},
    authz,
    db::{
        ArchiveState,
        identity::Actor,
        projects::Project,
        subtasks::{Subtask, SubtaskChanges, SubtaskQuery, SubtaskWithUsers},
        tasks::{DEFAULT_PRIORITY, Task},
        types::WorkStatus,
    },
    error::{GovernanceError, GovernanceResult},
    recurrence::{RecurrenceRule, next_occurrence},
};

const SUBTASK_OWNER_NOT_MEMBER: &str =
    "A subtask owner must be the owner or a member of the project";

pub struct SubtaskManager<'a> {
    state: &'a GovernanceState,
}

impl<'a> SubtaskManager<'a> {
    pub fn new(state: &'a GovernanceState) -> Self {
        Self { state }
    }

    /// Only someone who may modify the parent task can attach a subtask to it.
    /// A named owner and the assignees must belong to the project.
    #[instrument(
        name = "subtasks.create",
        skip(self, data, actor),
        fields(user_id = %actor.id, parent_task_id = %data.parent_task_id)
    )]
    pub async fn create(
        &self,
        data: CreateSubtaskRequest,
        actor: &Actor,
    ) -> GovernanceResult<Subtask> {
        let title = validation::subtask_title(&data.title)?;
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
        let assignee_ids = validation::dedup_ids(data.assignee_ids.unwrap_or_default());
        validation::ensure_assignee_capacity(assignee_ids.len())?;

        let parent = self.load_parent(data.parent_task_id).await?;
        let project = self.load_project(parent.project_id).await?;
        if data.project_id.is_some_and(|project_id| project_id != project.id) {
            return Err(GovernanceError::conflict(
                "A subtask must belong to its parent task's project",
            ));
        }
        let store = self.state.store();
        let directory = department_directory(store, &parent.assignee_ids).await?;
        if !authz::can_mutate_task(actor, &parent, &directory) {
            return Err(GovernanceError::permission(
                "You do not have permission to add subtasks to this task",
            ));
        }
        let owner_id = data.owner_id.unwrap_or(actor.id);
        if owner_id != actor.id {
            ensure_member(store, owner_id, &project, SUBTASK_OWNER_NOT_MEMBER).await?;
        }
        for &user_id in assignee_ids.iter().filter(|id| **id != actor.id) {
            ensure_member(store, user_id, &project, ASSIGNEE_NOT_MEMBER).await?;
        }

        let now = self.state.clock().now();
        let subtask = Subtask {
            id: Uuid::new_v4(),
            parent_task_id: parent.id,
            project_id: project.id,
            title,
            description: data.description,
            status,
            priority,
            due_date,
            tags: validation::tags(data.tags.unwrap_or_default()),
            owner_id,
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

        let subtask = self.state.store().insert_subtask(subtask).await?;
        tracing::info!(subtask_id = %subtask.id, "subtask created");
        Ok(subtask)
    }

    #[instrument(
        name = "subtasks.update",
        skip(self, data, actor),
        fields(user_id = %actor.id, subtask_id = %id)
    )]
    pub async fn update(
        &self,
        id: Uuid,
        data: UpdateSubtaskRequest,
        actor: &Actor,
    ) -> GovernanceResult<SubtaskUpdateResponse> {
        let title = data
            .title
            .as_deref()
            .map(validation::subtask_title)
            .transpose()?;
        let due_date = data
            .due_date
            .map(|due| validation::due_date(due, self.state.clock().today()))
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
            validation::ensure_assignee_capacity(ids.len())?;
        }
        if data.parent_task_id.is_some() || data.project_id.is_some() {
            return Err(GovernanceError::conflict(
                "A subtask cannot be moved to another task or project",
            ));
        }

        let store = self.state.store();
        let existing = self.load(id).await?;
        let directory = department_directory(store, &existing.assignee_ids).await?;
        if !authz::can_mutate_subtask(actor, &existing, &directory) {
            return Err(GovernanceError::permission(
                "You do not have permission to modify this subtask",
            ));
        }

        if let Some(next) = &assignee_ids {
            ensure_assignee_change(
                store,
                actor,
                &existing.assignee_ids,
                next,
                existing.project_id,
            )
            .await?;
        }
        if let Some(owner_id) = data.owner_id.filter(|owner_id| *owner_id != existing.owner_id) {
            let project = self.load_project(existing.project_id).await?;
            ensure_member(store, owner_id, &project, SUBTASK_OWNER_NOT_MEMBER).await?;
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

        let changes = SubtaskChanges {
            title,
            description: data.description.map(Some),
            status,
            priority,
            due_date: due_date.map(Some),
            tags: data.tags.map(validation::tags),
            owner_id: data.owner_id,
            assignee_ids,
            is_recurring: recurrence_touched.then_some(is_recurring),
            recurrence_interval: recurrence_touched.then_some(recurrence_interval),
            time_taken,
            archive: None,
        };

        let subtask = store
            .update_subtask(id, &changes, data.version)
            .await?
            .ok_or_else(|| GovernanceError::conflict("subtask version mismatch"))?;
        tracing::info!(subtask_id = %subtask.id, version = subtask.version, "subtask updated");

        let completed_now =
            existing.status != WorkStatus::Completed && subtask.status == WorkStatus::Completed;
        let successor = if completed_now {
            self.successor_if_parent_open(&subtask).await?
        } else {
            None
        };

        Ok(SubtaskUpdateResponse { subtask, successor })
    }

    #[instrument(
        name = "subtasks.archive",
        skip(self, actor),
        fields(user_id = %actor.id, subtask_id = %id)
    )]
    pub async fn archive(&self, id: Uuid, actor: &Actor) -> GovernanceResult<Subtask> {
        let existing = self.load(id).await?;
        if !authz::can_archive_subtask(actor, &existing) {
            return Err(GovernanceError::permission(
                "You do not have permission to archive this subtask",
            ));
        }
        if existing.archived {
            return Ok(existing);
        }
        let state = ArchiveState::archived_at(self.state.clock().now());
        let subtask = self.commit_archive(id, state).await?;
        tracing::info!(subtask_id = %subtask.id, "subtask archived");
        Ok(subtask)
    }

    #[instrument(
        name = "subtasks.unarchive",
        skip(self, actor),
        fields(user_id = %actor.id, subtask_id = %id)
    )]
    pub async fn unarchive(&self, id: Uuid, actor: &Actor) -> GovernanceResult<Subtask> {
        let existing = self.load(id).await?;
        if !authz::can_unarchive_subtask(actor, &existing) {
            return Err(GovernanceError::permission(
                "Only the subtask owner or an assignee can unarchive this subtask",
            ));
        }
        let parent = self.load_parent(existing.parent_task_id).await?;
        if parent.archived {
            return Err(GovernanceError::conflict(
                "Cannot unarchive a subtask while its parent task is archived",
            ));
        }
        if !existing.archived {
            return Ok(existing);
        }
        let subtask = self.commit_archive(id, ArchiveState::active()).await?;
        tracing::info!(subtask_id = %subtask.id, "subtask unarchived");
        Ok(subtask)
    }

    pub async fn get(&self, id: Uuid) -> GovernanceResult<Subtask> {
        self.load(id).await
    }

    pub async fn get_with_users(&self, id: Uuid) -> GovernanceResult<SubtaskWithUsers> {
        let subtask = self.load(id).await?;
        let (owner, assignees) =
            populate_users(self.state.store(), subtask.owner_id, &subtask.assignee_ids).await?;
        Ok(SubtaskWithUsers {
            subtask,
            owner,
            assignees,
        })
    }

    /// Active subtasks of a task. Archived ones never appear here.
    pub async fn list_for_task(&self, task_id: Uuid) -> GovernanceResult<Vec<Subtask>> {
        self.load_parent(task_id).await?;
        Ok(self
            .state
            .store()
            .find_subtasks(&SubtaskQuery::for_task(task_id))
            .await?)
    }

    pub async fn list_for_project(&self, project_id: Uuid) -> GovernanceResult<Vec<Subtask>> {
        self.load_project(project_id).await?;
        Ok(self
            .state
            .store()
            .find_subtasks(&SubtaskQuery::for_project(project_id))
            .await?)
    }

    #[instrument(
        name = "subtasks.create_recurring",
        skip(self, original),
        fields(subtask_id = %original.id)
    )]
    pub async fn create_recurring_subtask(
        &self,
        original: &Subtask,
    ) -> GovernanceResult<Option<Subtask>> {
        let Some(successor) = next_occurrence(original, self.state.clock().now())? else {
            return Ok(None);
        };
        let successor = self.state.store().insert_subtask(successor).await?;
        tracing::info!(
            subtask_id = %original.id,
            successor_id = %successor.id,
            due_date = ?successor.due_date,
            "created next occurrence of recurring subtask"
        );
        Ok(Some(successor))
    }

    /// The next occurrence needs an active parent task in a project that still
    /// takes work.
    async fn successor_if_parent_open(
        &self,
        subtask: &Subtask,
    ) -> GovernanceResult<Option<Subtask>> {
        let parent = self.load_parent(subtask.parent_task_id).await?;
        let project = self.load_project(parent.project_id).await?;
        if parent.archived || ProjectManager::ensure_open(&project).is_err() {
            tracing::info!(
                subtask_id = %subtask.id,
                parent_archived = parent.archived,
                project_archived = project.archived,
                "skipped next occurrence of recurring subtask"
            );
            return Ok(None);
        }
        self.create_recurring_subtask(subtask).await
    }

    async fn load(&self, id: Uuid) -> GovernanceResult<Subtask> {
        self.state
            .store()
            .find_subtask(id)
            .await?
            .ok_or_else(|| GovernanceError::not_found("Subtask", id))
    }

    async fn load_parent(&self, task_id: Uuid) -> GovernanceResult<Task> {
        self.state
            .store()
            .find_task(task_id)
            .await?
            .ok_or_else(|| GovernanceError::not_found("Task", task_id))
    }

    async fn load_project(&self, id: Uuid) -> GovernanceResult<Project> {
        ProjectManager::new(self.state).get(id).await
    }

    async fn commit_archive(&self, id: Uuid, state: ArchiveState) -> GovernanceResult<Subtask> {
        self.state
            .store()
            .update_subtask(id, &SubtaskChanges::archive(state), None)
            .await?
            .ok_or_else(|| GovernanceError::not_found("Subtask", id))
    }
}
