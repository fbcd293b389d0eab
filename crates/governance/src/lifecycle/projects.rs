use tracing::instrument;
use uuid::Uuid;

use super::{project_visibility, validation};
use crate::{
    GovernanceState,
    api::projects::{CreateProjectRequest, ProjectListing, UpdateProjectRequest},
    authz,
    db::{
        ArchiveState,
        identity::Actor,
        projects::{Project, ProjectChanges, ProjectQuery},
        tasks::TaskChanges,
        types::WorkStatus,
    },
    error::{GovernanceError, GovernanceResult},
};

pub struct ProjectManager<'a> {
    state: &'a GovernanceState,
}

impl<'a> ProjectManager<'a> {
    pub fn new(state: &'a GovernanceState) -> Self {
        Self { state }
    }

    #[instrument(name = "projects.create", skip(self, data, actor), fields(user_id = %actor.id))]
    pub async fn create(
        &self,
        data: CreateProjectRequest,
        actor: &Actor,
    ) -> GovernanceResult<Project> {
        let name = validation::required_text(&data.name, "Project name")?;
        let due_date = data
            .due_date
            .map(|due| validation::due_date(due, self.state.clock().today()))
            .transpose()?;
        let priority = data.priority.map(validation::priority).transpose()?;
        let status = data
            .status
            .as_deref()
            .map(validation::status)
            .transpose()?
            .unwrap_or_default();
        let tags = validation::tags(data.tags.unwrap_or_default());
        let member_ids = match data.member_ids {
            Some(ids) => validation::dedup_ids(ids),
            None => vec![actor.id],
        };

        let now = self.state.clock().now();
        let project = Project {
            id: Uuid::new_v4(),
            name,
            description: data.description,
            owner_id: actor.id,
            member_ids,
            status,
            priority,
            due_date,
            tags,
            archived: false,
            archived_at: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        let project = self.state.store().insert_project(project).await?;
        tracing::info!(project_id = %project.id, "project created");
        Ok(project)
    }

    /// Owner-only update. Flipping `archived` writes the project and the new
    /// archive state of every task of the project in one atomic step.
    #[instrument(
        name = "projects.update",
        skip(self, data, actor),
        fields(user_id = %actor.id, project_id = %id)
    )]
    pub async fn update(
        &self,
        id: Uuid,
        data: UpdateProjectRequest,
        actor: &Actor,
    ) -> GovernanceResult<Project> {
        let store = self.state.store();
        let existing = self.get(id).await?;
        if !authz::can_manage_project(actor, &existing) {
            return Err(GovernanceError::permission(
                "Only the project owner can update this project",
            ));
        }

        let today = self.state.clock().today();
        let mut changes = ProjectChanges {
            name: data
                .name
                .as_deref()
                .map(|name| validation::required_text(name, "Project name"))
                .transpose()?,
            description: data.description.map(Some),
            member_ids: data.member_ids.map(validation::dedup_ids),
            status: data
                .status
                .as_deref()
                .map(validation::status)
                .transpose()?,
            priority: data
                .priority
                .map(validation::priority)
                .transpose()?
                .map(Some),
            due_date: data
                .due_date
                .map(|due| validation::due_date(due, today))
                .transpose()?
                .map(Some),
            tags: data.tags.map(validation::tags),
            archive: None,
        };

        let cascade = match data.archived {
            Some(archived) if archived != existing.archived => {
                let state = if archived {
                    ArchiveState::archived_at(self.state.clock().now())
                } else {
                    ArchiveState::active()
                };
                changes.archive = Some(state);
                Some(state)
            }
            _ => None,
        };

        let project = match cascade {
            // The flip was decided against `existing`, so the write must not land on
            // anything newer.
            Some(state) => {
                let expected = data.version.or(Some(existing.version));
                let (project, affected) = store
                    .update_project_with_tasks(id, &changes, &TaskChanges::archive(state), expected)
                    .await?
                    .ok_or_else(|| GovernanceError::conflict("project version mismatch"))?;
                tracing::info!(
                    project_id = %id,
                    archived = state.archived,
                    affected,
                    "cascaded project archive state to tasks"
                );
                project
            }
            None => store
                .update_project(id, &changes, data.version)
                .await?
                .ok_or_else(|| GovernanceError::conflict("project version mismatch"))?,
        };

        tracing::info!(project_id = %project.id, version = project.version, "project updated");
        Ok(project)
    }

    pub async fn archive(&self, id: Uuid, actor: &Actor) -> GovernanceResult<Project> {
        self.update(
            id,
            UpdateProjectRequest {
                archived: Some(true),
                ..UpdateProjectRequest::default()
            },
            actor,
        )
        .await
    }

    pub async fn unarchive(&self, id: Uuid, actor: &Actor) -> GovernanceResult<Project> {
        self.update(
            id,
            UpdateProjectRequest {
                archived: Some(false),
                ..UpdateProjectRequest::default()
            },
            actor,
        )
        .await
    }

    /// Removes the project only; its tasks stay in the store.
    #[instrument(
        name = "projects.delete",
        skip(self, actor),
        fields(user_id = %actor.id, project_id = %id)
    )]
    pub async fn delete(&self, id: Uuid, actor: &Actor) -> GovernanceResult<()> {
        let existing = self.get(id).await?;
        if !authz::can_manage_project(actor, &existing) {
            return Err(GovernanceError::permission(
                "Only the project owner can delete this project",
            ));
        }
        if !self.state.store().delete_project(id).await? {
            return Err(GovernanceError::not_found("Project", id));
        }
        tracing::info!(project_id = %id, "project deleted");
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> GovernanceResult<Project> {
        self.state
            .store()
            .find_project(id)
            .await?
            .ok_or_else(|| GovernanceError::not_found("Project", id))
    }

    /// Every project matching `query`, each annotated with whether the actor
    /// may see its tasks. Projects are never filtered out on that basis.
    #[instrument(name = "projects.list_for_actor", skip(self, actor), fields(user_id = %actor.id))]
    pub async fn list_for_actor(
        &self,
        actor: &Actor,
        query: &ProjectQuery,
    ) -> GovernanceResult<Vec<ProjectListing>> {
        let store = self.state.store();
        let projects = store.find_projects(query).await?;
        let mut listings = Vec::with_capacity(projects.len());
        for project in projects {
            let can_view_tasks = project_visibility(store, actor, project.id).await?;
            listings.push(ProjectListing {
                project,
                can_view_tasks,
            });
        }
        tracing::debug!(count = listings.len(), "listed projects");
        Ok(listings)
    }

    /// Tasks may only be added to projects that are neither archived nor completed.
    pub(super) fn ensure_open(project: &Project) -> GovernanceResult<()> {
        if project.archived {
            return Err(GovernanceError::conflict(
                "Cannot add tasks to an archived project",
            ));
        }
        if project.status == WorkStatus::Completed {
            return Err(GovernanceError::conflict(
                "Cannot add tasks to a completed project",
            ));
        }
        Ok(())
    }
}
