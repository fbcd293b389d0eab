//! Managers that validate, authorize and commit changes to the hierarchy.
//!
//! Every mutation follows the same order: payload validation, entity load,
//! authorization, commit through the store, then cascades or successor
//! creation.

mod projects;
mod subtasks;
mod tasks;
pub mod validation;

use uuid::Uuid;

pub use projects::ProjectManager;
pub use subtasks::SubtaskManager;
pub use tasks::TaskManager;

use crate::{
    authz,
    db::{
        EntityStore,
        identity::{Actor, DepartmentDirectory, UserData},
        projects::Project,
        tasks::TaskQuery,
    },
    error::{GovernanceError, GovernanceResult},
};

const ASSIGNEE_NOT_MEMBER: &str = "Assignees must be the owner or a member of the project";

async fn department_directory(
    store: &dyn EntityStore,
    user_ids: &[Uuid],
) -> GovernanceResult<DepartmentDirectory> {
    let users = store.find_users(user_ids).await?;
    Ok(DepartmentDirectory::from_users(&users))
}

/// Loads every task of the project and the departments of their assignees.
async fn project_visibility(
    store: &dyn EntityStore,
    actor: &Actor,
    project_id: Uuid,
) -> GovernanceResult<bool> {
    if actor.is_admin() {
        return Ok(true);
    }
    let tasks = store
        .find_tasks(&TaskQuery::for_project(project_id).including_archived())
        .await?;
    let assignee_ids: Vec<Uuid> = tasks
        .iter()
        .flat_map(|task| task.assignee_ids.iter().copied())
        .collect();
    let directory = department_directory(store, &assignee_ids).await?;
    Ok(authz::can_view_tasks(actor, &tasks, &directory))
}

/// The user must exist and be the project's owner or one of its members.
async fn ensure_member(
    store: &dyn EntityStore,
    user_id: Uuid,
    project: &Project,
    denied: &str,
) -> GovernanceResult<()> {
    store
        .find_user(user_id)
        .await?
        .ok_or_else(|| GovernanceError::not_found("User", user_id))?;
    if !authz::has_project_access(user_id, project) {
        return Err(GovernanceError::permission(denied));
    }
    Ok(())
}

/// Checks a replacement assignee list against the current one. Dropping anyone
/// takes a manager; everyone added must belong to the project.
async fn ensure_assignee_change(
    store: &dyn EntityStore,
    actor: &Actor,
    current: &[Uuid],
    next: &[Uuid],
    project_id: Uuid,
) -> GovernanceResult<()> {
    let removed = current.iter().any(|id| !next.contains(id));
    if removed && !authz::can_remove_assignees(actor) {
        return Err(GovernanceError::permission(
            "Only managers can remove assignees",
        ));
    }
    let added: Vec<Uuid> = next
        .iter()
        .copied()
        .filter(|candidate| !current.contains(candidate))
        .collect();
    if added.is_empty() {
        return Ok(());
    }
    let project = store
        .find_project(project_id)
        .await?
        .ok_or_else(|| GovernanceError::not_found("Project", project_id))?;
    for user_id in added {
        ensure_member(store, user_id, &project, ASSIGNEE_NOT_MEMBER).await?;
    }
    Ok(())
}

async fn populate_users(
    store: &dyn EntityStore,
    owner_id: Uuid,
    assignee_ids: &[Uuid],
) -> GovernanceResult<(Option<UserData>, Vec<UserData>)> {
    let owner = store.find_user(owner_id).await?.as_ref().map(UserData::from);
    let assignees = store
        .find_users(assignee_ids)
        .await?
        .iter()
        .map(UserData::from)
        .collect();
    Ok((owner, assignees))
}
