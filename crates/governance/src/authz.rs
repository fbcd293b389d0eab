//! Role and department rules deciding who may see or change what.
//!
//! Everything here is a pure function of the actor, the entity snapshots and a
//! [`DepartmentDirectory`] the caller loaded beforehand.

use uuid::Uuid;

use crate::db::{
    identity::{Actor, DepartmentDirectory},
    projects::Project,
    subtasks::Subtask,
    tasks::Task,
    types::Role,
};

/// Admins see everything. Anyone else sees a project's tasks when one of them is
/// assigned to the actor or to someone in the actor's department.
pub fn can_view_tasks(actor: &Actor, project_tasks: &[Task], directory: &DepartmentDirectory) -> bool {
    if actor.is_admin() {
        return true;
    }
    project_tasks.iter().any(|task| {
        task.assignee_ids.iter().any(|&assignee| {
            assignee == actor.id
                || directory.shares_department(assignee, actor.department.as_deref())
        })
    })
}

fn manager_shares_department(
    actor: &Actor,
    assignee_ids: &[Uuid],
    directory: &DepartmentDirectory,
) -> bool {
    actor.has_role(Role::Manager)
        && assignee_ids
            .iter()
            .any(|&assignee| directory.shares_department(assignee, actor.department.as_deref()))
}

pub fn can_mutate_task(actor: &Actor, task: &Task, directory: &DepartmentDirectory) -> bool {
    actor.is_admin()
        || task.is_owner(actor.id)
        || task.is_assignee(actor.id)
        || manager_shares_department(actor, &task.assignee_ids, directory)
}

pub fn can_mutate_subtask(actor: &Actor, subtask: &Subtask, directory: &DepartmentDirectory) -> bool {
    actor.is_admin()
        || subtask.is_owner(actor.id)
        || subtask.is_assignee(actor.id)
        || manager_shares_department(actor, &subtask.assignee_ids, directory)
}

pub fn can_archive_task(actor: &Actor, task: &Task) -> bool {
    task.is_owner(actor.id) || task.is_assignee(actor.id) || actor.is_manager()
}

/// Unlike archiving, restoring is reserved to the people on the task.
pub fn can_unarchive_task(actor: &Actor, task: &Task) -> bool {
    task.is_owner(actor.id) || task.is_assignee(actor.id)
}

pub fn can_archive_subtask(actor: &Actor, subtask: &Subtask) -> bool {
    subtask.is_owner(actor.id) || subtask.is_assignee(actor.id) || actor.is_manager()
}

pub fn can_unarchive_subtask(actor: &Actor, subtask: &Subtask) -> bool {
    subtask.is_owner(actor.id) || subtask.is_assignee(actor.id)
}

pub fn can_manage_project(actor: &Actor, project: &Project) -> bool {
    project.is_owner(actor.id)
}

/// Dropping people from an assignee list is a manager privilege.
pub fn can_remove_assignees(actor: &Actor) -> bool {
    actor.is_manager()
}

pub fn can_add_assignee(actor: &Actor, task: &Task) -> bool {
    task.is_assignee(actor.id) || task.is_owner(actor.id) || actor.is_manager()
}

pub fn can_remove_assignee(actor: &Actor, task: &Task) -> bool {
    task.is_owner(actor.id) || actor.is_manager()
}

pub fn has_project_access(user_id: Uuid, project: &Project) -> bool {
    project.has_access(user_id)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::db::{
        identity::User,
        types::{Role, WorkStatus},
    };

    fn user(role: Role, department: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: format!("user-{}", Uuid::new_v4().simple()),
            email: None,
            first_name: None,
            last_name: None,
            role,
            department: Some(department.to_string()),
            created_at: Utc::now(),
        }
    }

    fn task(owner: Uuid, assignees: &[Uuid]) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "Quarterly report".to_string(),
            description: None,
            status: WorkStatus::ToDo,
            priority: 5,
            due_date: None,
            tags: Vec::new(),
            owner_id: owner,
            assignee_ids: assignees.to_vec(),
            is_recurring: false,
            recurrence_interval: None,
            time_taken: String::new(),
            archived: false,
            archived_at: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn admin_sees_projects_without_tasks() {
        let admin = Actor::from(&user(Role::Admin, "ops"));
        assert!(can_view_tasks(&admin, &[], &DepartmentDirectory::default()));
    }

    #[test]
    fn empty_project_is_hidden_from_staff() {
        let staff = Actor::from(&user(Role::Staff, "eng"));
        assert!(!can_view_tasks(&staff, &[], &DepartmentDirectory::default()));
    }

    #[test]
    fn other_department_assignee_does_not_grant_visibility() {
        let staff = user(Role::Staff, "eng");
        let seller = user(Role::Staff, "sales");
        let directory = DepartmentDirectory::from_users([&staff, &seller]);
        let tasks = [task(seller.id, &[seller.id])];

        assert!(!can_view_tasks(&Actor::from(&staff), &tasks, &directory));
    }

    #[test]
    fn same_department_assignee_grants_visibility() {
        let staff = user(Role::Staff, "eng");
        let colleague = user(Role::Staff, "eng");
        let directory = DepartmentDirectory::from_users([&staff, &colleague]);
        let tasks = [task(colleague.id, &[colleague.id])];

        assert!(can_view_tasks(&Actor::from(&staff), &tasks, &directory));
    }

    #[test]
    fn direct_assignment_grants_visibility_without_department() {
        let mut loner = user(Role::Staff, "eng");
        loner.department = None;
        let tasks = [task(Uuid::new_v4(), &[loner.id])];

        assert!(can_view_tasks(&Actor::from(&loner), &tasks, &DepartmentDirectory::default()));
    }

    #[test]
    fn manager_mutates_only_within_department() {
        let manager = user(Role::Manager, "eng");
        let engineer = user(Role::Staff, "eng");
        let seller = user(Role::Staff, "sales");
        let directory = DepartmentDirectory::from_users([&manager, &engineer, &seller]);
        let actor = Actor::from(&manager);

        assert!(can_mutate_task(&actor, &task(engineer.id, &[engineer.id]), &directory));
        assert!(!can_mutate_task(&actor, &task(seller.id, &[seller.id]), &directory));
    }

    #[test]
    fn staff_in_same_department_cannot_mutate() {
        let staff = user(Role::Staff, "eng");
        let engineer = user(Role::Staff, "eng");
        let directory = DepartmentDirectory::from_users([&staff, &engineer]);

        assert!(!can_mutate_task(
            &Actor::from(&staff),
            &task(engineer.id, &[engineer.id]),
            &directory
        ));
    }

    #[test]
    fn managers_archive_but_do_not_unarchive() {
        let manager = Actor::from(&user(Role::Manager, "eng"));
        let target = task(Uuid::new_v4(), &[Uuid::new_v4()]);

        assert!(can_archive_task(&manager, &target));
        assert!(!can_unarchive_task(&manager, &target));
    }

    #[test]
    fn assignee_management_is_asymmetric() {
        let assignee = user(Role::Staff, "eng");
        let owner = user(Role::Staff, "eng");
        let target = task(owner.id, &[owner.id, assignee.id]);
        let actor = Actor::from(&assignee);

        assert!(can_add_assignee(&actor, &target));
        assert!(!can_remove_assignee(&actor, &target));
        assert!(!can_remove_assignees(&actor));
        assert!(can_remove_assignee(&Actor::from(&owner), &target));
    }
}
