//! End-to-end walkthroughs of the core governance rules.

mod common;

use std::{io::Write, sync::Arc};

use common::{Fixture, actor};
use governance::{
    ErrorKind, GovernanceError, GovernanceState, MemoryStore,
    api::{
        projects::CreateProjectRequest, subtasks::CreateSubtaskRequest, tasks::CreateTaskRequest,
    },
    db::{EntityStore, projects::ProjectQuery, types::Role},
    recurrence::RECURRENCE_INTERVAL_MESSAGE,
};

#[tokio::test]
async fn archiving_a_project_archives_its_tasks() {
    let fx = Fixture::new();
    let owner = fx.user("u1", Role::Staff, None).await;

    let project = fx
        .state
        .projects()
        .create(
            CreateProjectRequest {
                name: "P".to_string(),
                ..CreateProjectRequest::default()
            },
            &actor(&owner),
        )
        .await
        .unwrap();
    let task = fx
        .state
        .tasks()
        .create(
            CreateTaskRequest {
                project_id: project.id,
                title: "T".to_string(),
                ..CreateTaskRequest::default()
            },
            &actor(&owner),
        )
        .await
        .unwrap();
    fx.state
        .projects()
        .archive(project.id, &actor(&owner))
        .await
        .unwrap();

    let task = fx.reload_task(task.id).await;
    assert!(task.archived);
    assert!(task.archived_at.is_some());
}

#[tokio::test]
async fn other_department_assignment_hides_tasks() {
    let fx = Fixture::new();
    let staff = fx.user("sam", Role::Staff, Some("eng")).await;
    let seller = fx.user("sol", Role::Staff, Some("sales")).await;
    let project = fx.project(&seller, &[]).await;
    fx.task(&project, &seller, &[&seller]).await;

    let listing = fx
        .state
        .projects()
        .list_for_actor(&actor(&staff), &ProjectQuery::default())
        .await
        .unwrap();
    assert_eq!(listing.len(), 1);
    assert!(!listing[0].can_view_tasks);
}

#[tokio::test]
async fn only_managers_remove_other_assignees() {
    let fx = Fixture::new();
    let owner = fx.user("olivia", Role::Staff, Some("eng")).await;
    let a = fx.user("a", Role::Staff, Some("eng")).await;
    let b = fx.user("b", Role::Staff, Some("eng")).await;
    let manager = fx.user("mona", Role::Manager, Some("eng")).await;
    let project = fx.project(&owner, &[&a, &b]).await;
    let tasks = fx.state.tasks();

    let first = fx.task(&project, &owner, &[&a, &b]).await;
    let err = tasks
        .remove_assignee(first.id, b.id, &actor(&a))
        .await
        .unwrap_err();
    assert!(matches!(err, GovernanceError::Permission(_)));

    let removed = tasks
        .remove_assignee(first.id, b.id, &actor(&manager))
        .await
        .unwrap();
    assert_eq!(removed.assignee_ids, vec![a.id]);
}

#[tokio::test]
async fn recurring_subtask_without_interval_is_rejected() {
    let fx = Fixture::new();
    let owner = fx.user("olivia", Role::Staff, None).await;
    let project = fx.project(&owner, &[]).await;
    let task = fx.task(&project, &owner, &[&owner]).await;

    let err = fx
        .state
        .subtasks()
        .create(
            CreateSubtaskRequest {
                parent_task_id: task.id,
                title: "Rotate keys".to_string(),
                is_recurring: Some(true),
                due_date: Some(fx.clock_now()),
                ..CreateSubtaskRequest::default()
            },
            &actor(&owner),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().starts_with("Recurrence interval must be a positive number"));
    assert_eq!(err.to_string(), RECURRENCE_INTERVAL_MESSAGE);
}

#[tokio::test]
async fn time_summary_skips_archived_subtasks() {
    let fx = Fixture::new();
    let owner = fx.user("olivia", Role::Staff, None).await;
    let project = fx.project(&owner, &[]).await;
    let mut task = fx.task(&project, &owner, &[&owner]).await;

    let empty = fx.state.tasks().time_summary(task.id).await.unwrap();
    assert_eq!(empty.total, "Not specified");
    assert_eq!(empty.total_minutes, 0);

    task.time_taken = "1 hour".to_string();
    task.id = uuid::Uuid::new_v4();
    let task = fx.store.insert_task(task).await.unwrap();
    fx.subtask(&task, "45 minutes", false).await;
    fx.subtask(&task, "30 minutes", false).await;
    fx.subtask(&task, "3 hours", true).await;

    let summary = fx.state.tasks().time_summary(task.id).await.unwrap();
    assert_eq!(summary.task_minutes, 60);
    assert_eq!(summary.subtask_minutes, 75);
    assert_eq!(summary.total_minutes, 135);
    assert_eq!(summary.total, "2 hours 15 minutes");
}

#[tokio::test]
async fn snapshot_file_round_trips_through_the_store() {
    let fx = Fixture::new();
    let owner = fx.user("olivia", Role::Staff, Some("eng")).await;
    let project = fx.project(&owner, &[]).await;
    let task = fx.task(&project, &owner, &[&owner]).await;
    fx.subtask(&task, "15 minutes", false).await;

    let snapshot = fx.store.snapshot().await;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string(&snapshot).unwrap().as_bytes())
        .unwrap();

    let store = MemoryStore::load_snapshot(file.path()).await.unwrap();
    let state = GovernanceState::new(Arc::new(store), fx.clock.clone(), fx.sink.clone());

    let listing = state
        .projects()
        .list_for_actor(&actor(&owner), &ProjectQuery::default())
        .await
        .unwrap();
    assert_eq!(listing.len(), 1);
    assert!(listing[0].can_view_tasks);

    let summary = state.tasks().time_summary(task.id).await.unwrap();
    assert_eq!(summary.total, "15 minutes");
}
