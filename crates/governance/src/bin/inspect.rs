//! governance-inspect - print what a user can see in a tracker snapshot
//!
//! Loads a JSON snapshot into the in-memory store and prints the user's
//! project listing, with tasks and time totals for every project they may view.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use governance::{
    GovernanceConfig, GovernanceState, MemoryStore,
    api::{projects::ProjectListing, tasks::TimeSummary},
    db::{identity::Actor, projects::ProjectQuery, tasks::Task},
};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "governance-inspect")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a JSON snapshot with users, projects, tasks and subtasks
    #[arg(long)]
    snapshot: PathBuf,

    /// User id or username to evaluate visibility for
    #[arg(long)]
    actor: String,

    /// Include archived projects in the listing
    #[arg(long)]
    include_archived: bool,
}

#[derive(Debug, Serialize)]
struct ProjectReport {
    #[serde(flatten)]
    listing: ProjectListing,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tasks: Vec<TaskReport>,
}

#[derive(Debug, Serialize)]
struct TaskReport {
    #[serde(flatten)]
    task: Task,
    time: TimeSummary,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = GovernanceConfig::from_env().context("invalid governance configuration")?;

    let filter =
        EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let store = MemoryStore::load_snapshot(&cli.snapshot)
        .await
        .with_context(|| format!("failed to load snapshot {}", cli.snapshot.display()))?;
    let state = GovernanceState::from_config(Arc::new(store), &config);

    let user = match uuid::Uuid::parse_str(&cli.actor) {
        Ok(id) => state.store().find_user(id).await?,
        Err(_) => state.store().find_user_by_username(&cli.actor).await?,
    }
    .with_context(|| format!("user {} not found in snapshot", cli.actor))?;
    let actor = Actor::from(&user);

    let query = ProjectQuery {
        include_archived: cli.include_archived,
        accessible_to: None,
    };
    let listings = state
        .projects()
        .list_for_actor(&actor, &query)
        .await
        .context("failed to list projects")?;

    let mut reports = Vec::with_capacity(listings.len());
    for listing in listings {
        let mut tasks = Vec::new();
        if listing.can_view_tasks {
            for task in state
                .tasks()
                .list_for_project(listing.project.id, &actor)
                .await
                .context("failed to list project tasks")?
            {
                let time = state.tasks().time_summary(task.id).await?;
                tasks.push(TaskReport { task, time });
            }
        }
        reports.push(ProjectReport { listing, tasks });
    }

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}
