use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::projects::Project;

/// `status` and `priority` arrive raw so that out-of-range values surface as
/// validation errors instead of deserialization failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    pub member_ids: Option<Vec<Uuid>>,
    pub status: Option<String>,
    pub priority: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub member_ids: Option<Vec<Uuid>>,
    pub status: Option<String>,
    pub priority: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
    pub archived: Option<bool>,
    pub version: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectListing {
    #[serde(flatten)]
    pub project: Project,
    pub can_view_tasks: bool,
}
