use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// Workflow status shared by projects, tasks and subtasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkStatus {
    #[default]
    #[serde(rename = "To Do")]
    ToDo,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Blocked")]
    Blocked,
}

impl WorkStatus {
    pub const ALL: [WorkStatus; 4] = [
        WorkStatus::ToDo,
        WorkStatus::InProgress,
        WorkStatus::Completed,
        WorkStatus::Blocked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkStatus::ToDo => "To Do",
            WorkStatus::InProgress => "In Progress",
            WorkStatus::Completed => "Completed",
            WorkStatus::Blocked => "Blocked",
        }
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkStatus {
    type Err = GovernanceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        WorkStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value.trim())
            .ok_or_else(|| {
                GovernanceError::Validation(format!(
                    "Invalid status '{value}'. Must be one of: To Do, In Progress, Completed, Blocked"
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Staff => "staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
