use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Display projection of a user, attached to populated read models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl From<&User> for UserData {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: Some(user.username.clone()),
        }
    }
}

/// The authenticated principal a request is evaluated for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub roles: BTreeSet<Role>,
    pub department: Option<String>,
}

impl Actor {
    pub fn new(id: Uuid, roles: impl IntoIterator<Item = Role>, department: Option<&str>) -> Self {
        Self {
            id,
            roles: roles.into_iter().collect(),
            department: department.map(str::to_string),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Managers and admins share the elevated assignee-management rights.
    pub fn is_manager(&self) -> bool {
        self.has_role(Role::Manager) || self.is_admin()
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            roles: BTreeSet::from([user.role]),
            department: user.department.clone(),
        }
    }
}

/// User id to department lookup, loaded by callers before authorization checks.
#[derive(Debug, Clone, Default)]
pub struct DepartmentDirectory {
    departments: HashMap<Uuid, String>,
}

impl DepartmentDirectory {
    pub fn from_users<'a>(users: impl IntoIterator<Item = &'a User>) -> Self {
        let departments = users
            .into_iter()
            .filter_map(|user| {
                user.department
                    .as_ref()
                    .map(|department| (user.id, department.clone()))
            })
            .collect();
        Self { departments }
    }

    pub fn department_of(&self, user_id: Uuid) -> Option<&str> {
        self.departments.get(&user_id).map(String::as_str)
    }

    pub fn shares_department(&self, user_id: Uuid, department: Option<&str>) -> bool {
        match (self.department_of(user_id), department) {
            (Some(theirs), Some(ours)) => theirs == ours,
            _ => false,
        }
    }
}
