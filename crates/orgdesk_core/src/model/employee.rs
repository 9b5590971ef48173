//! Employee collaborator records.
//!
//! Employees reference departments but are not mutated by the
//! transactional core; they exist for the user listing surface.

use crate::model::department::DepartmentId;
use serde::{Deserialize, Serialize};

pub type EmployeeId = i64;

/// Closed access role stored as `ADMIN` / `USER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
        }
    }

    pub fn parse_db_str(value: &str) -> Option<Self> {
        match value {
            "ADMIN" => Some(Self::Admin),
            "USER" => Some(Self::User),
            _ => None,
        }
    }
}

/// Input for inserting an employee row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub login: String,
    pub email: String,
    pub phone: String,
    pub role: UserRole,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// Public projection of an employee. Never carries the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: EmployeeId,
    pub first_name: String,
    pub last_name: String,
    pub login: String,
    pub email: String,
    pub phone: String,
    pub role: UserRole,
    pub department_id: Option<DepartmentId>,
    /// Skill names, sorted ascending.
    pub skills: Vec<String>,
}
