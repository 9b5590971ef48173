//! Department record and field patches.
//!
//! # Invariants
//! - `id` is assigned by the store and never reused or changed.
//! - `department_name` is non-blank and at most `MAX_DEPARTMENT_NAME_CHARS` chars.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned identity of a department row.
pub type DepartmentId = i64;

pub const MAX_DEPARTMENT_NAME_CHARS: usize = 255;

/// Committed or in-flight image of one `departments` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub department_name: String,
}

/// Partial update for a department. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentPatch {
    #[serde(default)]
    pub department_name: Option<String>,
}

/// Rejected department field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepartmentValidationError {
    BlankName,
    NameTooLong { chars: usize },
}

impl Display for DepartmentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "department_name must not be blank"),
            Self::NameTooLong { chars } => write!(
                f,
                "department_name has {chars} characters, maximum is {MAX_DEPARTMENT_NAME_CHARS}"
            ),
        }
    }
}

impl Error for DepartmentValidationError {}

impl Department {
    /// Returns a new value with every `Some` field of `patch` applied.
    ///
    /// The patch is validated first; `self` is never modified.
    pub fn apply(&self, patch: &DepartmentPatch) -> Result<Self, DepartmentValidationError> {
        patch.validate()?;
        let mut next = self.clone();
        if let Some(name) = &patch.department_name {
            next.department_name = name.clone();
        }
        Ok(next)
    }
}

impl DepartmentPatch {
    pub fn rename(department_name: impl Into<String>) -> Self {
        Self {
            department_name: Some(department_name.into()),
        }
    }

    pub fn validate(&self) -> Result<(), DepartmentValidationError> {
        match &self.department_name {
            Some(name) => validate_department_name(name),
            None => Ok(()),
        }
    }
}

/// Checks a candidate `department_name` before it reaches the store.
pub fn validate_department_name(name: &str) -> Result<(), DepartmentValidationError> {
    if name.trim().is_empty() {
        return Err(DepartmentValidationError::BlankName);
    }
    let chars = name.chars().count();
    if chars > MAX_DEPARTMENT_NAME_CHARS {
        return Err(DepartmentValidationError::NameTooLong { chars });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_department_name, Department, DepartmentPatch, DepartmentValidationError};

    fn engineering() -> Department {
        Department {
            id: 7,
            department_name: "Engineering".to_string(),
        }
    }

    #[test]
    fn apply_replaces_name_and_keeps_identity() {
        let original = engineering();
        let renamed = original.apply(&DepartmentPatch::rename("Platform")).unwrap();

        assert_eq!(renamed.id, 7);
        assert_eq!(renamed.department_name, "Platform");
        assert_eq!(original.department_name, "Engineering");
    }

    #[test]
    fn empty_patch_is_identity() {
        let original = engineering();
        assert_eq!(original.apply(&DepartmentPatch::default()).unwrap(), original);
    }

    #[test]
    fn blank_and_oversized_names_are_rejected() {
        assert_eq!(
            validate_department_name("   "),
            Err(DepartmentValidationError::BlankName)
        );
        let long = "x".repeat(256);
        assert_eq!(
            validate_department_name(&long),
            Err(DepartmentValidationError::NameTooLong { chars: 256 })
        );
        assert!(engineering().apply(&DepartmentPatch::rename("")).is_err());
    }

    #[test]
    fn patch_deserializes_with_missing_field() {
        let patch: DepartmentPatch = serde_json::from_str("{}").unwrap();
        assert_eq!(patch.department_name, None);
    }
}
