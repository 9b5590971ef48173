//! Transaction Manager: units of work, row locks and write visibility.
//!
//! # Responsibility
//! - Demarcate units of work with begin/commit/rollback.
//! - Grant exclusive per-row locks ("select for update") with a bounded wait.
//! - Keep in-flight writes out of committed state until commit, with an
//!   explicit flush step that exposes them to the owner and to
//!   read-uncommitted readers only.
//!
//! # Invariants
//! - Only the lock holder of a row may buffer writes for it.
//! - A transaction that ends without commit (error, drop, panic unwind)
//!   rolls back and releases every lock it holds.
//! - Committed state lives only in the SQLite store; flushed images live in
//!   an in-memory overlay owned by exactly one transaction per row.
//! - There is no deadlock detection; `lock_timeout` bounds every wait.

use crate::model::department::{DepartmentId, DepartmentValidationError};
use crate::repo::department_repo::RepoError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

mod lock;
mod manager;
mod transaction;

pub use manager::{TxnManager, TxnStats};
pub use transaction::Transaction;

/// Process-unique, monotonically increasing transaction id.
pub type TxnId = u64;

pub type TxnResult<T> = Result<T, TxnError>;

/// Visibility rule for unlocked reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    /// Committed values plus the reader's own flushed writes.
    ReadCommitted,
    /// Also observes other transactions' flushed-but-uncommitted writes.
    ReadUncommitted,
}

impl IsolationLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadCommitted => "read_committed",
            Self::ReadUncommitted => "read_uncommitted",
        }
    }
}

impl FromStr for IsolationLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "read_committed" => Ok(Self::ReadCommitted),
            "read_uncommitted" => Ok(Self::ReadUncommitted),
            other => Err(format!(
                "unsupported isolation level `{other}`; expected read_committed|read_uncommitted"
            )),
        }
    }
}

/// Failure raised inside a unit of work.
#[derive(Debug)]
pub enum TxnError {
    /// Target row absent at read/lock/write time.
    RowNotFound(DepartmentId),
    /// Row lock still held by `holder` after waiting `waited_ms`.
    LockTimeout {
        id: DepartmentId,
        holder: TxnId,
        waited_ms: u128,
    },
    Validation(DepartmentValidationError),
    Repo(RepoError),
}

impl Display for TxnError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RowNotFound(id) => write!(f, "department not found: {id}"),
            Self::LockTimeout {
                id,
                holder,
                waited_ms,
            } => write!(
                f,
                "timed out after {waited_ms} ms waiting for row lock on department {id} held by txn {holder}"
            ),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TxnError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::RowNotFound(_) | Self::LockTimeout { .. } => None,
        }
    }
}

impl From<RepoError> for TxnError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::RowNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for TxnError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

impl From<DepartmentValidationError> for TxnError {
    fn from(value: DepartmentValidationError) -> Self {
        Self::Validation(value)
    }
}
