//! Department use-case service.
//!
//! # Responsibility
//! - Provide create/get/update/list/delete entry points, each as one unit of work.
//! - Offer both an unlocked and a locked read-modify-write update.
//!
//! # Invariants
//! - `update_department` reads without a lock; two overlapping calls can
//!   both read the same value and the later commit wins (lost update).
//! - `update_department_locked` reads under the row lock; overlapping calls
//!   serialize and each sees the previous caller's committed value.
//! - `NotFound` is returned as its own variant so callers can recover.

use crate::model::department::{
    Department, DepartmentId, DepartmentPatch, DepartmentValidationError,
};
use crate::model::employee::{NewUser, UserRecord};
use crate::repo::department_repo::RepoError;
use crate::repo::employee_repo::{EmployeeRepository, SqliteEmployeeRepository};
use crate::txn::{IsolationLevel, TxnError, TxnManager};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    NotFound(DepartmentId),
    Validation(DepartmentValidationError),
    /// Any other failure; the unit of work was rolled back.
    Txn(TxnError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "department not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Txn(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Validation(err) => Some(err),
            Self::Txn(err) => Some(err),
        }
    }
}

impl From<TxnError> for ServiceError {
    fn from(value: TxnError) -> Self {
        match value {
            TxnError::RowNotFound(id) => Self::NotFound(id),
            TxnError::Validation(err) => Self::Validation(err),
            other => Self::Txn(other),
        }
    }
}

impl From<DepartmentValidationError> for ServiceError {
    fn from(value: DepartmentValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::from(TxnError::from(value))
    }
}

/// Request-scoped department operations. Cheap to clone.
#[derive(Clone)]
pub struct DepartmentService {
    manager: TxnManager,
}

impl DepartmentService {
    pub fn new(manager: TxnManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &TxnManager {
        &self.manager
    }

    /// Inserts a department and returns the stored record.
    pub fn create_department(&self, department_name: &str) -> ServiceResult<Department> {
        Ok(self.manager.insert(department_name)?)
    }

    /// Current committed value of `id`.
    pub fn get_department(&self, id: DepartmentId) -> ServiceResult<Department> {
        self.manager
            .run(|tx| tx.read(id, IsolationLevel::ReadCommitted).map_err(ServiceError::from))
    }

    /// Unlocked read-modify-write. Not isolated from concurrent callers.
    pub fn update_department(
        &self,
        id: DepartmentId,
        patch: &DepartmentPatch,
    ) -> ServiceResult<Department> {
        patch.validate()?;
        self.manager.run(|tx| -> ServiceResult<Department> {
            let current = tx.read(id, IsolationLevel::ReadCommitted)?;
            let next = current.apply(patch)?;
            tx.update(&next)?;
            Ok(next)
        })
    }

    /// Read-modify-write under the row lock; concurrent callers serialize.
    pub fn update_department_locked(
        &self,
        id: DepartmentId,
        patch: &DepartmentPatch,
    ) -> ServiceResult<Department> {
        patch.validate()?;
        self.manager.run(|tx| -> ServiceResult<Department> {
            let current = tx.lock_for_update(id)?;
            let next = current.apply(patch)?;
            tx.update(&next)?;
            Ok(next)
        })
    }

    pub fn list_departments(&self) -> ServiceResult<Vec<Department>> {
        Ok(self.manager.list_committed()?)
    }

    /// Physically removes the row under its lock.
    pub fn delete_department(&self, id: DepartmentId) -> ServiceResult<()> {
        self.manager.run(|tx| -> ServiceResult<()> {
            tx.lock_for_update(id)?;
            tx.delete(id)?;
            Ok(())
        })
    }

    /// Employee listing for the user surface; password is never included.
    pub fn list_users(&self) -> ServiceResult<Vec<UserRecord>> {
        Ok(self
            .manager
            .with_store(|conn| SqliteEmployeeRepository::new(conn).list_users())?)
    }

    pub fn create_user(&self, user: &NewUser) -> ServiceResult<UserRecord> {
        Ok(self
            .manager
            .with_store(|conn| SqliteEmployeeRepository::new(conn).create_user(user))?)
    }
}
