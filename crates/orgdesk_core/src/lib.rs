//! Core of the orgdesk department backend.
//! Owns the department store, its transactional read/update rules and the
//! isolation demonstration operations.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod txn;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::department::{
    Department, DepartmentId, DepartmentPatch, DepartmentValidationError,
};
pub use model::employee::{NewUser, UserRecord, UserRole};
pub use repo::department_repo::{
    DepartmentRepository, RepoError, RepoResult, SqliteDepartmentRepository,
};
pub use repo::employee_repo::{EmployeeRepository, SqliteEmployeeRepository};
pub use service::concurrency_demo::{ConcurrencyDemo, DemoSettings};
pub use service::department_service::{DepartmentService, ServiceError, ServiceResult};
pub use txn::{IsolationLevel, Transaction, TxnError, TxnId, TxnManager, TxnResult, TxnStats};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
