//! Record Store: SQLite-backed repositories.
//!
//! # Responsibility
//! - Point lookup, full scan, insert, update and delete of committed rows.
//! - Keep SQL text inside the persistence boundary.
//!
//! # Invariants
//! - Repositories see committed state only; buffering and visibility of
//!   in-flight writes belong to `crate::txn`.
//! - Missing rows on update/delete surface as `RepoError::NotFound`.

pub mod department_repo;
pub mod employee_repo;
