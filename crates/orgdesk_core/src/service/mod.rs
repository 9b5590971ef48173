//! Use-case services over the transaction manager.
//!
//! # Responsibility
//! - Turn single requests into units of work with commit-on-success.
//! - Compose deliberate isolation anomalies for external observation.
//!
//! # Invariants
//! - Services never touch SQL directly; all row access goes through `crate::txn`.
//! - No retries: each call runs its unit of work exactly once.

pub mod concurrency_demo;
pub mod department_service;
