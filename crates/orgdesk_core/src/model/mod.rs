//! Domain records for the department store.
//!
//! # Responsibility
//! - Define the plain value records passed between store, transactions and services.
//!
//! # Invariants
//! - Records carry no change tracking; updates build new values.
//! - Department deletion is physical, there is no tombstone flag.

pub mod department;
pub mod employee;
