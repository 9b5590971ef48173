//! Request surface for the orgdesk department backend.
//!
//! `Api` exposes one status-coded function per endpoint and a
//! `dispatch` entry point that routes `METHOD /path` pairs onto them.

pub mod api;
mod routes;

pub use api::{Api, ApiResponse, CreateDepartmentBody, DoubleUpdateBody};
