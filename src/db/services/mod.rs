//! Data access for hosts and their groupings.
//!
//! Each sub-module owns one concern: the host table itself, free-pool lookup,
//! and moving hosts between applications. Callers share one
//! `Arc<DatabaseConnection>` across all of them.

pub mod group_service;
pub mod host_service;
pub mod reassignment_service;

pub use group_service::*;
pub use host_service::*;
pub use reassignment_service::*;
