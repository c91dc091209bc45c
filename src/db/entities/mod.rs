//! SeaORM entities for the host inventory.
//!
//! `host` is the only table written by this crate; `set` and `module` are
//! maintained by the provisioning workflow and only read here.

pub mod host;
pub mod module;
pub mod set;

