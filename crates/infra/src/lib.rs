//! # Cohort Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - Database implementations (SQLite repositories)
//! - Email relay client
//! - Background schedulers (dispatch loop, purge sweep)
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `cohort-core`
//! - Depends on `cohort-domain` and `cohort-core`
//! - Contains all "impure" code (I/O, clocks, network)

pub mod config;
pub mod database;
pub mod email;
pub mod errors;
pub mod observability;
pub mod scheduling;

// Re-export commonly used items
pub use database::*;
pub use email::*;
pub use errors::InfraError;
pub use scheduling::*;
