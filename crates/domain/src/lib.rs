//! # Cohort Domain
//!
//! Business domain types and models for Cohort.
//!
//! This crate contains:
//! - Domain data types (Meeting, Batch, Notification, OtpEntry)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants and time formatting
//!
//! ## Architecture
//! - No dependencies on other Cohort crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod time;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use time::format_local;
pub use types::*;
