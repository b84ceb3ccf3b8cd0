//! # Cohort Server
//!
//! Headless daemon wiring the Cohort services together: SQLite persistence,
//! the HTTP email relay, and the background schedulers.
//!
//! ## Architecture
//! - [`AppContext`] owns configuration, the database, and the services
//! - Schedulers are created from the context and owned by the entry point
//! - Shutdown goes through explicit `stop()` calls, with `Drop` as backstop

pub mod context;

pub use context::AppContext;
