//! Scheduling infrastructure for automated task execution
//!
//! This module provides the two background schedulers of the dispatcher:
//! - Reminder scheduling (interval-based dispatch ticks)
//! - Purge scheduling (cron-based sweep of expired login codes)
//!
//! All schedulers follow the same runtime rules:
//! - Explicit lifecycle management (start/stop)
//! - Join handles for spawned tasks
//! - Cancellation token support
//! - Timeout wrapping on all async operations
//! - Structured tracing with DispatchMetrics integration

pub mod error;
pub mod purge_scheduler;
pub mod reminder_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use purge_scheduler::{
    OtpPurgeJob, PurgeJob, PurgeScheduler, PurgeSchedulerConfig,
};
pub use reminder_scheduler::{ReminderScheduler, ReminderSchedulerConfig};
