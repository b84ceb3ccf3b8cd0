//! Scheduler error types

use std::time::Duration;

use cohort_domain::CohortError;
use thiserror::Error;
use tokio::task::JoinError;
use tokio::time::error::Elapsed;
use tokio_cron_scheduler::JobSchedulerError;

use crate::errors::InfraError;

/// Errors surfaced by the background schedulers.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Scheduler is already running
    #[error("scheduler is already running")]
    AlreadyRunning,

    /// Scheduler is not running
    #[error("scheduler is not running")]
    NotRunning,

    /// Underlying cron scheduler could not be created
    #[error("failed to create scheduler: {source}")]
    CreationFailed { source: JobSchedulerError },

    /// Underlying cron scheduler refused to start
    #[error("failed to start scheduler: {source}")]
    StartFailed { source: JobSchedulerError },

    /// Underlying cron scheduler refused to stop
    #[error("failed to stop scheduler: {source}")]
    StopFailed { source: JobSchedulerError },

    /// Job could not be registered with the cron scheduler
    #[error("failed to register job: {source}")]
    JobRegistrationFailed { source: JobSchedulerError },

    /// An operation exceeded its deadline
    #[error("scheduler operation timed out after {duration:?}")]
    Timeout { duration: Duration, source: Elapsed },

    /// Background task panicked or was aborted
    #[error("scheduler task join failed: {source}")]
    JoinFailed {
        #[from]
        source: JoinError,
    },
}

/// Result type for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let domain_err = match &err {
            SchedulerError::AlreadyRunning | SchedulerError::NotRunning => {
                CohortError::InvalidInput(err.to_string())
            }
            _ => CohortError::Internal(err.to_string()),
        };
        InfraError(domain_err)
    }
}

impl From<SchedulerError> for CohortError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}
