//! Cron-driven purge scheduler for expired login codes.
//!
//! Provides a cron-based scheduler that triggers a user-supplied job at fixed
//! intervals. Join handles are tracked, cancellation is explicit, and every
//! asynchronous operation is wrapped in a timeout.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use async_trait::async_trait;
//! use cohort_infra::observability::metrics::DispatchMetrics;
//! use cohort_infra::scheduling::{
//!     PurgeJob, PurgeScheduler, PurgeSchedulerConfig, SchedulerResult,
//! };
//!
//! struct NoopJob;
//!
//! #[async_trait]
//! impl PurgeJob for NoopJob {
//!     async fn run(&self) -> Result<u64, cohort_infra::errors::InfraError> {
//!         Ok(0)
//!     }
//! }
//!
//! # async fn example() -> SchedulerResult<()> {
//! let metrics = Arc::new(DispatchMetrics::new());
//! let job = Arc::new(NoopJob);
//! let mut scheduler = PurgeScheduler::with_config(
//!     PurgeSchedulerConfig {
//!         cron_expression: "0 */30 * * * *".into(), // every 30 minutes
//!         ..Default::default()
//!     },
//!     job,
//!     metrics,
//! )
//! .await?;
//!
//! scheduler.start().await?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use cohort_core::OtpStore;
use cohort_domain::constants::DEFAULT_PURGE_CRON;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::errors::InfraError;
use crate::observability::metrics::DispatchMetrics;
use crate::observability::MetricsResult;
use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Trait representing a purge sweep.
///
/// Returns the number of rows removed.
#[async_trait]
pub trait PurgeJob: Send + Sync {
    /// Execute the sweep.
    async fn run(&self) -> Result<u64, InfraError>;
}

/// Purge job that deletes expired login codes from the store.
pub struct OtpPurgeJob {
    store: Arc<dyn OtpStore>,
}

impl OtpPurgeJob {
    /// Create a purge job over the given store.
    pub fn new(store: Arc<dyn OtpStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PurgeJob for OtpPurgeJob {
    async fn run(&self) -> Result<u64, InfraError> {
        self.store.purge_expired(Utc::now()).await.map_err(InfraError::from)
    }
}

/// Configuration for the purge scheduler.
#[derive(Debug, Clone)]
pub struct PurgeSchedulerConfig {
    /// Cron expression describing the execution schedule.
    pub cron_expression: String,
    /// Timeout applied to a single sweep.
    pub job_timeout: Duration,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl Default for PurgeSchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: DEFAULT_PURGE_CRON.into(), // hourly, on the hour
            job_timeout: Duration::from_secs(30),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Purge scheduler with explicit lifecycle management.
pub struct PurgeScheduler {
    scheduler: Arc<RwLock<JobScheduler>>,
    config: PurgeSchedulerConfig,
    job_id: Uuid,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    metrics: Arc<DispatchMetrics>,
    job: Arc<dyn PurgeJob>,
}

impl PurgeScheduler {
    /// Create a scheduler with the default configuration.
    pub async fn new(
        cron_expression: String,
        job: Arc<dyn PurgeJob>,
        metrics: Arc<DispatchMetrics>,
    ) -> SchedulerResult<Self> {
        let config = PurgeSchedulerConfig { cron_expression, ..Default::default() };
        Self::with_config(config, job, metrics).await
    }

    /// Create a scheduler with a custom configuration.
    pub async fn with_config(
        config: PurgeSchedulerConfig,
        job: Arc<dyn PurgeJob>,
        metrics: Arc<DispatchMetrics>,
    ) -> SchedulerResult<Self> {
        let raw_scheduler = JobScheduler::new()
            .await
            .map_err(|source| SchedulerError::CreationFailed { source })?;

        let mut scheduler = Self {
            scheduler: Arc::new(RwLock::new(raw_scheduler)),
            config,
            job_id: Uuid::nil(),
            monitor_handle: None,
            cancellation: CancellationToken::new(),
            metrics,
            job,
        };

        scheduler.job_id = scheduler.register_purge_job().await?;
        Ok(scheduler)
    }

    /// Start the scheduler, spawning the monitoring task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler = self.scheduler.clone();
        let start_timeout = self.config.start_timeout;
        let start_result = tokio::time::timeout(start_timeout, async move {
            let guard = scheduler.write().await;
            guard.start().await
        })
        .await
        .map_err(|source| SchedulerError::Timeout { duration: start_timeout, source })?;

        start_result.map_err(|source| SchedulerError::StartFailed { source })?;

        let cancel = self.cancellation.clone();
        let handle = tokio::spawn(async move {
            Self::monitor_task(cancel).await;
        });

        self.monitor_handle = Some(handle);
        info!(cron = %self.config.cron_expression, "Purge scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for the monitor task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        let scheduler = self.scheduler.clone();
        let stop_timeout = self.config.stop_timeout;
        let stop_result = tokio::time::timeout(stop_timeout, async move {
            let mut guard = scheduler.write().await;
            guard.shutdown().await
        })
        .await
        .map_err(|source| SchedulerError::Timeout { duration: stop_timeout, source })?;

        stop_result.map_err(|source| SchedulerError::StopFailed { source })?;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|source| SchedulerError::Timeout { duration: join_timeout, source })??
        }

        info!("Purge scheduler stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    /// Returns true when the monitor task is active.
    pub fn is_running(&self) -> bool {
        self.monitor_handle.as_ref().map_or(false, |handle| !handle.is_finished())
    }

    async fn register_purge_job(&mut self) -> SchedulerResult<Uuid> {
        if self.job_id != Uuid::nil() {
            return Ok(self.job_id);
        }

        let cron_expr = self.config.cron_expression.clone();
        let metrics = self.metrics.clone();
        let job = self.job.clone();
        let job_timeout = self.config.job_timeout;

        let job_definition = Job::new_async(cron_expr.as_str(), move |_id, _lock| {
            let metrics = metrics.clone();
            let job = job.clone();

            Box::pin(async move {
                match tokio::time::timeout(job_timeout, job.run()).await {
                    Ok(Ok(removed)) => {
                        log_metric(metrics.record_purged(removed), "scheduler.purge.removed");
                        if removed > 0 {
                            info!(removed, "Expired login codes purged");
                        } else {
                            debug!("No expired login codes to purge");
                        }
                    }
                    Ok(Err(err)) => {
                        log_metric(metrics.record_purge_failure(), "scheduler.purge.error");
                        error!(error = ?err, "Login code purge failed");
                    }
                    Err(elapsed) => {
                        log_metric(metrics.record_purge_failure(), "scheduler.purge.timeout");
                        warn!(timeout_secs = job_timeout.as_secs(), "Login code purge timed out");
                        debug!(elapsed = ?elapsed, "Timeout details");
                    }
                }
            })
        })
        .map_err(|source| SchedulerError::JobRegistrationFailed { source })?;

        let job_id = job_definition.guid();
        let scheduler = self.scheduler.write().await;
        scheduler
            .add(job_definition)
            .await
            .map_err(|source| SchedulerError::JobRegistrationFailed { source })?;

        debug!(cron = %self.config.cron_expression, job_id = %job_id, "Registered purge job");
        Ok(job_id)
    }

    async fn monitor_task(cancel: CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Purge scheduler monitor cancelled");
            }
        }
    }
}

fn log_metric(result: MetricsResult<()>, metric: &'static str) {
    if let Err(err) = result {
        warn!(metric = metric, error = ?err, "Failed to record scheduler metric");
    }
}

impl Drop for PurgeScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("PurgeScheduler dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}
