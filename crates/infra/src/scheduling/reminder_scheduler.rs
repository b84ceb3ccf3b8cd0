//! Reminder scheduler for periodic dispatch ticks.
//!
//! Interval-based loop with lifecycle management around
//! [`ReminderService::run_tick`]. Every tick materializes reminder rows for
//! meetings entering the lookahead window and then dispatches everything
//! due. A failed tick is logged and counted; the loop itself keeps
//! running until stopped.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use cohort_infra::observability::metrics::DispatchMetrics;
//! use cohort_infra::scheduling::{ReminderScheduler, ReminderSchedulerConfig};
//!
//! # async fn example(service: Arc<cohort_core::ReminderService>) -> Result<(), String> {
//! let metrics = Arc::new(DispatchMetrics::new());
//! let mut scheduler = ReminderScheduler::new(
//!     service,
//!     ReminderSchedulerConfig { interval: Duration::from_secs(60), ..Default::default() },
//!     metrics,
//! );
//!
//! scheduler.start().await.map_err(|e| e.to_string())?;
//! // ... application runs ...
//! scheduler.stop().await.map_err(|e| e.to_string())?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use cohort_core::ReminderService;
use cohort_domain::constants::{DEFAULT_TICK_INTERVAL_SECS, SCHEDULER_JOIN_TIMEOUT_SECS};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::observability::metrics::DispatchMetrics;
use crate::observability::MetricsResult;
use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for the reminder scheduler
#[derive(Debug, Clone)]
pub struct ReminderSchedulerConfig {
    /// Tick interval
    pub interval: Duration,
    /// Timeout for one whole tick (materialize + dispatch)
    pub tick_timeout: Duration,
}

impl Default for ReminderSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_TICK_INTERVAL_SECS), // 1 minute
            tick_timeout: Duration::from_secs(300),                    // 5 minutes
        }
    }
}

/// Reminder scheduler driving the periodic dispatch loop
pub struct ReminderScheduler {
    service: Arc<ReminderService>,
    config: ReminderSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
    metrics: Arc<DispatchMetrics>,
}

impl ReminderScheduler {
    /// Create a new reminder scheduler
    pub fn new(
        service: Arc<ReminderService>,
        config: ReminderSchedulerConfig,
        metrics: Arc<DispatchMetrics>,
    ) -> Self {
        Self {
            service,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
            metrics,
        }
    }

    /// Start the scheduler
    ///
    /// Spawns a background task that runs the dispatch tick periodically.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is already running
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!("Starting reminder scheduler");

        // Create a new cancellation token (supports restart after stop)
        self.cancellation_token = CancellationToken::new();

        let service = Arc::clone(&self.service);
        let metrics = Arc::clone(&self.metrics);
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::dispatch_loop(service, metrics, config, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);

        info!(interval_secs = self.config.interval.as_secs(), "Reminder scheduler started");

        Ok(())
    }

    /// Stop the scheduler gracefully
    ///
    /// Cancels the background task and awaits completion.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is not running
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        info!("Stopping reminder scheduler");

        // Cancel background task
        self.cancellation_token.cancel();

        // Await handle with timeout
        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = Duration::from_secs(SCHEDULER_JOIN_TIMEOUT_SECS);
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|source| SchedulerError::Timeout { duration: join_timeout, source })??;
        }

        info!("Reminder scheduler stopped");

        Ok(())
    }

    /// Check if scheduler is running
    ///
    /// A scheduler is considered running if it has an active task handle that
    /// hasn't finished.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Background dispatch loop
    async fn dispatch_loop(
        service: Arc<ReminderService>,
        metrics: Arc<DispatchMetrics>,
        config: ReminderSchedulerConfig,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Dispatch loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(config.interval) => {
                    log_metric(metrics.record_tick(), "scheduler.reminder.tick");
                    let started = Instant::now();

                    match tokio::time::timeout(config.tick_timeout, service.run_tick(Utc::now())).await {
                        Ok(Ok(report)) => {
                            if report.changed() {
                                info!(
                                    materialized = report.materialized,
                                    dispatched = report.dispatched,
                                    emails_sent = report.emails_sent,
                                    emails_failed = report.emails_failed,
                                    skipped = report.skipped_no_address,
                                    "Dispatch tick completed"
                                );
                            } else {
                                debug!("Dispatch tick found nothing to do");
                            }
                            log_metric(metrics.record_report(&report), "scheduler.reminder.report");
                        }
                        Ok(Err(e)) => {
                            error!(error = %e, "Dispatch tick failed");
                            log_metric(metrics.record_tick_failure(), "scheduler.reminder.tick.error");
                        }
                        Err(elapsed) => {
                            warn!(
                                timeout_secs = config.tick_timeout.as_secs(),
                                "Dispatch tick timed out"
                            );
                            debug!(elapsed = ?elapsed, "Tick timeout detail");
                            log_metric(metrics.record_tick_failure(), "scheduler.reminder.tick.timeout");
                        }
                    }

                    log_metric(metrics.record_tick_time(started.elapsed()), "scheduler.reminder.duration");
                }
            }
        }
    }
}

fn log_metric(result: MetricsResult<()>, metric: &'static str) {
    if let Err(err) = result {
        warn!(metric = metric, error = ?err, "Failed to record scheduler metric");
    }
}

/// Ensure scheduler is stopped when dropped
impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        // Note: Can't check task_handle (async), so check if token is not cancelled
        // This is best-effort cleanup in Drop
        if !self.cancellation_token.is_cancelled() {
            warn!("ReminderScheduler dropped while running; cancelling");
            self.cancellation_token.cancel();
        }
    }
}
