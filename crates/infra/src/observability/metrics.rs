//! Counters for the reminder dispatch loop and the OTP purge job
//!
//! ## Design
//! - **VecDeque ring buffer** for O(1) eviction of tick duration samples
//! - **Poison-safe locking** with explicit match pattern (no .expect())
//! - **MetricsResult returns** for future extensibility (currently always Ok)

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use cohort_core::TickReport;

use super::{MetricsError, MetricsResult};

/// Maximum number of tick duration samples kept for averaging.
const TICK_TIME_SAMPLES: usize = 1000;

/// Metrics for the background dispatch and purge work.
///
/// All record methods return `MetricsResult<()>` for future extensibility
/// (cardinality limits, quotas), but currently always succeed.
#[derive(Debug)]
pub struct DispatchMetrics {
    /// Ticks the dispatch loop has started
    pub ticks: AtomicU64,
    /// Ticks that ended in an error or timeout
    pub tick_failures: AtomicU64,
    /// Reminder rows created by materialization
    pub reminders_materialized: AtomicU64,
    /// Reminder emails accepted by the relay
    pub emails_sent: AtomicU64,
    /// Reminder emails the relay rejected or never received
    pub emails_failed: AtomicU64,
    /// Recipients skipped for lack of an email address
    pub recipients_skipped: AtomicU64,
    /// Expired login codes removed by the purge job
    pub otp_purged: AtomicU64,
    /// Purge job runs that failed or timed out
    pub purge_failures: AtomicU64,
    /// Recent tick durations in milliseconds (ring buffer)
    pub tick_times: Mutex<VecDeque<u64>>,
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchMetrics {
    /// Create new DispatchMetrics instance with all counters at zero.
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            tick_failures: AtomicU64::new(0),
            reminders_materialized: AtomicU64::new(0),
            emails_sent: AtomicU64::new(0),
            emails_failed: AtomicU64::new(0),
            recipients_skipped: AtomicU64::new(0),
            otp_purged: AtomicU64::new(0),
            purge_failures: AtomicU64::new(0),
            tick_times: Mutex::new(VecDeque::with_capacity(TICK_TIME_SAMPLES)),
        }
    }

    /// Record the start of a dispatch tick.
    pub fn record_tick(&self) -> MetricsResult<()> {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Record a tick that failed or timed out.
    pub fn record_tick_failure(&self) -> MetricsResult<()> {
        self.tick_failures.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Fold one tick's counters into the totals.
    pub fn record_report(&self, report: &TickReport) -> MetricsResult<()> {
        self.reminders_materialized.fetch_add(report.materialized as u64, Ordering::Relaxed);
        self.emails_sent.fetch_add(report.emails_sent as u64, Ordering::Relaxed);
        self.emails_failed.fetch_add(report.emails_failed as u64, Ordering::Relaxed);
        self.recipients_skipped.fetch_add(report.skipped_no_address as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Record rows removed by one purge run.
    pub fn record_purged(&self, removed: u64) -> MetricsResult<()> {
        self.otp_purged.fetch_add(removed, Ordering::Relaxed);
        Ok(())
    }

    /// Record a purge run that failed or timed out.
    pub fn record_purge_failure(&self) -> MetricsResult<()> {
        self.purge_failures.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Store one tick duration sample.
    ///
    /// Maintains ring buffer of the last samples. Uses VecDeque for O(1)
    /// eviction.
    pub fn record_tick_time(&self, duration: Duration) -> MetricsResult<()> {
        let ms = duration.as_millis() as u64;

        // Poison-safe locking: explicit match, no .expect()
        let mut times = match self.tick_times.lock() {
            Ok(guard) => guard,
            Err(poison_err) => {
                tracing::warn!(
                    metric = "DispatchMetrics::tick_times",
                    "Mutex poisoned during tick time recording, recovering data"
                );
                poison_err.into_inner()
            }
        };

        times.push_back(ms);
        if times.len() > TICK_TIME_SAMPLES {
            times.pop_front();
        }

        Ok(())
    }

    /// Average tick duration in milliseconds over the retained samples.
    ///
    /// Returns `MetricsError::EmptyData` if no samples recorded.
    pub fn avg_tick_time_ms(&self) -> MetricsResult<u64> {
        let times = match self.tick_times.lock() {
            Ok(guard) => guard,
            Err(poison_err) => {
                tracing::warn!(
                    metric = "DispatchMetrics::tick_times",
                    "Mutex poisoned during average read, recovering"
                );
                poison_err.into_inner()
            }
        };

        if times.is_empty() {
            return Err(MetricsError::EmptyData { metric: "avg_tick_time" });
        }

        let total: u64 = times.iter().sum();
        Ok(total / times.len() as u64)
    }
}
