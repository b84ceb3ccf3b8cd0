//! Observability infrastructure for runtime metrics
//!
//! In-process counters only: cheap atomics updated by the schedulers and
//! read when the process reports health or shuts down. Recording never
//! panics; the one lock involved recovers from poisoning.

pub mod metrics;

pub use metrics::DispatchMetrics;

/// Metrics error type
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// No samples recorded yet for an aggregate metric
    #[error("no data recorded for {metric}")]
    EmptyData {
        /// Metric that could not be computed
        metric: &'static str,
    },
}

/// Result type for metrics operations
pub type MetricsResult<T> = Result<T, MetricsError>;
