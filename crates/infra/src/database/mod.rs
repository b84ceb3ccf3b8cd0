//! Database access layer
//!
//! SQLite-backed implementations of the core repository ports, plus the
//! connection pool and schema lifecycle. Timestamps are stored as epoch
//! seconds; the helpers here keep the row mapping uniform across
//! repositories.

pub mod manager;
pub mod meeting_repository;
pub mod membership_repository;
pub mod notification_repository;
pub mod otp_repository;
pub mod pool;

pub use manager::DbManager;
pub use meeting_repository::SqliteMeetingRepository;
pub use membership_repository::SqliteMembershipRepository;
pub use notification_repository::SqliteNotificationRepository;
pub use otp_repository::SqliteOtpStore;
pub use pool::{create_pool, DbConnection, DbPool};

use chrono::{DateTime, Utc};
use cohort_domain::CohortError;
use rusqlite::types::Type;
use tokio::task::JoinError;
use uuid::Uuid;

use crate::errors::InfraError;

/// Convert a rusqlite error via the infra conversion layer.
pub(crate) fn map_sql_error(err: rusqlite::Error) -> CohortError {
    InfraError::from(err).into()
}

/// Map a `spawn_blocking` join failure onto the domain error.
pub(crate) fn map_join_error(source: JoinError) -> CohortError {
    if source.is_cancelled() {
        CohortError::Internal("database task cancelled".into())
    } else {
        CohortError::Internal(format!("database task panicked: {source}"))
    }
}

/// Read an epoch-seconds column into a UTC instant.
pub(crate) fn epoch_to_datetime(idx: usize, secs: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp {secs} out of range").into(),
        )
    })
}

/// Parse a TEXT uuid column.
pub(crate) fn parse_uuid(idx: usize, raw: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}
