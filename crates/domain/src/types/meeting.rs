//! Meeting types
//!
//! A meeting belongs to exactly one batch; its members are the reminder
//! audience.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted meeting row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Scheduled start, always an absolute UTC instant.
    pub scheduled_at: DateTime<Utc>,
    pub meeting_link: String,
    pub batch_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new meeting.
///
/// `scheduled_at` is `DateTime<Utc>`, so any client-supplied offset is
/// normalized to UTC at deserialization time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingDraft {
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub meeting_link: String,
    pub batch_id: i64,
}
