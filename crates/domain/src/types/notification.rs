//! Notification (meeting reminder) types
//!
//! A notification is an at-most-once email obligation tied to a meeting and
//! batch. The store enforces `UNIQUE(meeting_id, batch_id)`, so at most one
//! row exists per pair. Lifecycle: created pending, marked sent exactly once,
//! never reverted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted reminder row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub meeting_id: i64,
    /// Denormalized from the meeting for query convenience.
    pub batch_id: i64,
    /// Instant at which the reminder becomes eligible for dispatch.
    pub notify_at: DateTime<Utc>,
    pub message: String,
    pub is_sent: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Build a new pending reminder with a fresh UUIDv7 identity.
    #[must_use]
    pub fn pending(
        meeting_id: i64,
        batch_id: i64,
        notify_at: DateTime<Utc>,
        message: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            meeting_id,
            batch_id,
            notify_at,
            message,
            is_sent: false,
            created_at: now,
        }
    }

    /// Whether the reminder is eligible for dispatch at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.is_sent && self.notify_at <= now
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_pending_starts_unsent() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().expect("valid time");
        let n = Notification::pending(7, 3, now, "msg".into(), now);
        assert!(!n.is_sent);
        assert_eq!(n.meeting_id, 7);
        assert_eq!(n.batch_id, 3);
        assert_eq!(n.created_at, now);
    }

    #[test]
    fn test_is_due_respects_notify_at_and_sent_flag() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().expect("valid time");
        let later = now + chrono::Duration::minutes(5);

        let due = Notification::pending(1, 1, now, "msg".into(), now);
        assert!(due.is_due(now), "notify_at == now is due");

        let future = Notification::pending(2, 1, later, "msg".into(), now);
        assert!(!future.is_due(now), "future notify_at is not due");

        let mut sent = Notification::pending(3, 1, now, "msg".into(), now);
        sent.is_sent = true;
        assert!(!sent.is_due(now), "sent rows are never due");
    }
}
