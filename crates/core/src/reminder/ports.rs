//! Port interfaces for the reminder subsystem
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use cohort_domain::{BatchMember, Meeting, MeetingDraft, Notification, Result};
use uuid::Uuid;

/// Trait for querying and persisting meetings
#[async_trait]
pub trait MeetingRepository: Send + Sync {
    /// List meetings with scheduled start in `(from, from + window]`.
    async fn starting_within(&self, from: DateTime<Utc>, window: Duration)
        -> Result<Vec<Meeting>>;

    /// Look up a single meeting; `None` when it has been deleted.
    async fn find_by_id(&self, id: i64) -> Result<Option<Meeting>>;

    /// Persist a new meeting, returning the stored row with its identity.
    async fn insert(&self, draft: MeetingDraft) -> Result<Meeting>;

    /// Meetings for a batch with `scheduled_at >= now`, soonest first.
    async fn upcoming_for_batch(&self, batch_id: i64, now: DateTime<Utc>) -> Result<Vec<Meeting>>;
}

/// Trait for resolving batch membership
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// List the members of a batch. `email` may be absent.
    async fn members_of_batch(&self, batch_id: i64) -> Result<Vec<BatchMember>>;

    /// Whether the batch exists.
    async fn batch_exists(&self, batch_id: i64) -> Result<bool>;
}

/// Trait for persisting reminder rows
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Insert a pending reminder, honoring the store's
    /// `UNIQUE(meeting_id, batch_id)` constraint.
    ///
    /// Returns `true` when a row was inserted, `false` when one already
    /// existed (the existing row is left untouched).
    async fn upsert_pending(&self, notification: &Notification) -> Result<bool>;

    /// Reminders with `sent = false` and `notify_at <= now`.
    async fn due_unsent(&self, now: DateTime<Utc>) -> Result<Vec<Notification>>;

    /// Irreversibly mark a reminder sent.
    async fn mark_sent(&self, id: Uuid) -> Result<()>;

    /// Read path: reminders for the given batches whose meeting is scheduled
    /// at or after `now - 30min`, visible once sent or due, newest first.
    async fn recent_for_batches(
        &self,
        batch_ids: &[i64],
        now: DateTime<Utc>,
    ) -> Result<Vec<Notification>>;
}

/// Trait for dispatching templated email
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send one message. `body` is rendered HTML.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}
