//! Port interface for the persisted OTP store
//!
//! A keyed store with expiry semantics: one live row per email, indexed
//! expiry for the purge sweep. Replaces in-process OTP state so codes
//! survive restarts and work across instances.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cohort_domain::{OtpEntry, Result};

/// Trait for persisting one-time passwords
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Fetch the row for an email, expired or not. `None` when absent.
    async fn find(&self, email: &str) -> Result<Option<OtpEntry>>;

    /// Insert or replace the row for the entry's email.
    async fn upsert(&self, entry: &OtpEntry) -> Result<()>;

    /// Remove the row for an email. Removing a missing row is not an error.
    async fn delete(&self, email: &str) -> Result<()>;

    /// Delete all rows with `expires_at <= now`, returning how many went.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}
