//! One-time password (OTP) entry
//!
//! Persisted, expiring verification codes keyed by email. One live row per
//! email; expired rows behave like missing rows and are purged periodically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted OTP row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpEntry {
    pub id: Uuid,
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl OtpEntry {
    /// Build a fresh unverified entry expiring `ttl` after `now`.
    #[must_use]
    pub fn issued(email: String, code: String, ttl: chrono::Duration, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            email,
            code,
            expires_at: now + ttl,
            verified: false,
            created_at: now,
        }
    }

    /// Whether the entry has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn test_issued_entry_expires_after_ttl() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).single().expect("valid time");
        let entry = OtpEntry::issued("a@example.com".into(), "123456".into(), Duration::minutes(5), now);

        assert!(!entry.verified);
        assert!(!entry.is_expired(now));
        assert!(!entry.is_expired(now + Duration::minutes(4)));
        assert!(entry.is_expired(now + Duration::minutes(5)), "expiry boundary is inclusive");
        assert!(entry.is_expired(now + Duration::minutes(6)));
    }
}
