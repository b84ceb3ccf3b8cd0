//! OTP issue/verify service - core business logic

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use cohort_domain::constants::{DEFAULT_OTP_TTL_SECS, OTP_CODE_DIGITS};
use cohort_domain::{CohortError, OtpEntry, Result};
use rand::Rng;
use tracing::info;

use super::ports::OtpStore;
use crate::reminder::ports::EmailSender;

const OTP_SUBJECT: &str = "OTP Verification";

/// OTP issue and verification service
pub struct OtpService {
    store: Arc<dyn OtpStore>,
    mailer: Arc<dyn EmailSender>,
    ttl: Duration,
}

impl OtpService {
    /// Create a new OTP service with the default 5-minute TTL.
    pub fn new(store: Arc<dyn OtpStore>, mailer: Arc<dyn EmailSender>) -> Self {
        Self { store, mailer, ttl: Duration::seconds(DEFAULT_OTP_TTL_SECS) }
    }

    /// Override the code lifetime.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Generate a fresh code for the email, persist it (replacing any
    /// previous code), and send it by email.
    ///
    /// The code never leaves the store except through the email; a failed
    /// send surfaces as an error and the caller may simply re-issue.
    pub async fn issue(&self, email: &str, now: DateTime<Utc>) -> Result<()> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(CohortError::InvalidInput("invalid email address".to_string()));
        }

        let code = generate_code();
        let entry = OtpEntry::issued(email.to_string(), code, self.ttl, now);
        self.store.upsert(&entry).await?;

        let body = format!(
            "<p>Hi,</p>\
             <p>Your verification code is <b>{code}</b>. It expires in {mins} minutes.</p>\
             <p>Cohort Team</p>",
            code = entry.code,
            mins = self.ttl.num_minutes(),
        );
        self.mailer.send(email, OTP_SUBJECT, &body).await?;

        info!(email = %email, expires_at = %entry.expires_at, "verification code issued");
        Ok(())
    }

    /// Check a submitted code. Expired entries behave exactly like missing
    /// ones. On success the row is marked verified.
    pub async fn verify(&self, email: &str, code: &str, now: DateTime<Utc>) -> Result<()> {
        let entry = self.store.find(email).await?;

        let Some(mut entry) = entry else {
            return Err(CohortError::NotFound(format!("no pending verification for {email}")));
        };
        if entry.is_expired(now) {
            return Err(CohortError::NotFound(format!("no pending verification for {email}")));
        }
        if entry.code != code {
            return Err(CohortError::InvalidInput("incorrect verification code".to_string()));
        }

        entry.verified = true;
        self.store.upsert(&entry).await?;
        info!(email = %email, "email verified");
        Ok(())
    }

    /// Drop the row for an email (consume-on-success or admin reset).
    pub async fn delete(&self, email: &str) -> Result<()> {
        self.store.delete(email).await
    }
}

fn generate_code() -> String {
    let bound = 10_u32.pow(OTP_CODE_DIGITS);
    let n = rand::thread_rng().gen_range(0..bound);
    format!("{n:0width$}", width = OTP_CODE_DIGITS as usize)
}
