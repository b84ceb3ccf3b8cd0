//! HTTP relay implementation of the email sending port.
//!
//! Messages go out as a JSON POST to the relay endpoint. Transport
//! failures surface as network errors through the shared conversion
//! layer; a reachable relay that refuses a message maps to an email
//! error so the dispatcher can log and move on to the next recipient.

use std::time::Duration;

use async_trait::async_trait;
use cohort_core::EmailSender;
use cohort_domain::{CohortError, RelayConfig, Result as DomainResult};
use serde::Serialize;
use tracing::debug;

use crate::errors::InfraError;

/// Email sender that posts messages to an HTTP relay.
pub struct HttpRelayMailer {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

/// Wire format expected by the relay.
#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

impl HttpRelayMailer {
    /// Build a mailer from relay configuration.
    pub fn new(config: &RelayConfig) -> DomainResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|err| CohortError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self { client, endpoint: config.endpoint.clone(), token: config.token.clone() })
    }
}

#[async_trait]
impl EmailSender for HttpRelayMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> DomainResult<()> {
        let message = RelayMessage { to, subject, body };

        let mut request = self.client.post(&self.endpoint).json(&message);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request.send().await.map_err(InfraError::from)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(relay_rejection(status, &detail));
        }

        debug!(to = %to, "message accepted by relay");
        Ok(())
    }
}

fn relay_rejection(status: reqwest::StatusCode, detail: &str) -> CohortError {
    let message = if detail.is_empty() {
        format!("relay returned {status}")
    } else {
        format!("relay returned {status}: {detail}")
    };
    CohortError::Email(message)
}

// ============================================================================
// Tests
// ============================================================================
