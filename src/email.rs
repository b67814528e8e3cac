// ABOUTME: Transactional email relay over the Resend HTTP API
// ABOUTME: Absorbs every failure into a skipped outcome so callers never branch on email errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

//! # Email Relay
//!
//! Email here is a side channel: nothing in the OAuth flow depends on a
//! message arriving. The relay therefore reports every failure as a
//! successful-but-skipped outcome instead of an error, and the transport
//! layer returns 200 for all of them. An unconfigured API key, a bad
//! recipient, and an upstream outage all look the same to the caller.

use crate::config::environment::EmailConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const RESEND_API_BASE: &str = "https://api.resend.com";

/// Outcome of a relay attempt; `success` is always true
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Upstream message id when the send actually happened
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl EmailOutcome {
    fn sent(id: Option<String>) -> Self {
        Self {
            success: true,
            skipped: false,
            reason: None,
            id,
        }
    }

    fn skipped(reason: impl Into<String>) -> Self {
        Self {
            success: true,
            skipped: true,
            reason: Some(reason.into()),
            id: None,
        }
    }
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Deserialize)]
struct ResendResponse {
    id: Option<String>,
}

/// Relay for transactional email
pub struct EmailRelay {
    api_key: Option<String>,
    from: String,
    api_base: String,
}

impl EmailRelay {
    #[must_use]
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            from: config.from.clone(),
            api_base: RESEND_API_BASE.to_owned(),
        }
    }

    /// Point the relay at a different API endpoint - used by tests
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Relay one message. Never fails; see module docs.
    pub async fn send(&self, to: &str, subject: &str, html: &str) -> EmailOutcome {
        if !is_valid_email(to) {
            warn!("Skipping email relay: invalid recipient address");
            return EmailOutcome::skipped("Invalid email");
        }

        let Some(api_key) = &self.api_key else {
            info!("Skipping email relay: no API key configured");
            return EmailOutcome::skipped("Email relay not configured");
        };

        let request = ResendRequest {
            from: &self.from,
            to: [to],
            subject,
            html,
        };

        let client = reqwest::Client::new();
        let response = client
            .post(format!("{}/emails", self.api_base))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                let id = response
                    .json::<ResendResponse>()
                    .await
                    .ok()
                    .and_then(|body| body.id);
                info!("Relayed email via Resend");
                EmailOutcome::sent(id)
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!("Email relay rejected upstream: HTTP {status}: {body}");
                EmailOutcome::skipped(format!("Upstream rejected: HTTP {status}"))
            }
            Err(e) => {
                warn!("Email relay request failed: {e}");
                EmailOutcome::skipped("Email delivery failed")
            }
        }
    }
}

/// Cheap structural check; the upstream API does the real validation
fn is_valid_email(address: &str) -> bool {
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relay(api_key: Option<&str>) -> EmailRelay {
        EmailRelay::new(&EmailConfig {
            api_key: api_key.map(ToOwned::to_owned),
            from: "FlowSphere <noreply@flowsphere.app>".to_owned(),
        })
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last@mail.example.co"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@nodot"));
        assert!(!is_valid_email("user@.example.com"));
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_skipped() {
        let outcome = relay(Some("re_key")).send("not-an-address", "Hi", "<p>Hi</p>").await;
        assert!(outcome.success);
        assert!(outcome.skipped);
        assert_eq!(outcome.reason.as_deref(), Some("Invalid email"));
    }

    #[tokio::test]
    async fn test_missing_key_is_skipped() {
        let outcome = relay(None).send("user@example.com", "Hi", "<p>Hi</p>").await;
        assert!(outcome.success);
        assert!(outcome.skipped);
        assert_eq!(outcome.reason.as_deref(), Some("Email relay not configured"));
    }

    #[tokio::test]
    async fn test_network_failure_is_skipped() {
        // Unroutable address; the request fails without touching the network
        let outcome = relay(Some("re_key"))
            .with_api_base("http://127.0.0.1:1")
            .send("user@example.com", "Hi", "<p>Hi</p>")
            .await;
        assert!(outcome.success);
        assert!(outcome.skipped);
        assert_eq!(outcome.reason.as_deref(), Some("Email delivery failed"));
    }
}
