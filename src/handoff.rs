// ABOUTME: Signed handoff credential minting and verification for OAuth completion
// ABOUTME: Short-lived HS256 JWT carrying identity plus the encrypted token bundle
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

//! # Handoff Credential Management
//!
//! The provider callback cannot return tokens to the client directly: the
//! browser is mid-navigation and anything placed in the redirect URL lands in
//! history and logs. Instead the server mints a short-lived signed credential
//! carrying the user's identity and the *encrypted* token bundle; the client
//! exchanges it once at `POST /auth/complete`. Expired and tampered
//! credentials fail distinctly so the client knows whether restarting the
//! flow can help.

use crate::config::environment::Environment;
use crate::constants::{env_config, oauth_flow, service_names};
use crate::oauth::Provider;
use anyhow::{anyhow, Result};
use base64::engine::general_purpose;
use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;
use uuid::Uuid;
use zeroize::Zeroize;

/// Claims embedded in a handoff credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffClaims {
    /// Provider the tokens belong to
    pub provider: Provider,
    /// Account email reported by the provider
    pub email: String,
    /// Display name, when the provider reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Avatar URL, when the provider reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Encrypted token bundle (see `crypto::TokenCipher`)
    pub tokens: String,
    /// Audience
    pub aud: String,
    /// Issued-at (seconds since epoch)
    pub iat: i64,
    /// Expiry (seconds since epoch)
    pub exp: i64,
    /// Unique credential id
    pub jti: String,
}

/// Handoff credential validation error with distinct failure modes
#[derive(Debug, Clone, thiserror::Error)]
pub enum HandoffValidationError {
    /// Credential expired; the user must restart the connection flow
    #[error("Handoff credential expired at {expired_at}")]
    TokenExpired {
        /// When the credential expired
        expired_at: chrono::DateTime<chrono::Utc>,
    },
    /// Signature did not verify
    #[error("Handoff credential invalid: {reason}")]
    TokenInvalid {
        /// Reason for invalidity
        reason: String,
    },
    /// Not a structurally valid JWT at all
    #[error("Handoff credential malformed: {details}")]
    TokenMalformed {
        /// Details about malformation
        details: String,
    },
}

/// Mints and verifies handoff credentials
pub struct HandoffManager {
    secret: Vec<u8>,
    ttl: Duration,
}

impl HandoffManager {
    /// Create a manager with an explicit secret - primarily for testing
    #[must_use]
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            secret,
            ttl: Duration::seconds(i64::try_from(oauth_flow::HANDOFF_TTL_SECS).unwrap_or(300)),
        }
    }

    /// Override the credential lifetime - used by expiry tests
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Load the signing secret from the environment, or generate one in
    /// development.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is absent in production; handoff
    /// credentials signed with an ephemeral secret would not survive a
    /// restart, which is unacceptable there.
    pub fn load_or_generate(environment: &Environment) -> Result<Self> {
        if let Ok(encoded) = env::var(env_config::JWT_SECRET) {
            let mut secret = general_purpose::STANDARD
                .decode(&encoded)
                .map_err(|e| anyhow!("Invalid base64 in {}: {e}", env_config::JWT_SECRET))?;
            if secret.len() < 32 {
                secret.zeroize();
                return Err(anyhow!(
                    "{} must decode to at least 32 bytes",
                    env_config::JWT_SECRET
                ));
            }
            return Ok(Self::new(secret));
        }

        if environment.is_production() {
            return Err(anyhow!(
                "{} must be set in production",
                env_config::JWT_SECRET
            ));
        }

        warn!("{} not set, generating ephemeral signing secret", env_config::JWT_SECRET);
        let mut secret = vec![0u8; 64];
        rand::rngs::OsRng.fill_bytes(&mut secret);
        Ok(Self::new(secret))
    }

    /// Mint a credential embedding identity and the encrypted token bundle.
    ///
    /// # Errors
    ///
    /// Returns an error if JWT encoding fails.
    pub fn mint(
        &self,
        provider: Provider,
        email: &str,
        name: Option<String>,
        picture: Option<String>,
        encrypted_tokens: String,
    ) -> Result<String> {
        let now = Utc::now();
        let claims = HandoffClaims {
            provider,
            email: email.to_owned(),
            name,
            picture,
            tokens: encrypted_tokens,
            aud: service_names::HANDOFF_AUDIENCE.to_owned(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )?;
        Ok(token)
    }

    /// Verify a credential and return its claims.
    ///
    /// # Errors
    ///
    /// Returns [`HandoffValidationError::TokenExpired`] for expired
    /// credentials, `TokenInvalid` for signature failures, and
    /// `TokenMalformed` for structurally broken tokens.
    pub fn verify(&self, token: &str) -> Result<HandoffClaims, HandoffValidationError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[service_names::HANDOFF_AUDIENCE]);
        validation.validate_exp = true;
        validation.leeway = 0;

        match decode::<HandoffClaims>(token, &DecodingKey::from_secret(&self.secret), &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => Err(Self::convert_jwt_error(token, &e)),
        }
    }

    /// Convert JWT library errors to distinct validation errors
    fn convert_jwt_error(
        token: &str,
        e: &jsonwebtoken::errors::Error,
    ) -> HandoffValidationError {
        use jsonwebtoken::errors::ErrorKind;
        warn!("Handoff credential validation failed: {e:?}");

        match e.kind() {
            ErrorKind::ExpiredSignature => {
                let expired_at = Self::claimed_expiry(token)
                    .unwrap_or_else(Utc::now);
                HandoffValidationError::TokenExpired { expired_at }
            }
            ErrorKind::InvalidSignature => HandoffValidationError::TokenInvalid {
                reason: "Signature verification failed".into(),
            },
            ErrorKind::InvalidAudience => HandoffValidationError::TokenInvalid {
                reason: "Audience mismatch".into(),
            },
            ErrorKind::InvalidToken => HandoffValidationError::TokenMalformed {
                details: "Token format is invalid".into(),
            },
            ErrorKind::Base64(base64_err) => HandoffValidationError::TokenMalformed {
                details: format!("Token contains invalid base64: {base64_err}"),
            },
            ErrorKind::Json(json_err) => HandoffValidationError::TokenMalformed {
                details: format!("Token contains invalid JSON: {json_err}"),
            },
            _ => HandoffValidationError::TokenInvalid {
                reason: e.to_string(),
            },
        }
    }

    /// Best-effort read of the `exp` claim from an already-rejected token,
    /// purely for the error message. No signature trust is placed in it.
    fn claimed_expiry(token: &str) -> Option<chrono::DateTime<Utc>> {
        let payload = token.split('.').nth(1)?;
        let bytes = general_purpose::URL_SAFE_NO_PAD.decode(payload).ok()?;
        let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
        let exp = value.get("exp")?.as_i64()?;
        chrono::DateTime::from_timestamp(exp, 0)
    }
}

impl Drop for HandoffManager {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

/// Generate a random signing secret
#[must_use]
pub fn generate_signing_secret() -> [u8; 64] {
    let mut secret = [0u8; 64];
    rand::rngs::OsRng.fill_bytes(&mut secret);
    secret
}
