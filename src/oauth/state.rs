// ABOUTME: Pending-authorization store with atomic consume-once semantics and TTL eviction
// ABOUTME: Pluggable backends, in-process map for single instances and Redis for fleets
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

//! # Pending-Authorization Store
//!
//! Maps one-time state tokens to in-flight OAuth attempts. The contract both
//! backends uphold:
//!
//! - `consume` looks up and removes in one indivisible step, so two racing
//!   callbacks presenting the same state token cannot both succeed.
//! - Entries older than the TTL are rejected at read time, independent of the
//!   background sweep cadence.

use super::{OAuthError, Provider};
use crate::config::environment::ServerConfig;
use crate::constants::oauth_flow;
use base64::engine::general_purpose;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Key namespace for the Redis backend
const REDIS_KEY_PREFIX: &str = "flowsphere:oauth:state:";

/// One in-flight OAuth attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAuthorization {
    /// Provider the attempt was initiated for
    pub provider: Provider,
    /// When the attempt was initiated
    pub created_at: DateTime<Utc>,
    /// Front-end location to send the user back to after completion
    pub return_location: String,
}

impl PendingAuthorization {
    fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.created_at) > ttl
    }
}

/// Store trait for pending authorizations
#[async_trait::async_trait]
pub trait PendingAuthStore: Send + Sync {
    /// Generate a state token and record the pending authorization under it
    async fn create(
        &self,
        provider: Provider,
        return_location: String,
    ) -> Result<String, OAuthError>;

    /// Atomically look up and remove; `None` for unknown, replayed, or
    /// expired tokens
    async fn consume(&self, state_token: &str)
        -> Result<Option<PendingAuthorization>, OAuthError>;
}

/// Generate a cryptographically random, URL-safe state token
fn generate_state_token() -> String {
    let mut bytes = [0u8; oauth_flow::STATE_TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn state_ttl() -> Duration {
    Duration::seconds(i64::try_from(oauth_flow::STATE_TTL_SECS).unwrap_or(600))
}

// ============================================================================
// In-memory backend
// ============================================================================

/// In-process store for single-instance deployments
pub struct InMemoryStateStore {
    entries: RwLock<HashMap<String, PendingAuthorization>>,
    ttl: Duration,
}

impl InMemoryStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(state_ttl())
    }

    /// Custom TTL constructor - used by expiry tests
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Remove all expired entries; returns how many were evicted
    pub async fn sweep(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, pending| !pending.is_expired(self.ttl, now));
        before - entries.len()
    }

    /// Spawn the periodic eviction task. Runs for the life of the process;
    /// each tick only takes the write lock long enough to drop stale entries.
    pub fn spawn_sweeper(self: &Arc<Self>) {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(
                oauth_flow::SWEEP_INTERVAL_SECS,
            ));
            interval.tick().await; // first tick fires immediately
            loop {
                interval.tick().await;
                let evicted = store.sweep().await;
                if evicted > 0 {
                    debug!("Evicted {evicted} expired pending authorizations");
                }
            }
        });
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PendingAuthStore for InMemoryStateStore {
    async fn create(
        &self,
        provider: Provider,
        return_location: String,
    ) -> Result<String, OAuthError> {
        let state_token = generate_state_token();
        let pending = PendingAuthorization {
            provider,
            created_at: Utc::now(),
            return_location,
        };
        self.entries
            .write()
            .await
            .insert(state_token.clone(), pending);
        Ok(state_token)
    }

    async fn consume(
        &self,
        state_token: &str,
    ) -> Result<Option<PendingAuthorization>, OAuthError> {
        // Single write-lock remove: racing consumers cannot both observe the entry
        let removed = self.entries.write().await.remove(state_token);

        match removed {
            Some(pending) if pending.is_expired(self.ttl, Utc::now()) => {
                debug!("Rejected expired state token for {}", pending.provider);
                Ok(None)
            }
            other => Ok(other),
        }
    }
}

// ============================================================================
// Redis backend
// ============================================================================

/// Redis-backed store for multi-instance deployments.
///
/// Native key expiry (`SET .. EX`) replaces the sweep; `GETDEL` gives the
/// same atomic consume-once guarantee as the in-memory write-lock remove.
#[derive(Clone)]
pub struct RedisStateStore {
    manager: ConnectionManager,
    ttl: Duration,
}

impl RedisStateStore {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the connection fails.
    pub async fn connect(redis_url: &str) -> Result<Self, OAuthError> {
        info!("Connecting pending-authorization store to Redis");
        let client = redis::Client::open(redis_url)
            .map_err(|e| OAuthError::StoreError(format!("Failed to create Redis client: {e}")))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| OAuthError::StoreError(format!("Failed to connect to Redis: {e}")))?;
        Ok(Self {
            manager,
            ttl: state_ttl(),
        })
    }

    fn build_key(state_token: &str) -> String {
        format!("{REDIS_KEY_PREFIX}{state_token}")
    }
}

#[async_trait::async_trait]
impl PendingAuthStore for RedisStateStore {
    async fn create(
        &self,
        provider: Provider,
        return_location: String,
    ) -> Result<String, OAuthError> {
        let state_token = generate_state_token();
        let pending = PendingAuthorization {
            provider,
            created_at: Utc::now(),
            return_location,
        };
        let payload = serde_json::to_string(&pending)
            .map_err(|e| OAuthError::StoreError(format!("Serialization failed: {e}")))?;

        let mut conn = self.manager.clone();
        let ttl_secs = u64::try_from(self.ttl.num_seconds()).unwrap_or(600);
        let _: () = conn
            .set_ex(Self::build_key(&state_token), payload, ttl_secs)
            .await
            .map_err(|e| OAuthError::StoreError(format!("Redis SET failed: {e}")))?;
        Ok(state_token)
    }

    async fn consume(
        &self,
        state_token: &str,
    ) -> Result<Option<PendingAuthorization>, OAuthError> {
        let mut conn = self.manager.clone();
        let payload: Option<String> = conn
            .get_del(Self::build_key(state_token))
            .await
            .map_err(|e| OAuthError::StoreError(format!("Redis GETDEL failed: {e}")))?;

        let Some(payload) = payload else {
            return Ok(None);
        };
        let pending: PendingAuthorization = serde_json::from_str(&payload)
            .map_err(|e| OAuthError::StoreError(format!("Deserialization failed: {e}")))?;

        // Redis expiry already bounds the lifetime; the read-time check guards
        // against clock drift between instances
        if pending.is_expired(self.ttl, Utc::now()) {
            warn!("Redis returned an expired pending authorization, rejecting");
            return Ok(None);
        }
        Ok(Some(pending))
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Build the store the configuration asks for and start its eviction
/// machinery.
///
/// # Errors
///
/// Returns an error if the Redis backend is selected and the connection
/// fails; the server should not come up half-configured.
pub async fn from_config(config: &ServerConfig) -> Result<Arc<dyn PendingAuthStore>, OAuthError> {
    match &config.redis_url {
        Some(url) => {
            let store = RedisStateStore::connect(url).await?;
            info!("Pending-authorization store: redis");
            Ok(Arc::new(store))
        }
        None => {
            let store = Arc::new(InMemoryStateStore::new());
            store.spawn_sweeper();
            info!("Pending-authorization store: in-memory");
            Ok(store)
        }
    }
}
