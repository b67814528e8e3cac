// ABOUTME: Shared server resources threaded through every HTTP handler
// ABOUTME: Bootstraps the cipher, handoff manager, provider registry, and state store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

//! Shared server state.
//!
//! All handlers receive one `Arc<ServerResources>`; nothing route-specific
//! lives here, only the long-lived components the whole server shares.

use crate::config::environment::ServerConfig;
use crate::crypto::TokenCipher;
use crate::email::EmailRelay;
use crate::handoff::HandoffManager;
use crate::oauth::manager::OAuthManager;
use crate::oauth::providers::registry_from_config;
use crate::oauth::state;
use anyhow::Result;
use std::sync::Arc;

/// Long-lived components shared across all request handlers
pub struct ServerResources {
    pub config: ServerConfig,
    pub oauth: OAuthManager,
    pub email: EmailRelay,
}

impl ServerResources {
    #[must_use]
    pub fn new(config: ServerConfig, oauth: OAuthManager, email: EmailRelay) -> Self {
        Self {
            config,
            oauth,
            email,
        }
    }

    /// Build everything from configuration: load (or dev-generate) the key
    /// material, connect the pending-authorization store, and register the
    /// configured providers.
    ///
    /// # Errors
    ///
    /// Fails fast on missing production secrets or an unreachable Redis
    /// backend; a half-configured relay should not come up.
    pub async fn bootstrap(config: ServerConfig) -> Result<Arc<Self>> {
        let cipher = Arc::new(TokenCipher::load_or_generate(&config.environment)?);
        let handoff = Arc::new(HandoffManager::load_or_generate(&config.environment)?);
        let store = state::from_config(&config).await?;
        let registry = registry_from_config(&config.oauth);

        let oauth = OAuthManager::new(
            registry,
            store,
            cipher,
            handoff,
            config.frontend_url.clone(),
        );
        let email = EmailRelay::new(&config.email);

        Ok(Arc::new(Self::new(config, oauth, email)))
    }
}
