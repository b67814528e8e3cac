// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides server resource builders and a scripted in-process OAuth provider
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]
//! Shared test utilities for `flowsphere_relay`

use chrono::Utc;
use flowsphere_relay::config::environment::{
    CorsConfig, EmailConfig, Environment, RateLimitConfig, ServerConfig,
};
use flowsphere_relay::config::oauth::OAuthConfig;
use flowsphere_relay::context::ServerResources;
use flowsphere_relay::crypto::TokenCipher;
use flowsphere_relay::email::EmailRelay;
use flowsphere_relay::handoff::{generate_signing_secret, HandoffManager};
use flowsphere_relay::oauth::manager::OAuthManager;
use flowsphere_relay::oauth::state::InMemoryStateStore;
use flowsphere_relay::oauth::{
    CodeExchange, OAuthError, OAuthProvider, Provider, ProviderRegistry, TokenData, UserInfo,
};
use std::sync::{Arc, Once};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Scripted provider that answers the flow without touching the network
pub struct ScriptedProvider {
    pub provider: Provider,
    pub fail_exchange: bool,
}

impl ScriptedProvider {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            fail_exchange: false,
        }
    }
}

#[async_trait::async_trait]
impl OAuthProvider for ScriptedProvider {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn auth_url(&self, state: &str) -> String {
        format!(
            "https://provider.test/{}/authorize?state={state}",
            self.provider
        )
    }

    async fn exchange_code(&self, _code: &str) -> Result<CodeExchange, OAuthError> {
        if self.fail_exchange {
            return Err(OAuthError::TokenExchangeFailed("scripted failure".into()));
        }
        Ok(CodeExchange {
            tokens: TokenData {
                access_token: "scripted-access".to_owned(),
                refresh_token: "scripted-refresh".to_owned(),
                expires_at: Utc::now() + chrono::Duration::hours(1),
            },
            user_info: None,
        })
    }

    async fn fetch_user_info(&self, _access_token: &str) -> Result<UserInfo, OAuthError> {
        Ok(UserInfo {
            email: "user@example.com".to_owned(),
            name: Some("Test User".to_owned()),
            picture: None,
        })
    }

    async fn refresh_token(&self, _refresh_token: &str) -> Result<TokenData, OAuthError> {
        Ok(TokenData {
            access_token: "refreshed-access".to_owned(),
            refresh_token: "refreshed-refresh".to_owned(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        })
    }
}

/// Configuration for tests; never reads the process environment
pub fn test_config() -> ServerConfig {
    ServerConfig {
        http_port: 0,
        environment: Environment::Testing,
        cors: CorsConfig {
            allowed_origins: "*".to_owned(),
        },
        rate_limits: RateLimitConfig::default(),
        frontend_url: "http://localhost:5173".to_owned(),
        base_url: "http://localhost:8787".to_owned(),
        redis_url: None,
        oauth: OAuthConfig::default(),
        email: EmailConfig {
            api_key: None,
            from: "FlowSphere <noreply@flowsphere.app>".to_owned(),
        },
    }
}

/// Server resources with a scripted Google provider registered
pub fn test_resources(config: ServerConfig) -> Arc<ServerResources> {
    init_test_logging();

    let mut registry = ProviderRegistry::new();
    registry.register(Box::new(ScriptedProvider::new(Provider::Google)));

    let oauth = OAuthManager::new(
        registry,
        Arc::new(InMemoryStateStore::new()),
        Arc::new(TokenCipher::from_bytes([9u8; 32])),
        Arc::new(HandoffManager::new(generate_signing_secret().to_vec())),
        config.frontend_url.clone(),
    );
    let email = EmailRelay::new(&config.email);

    Arc::new(ServerResources::new(config, oauth, email))
}
