// ABOUTME: OAuth module organizing provider dialects, transient state, and flow orchestration
// ABOUTME: Defines the provider capability trait the orchestrator depends on
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

//! # OAuth Management Module
//!
//! Unified OAuth handling for all identity providers. The orchestrator sees
//! one normalized identity+token result regardless of upstream dialect; the
//! per-provider differences (scopes, token endpoints, userinfo shape) live
//! behind the [`OAuthProvider`] trait.

/// Central flow orchestration (initiate, callback, complete, refresh)
pub mod manager;
/// Concrete provider implementations (Google, Outlook, Yahoo, Apple)
pub mod providers;
/// Pending-authorization store with atomic consume-once semantics
pub mod state;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// The fixed set of supported identity providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Outlook,
    Yahoo,
    Apple,
}

impl Provider {
    /// All supported providers, in directory order
    pub const ALL: [Self; 4] = [Self::Google, Self::Outlook, Self::Yahoo, Self::Apple];

    /// Lowercase identifier used in URLs and configuration
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Outlook => "outlook",
            Self::Yahoo => "yahoo",
            Self::Apple => "apple",
        }
    }

    /// Human-readable name for the provider directory
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::Outlook => "Outlook",
            Self::Yahoo => "Yahoo",
            Self::Apple => "Apple",
        }
    }

    /// Icon slug the front-end maps to an asset
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Outlook => "outlook",
            Self::Yahoo => "yahoo",
            Self::Apple => "apple",
        }
    }
}

impl FromStr for Provider {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Self::Google),
            "outlook" => Ok(Self::Outlook),
            "yahoo" => Ok(Self::Yahoo),
            "apple" => Ok(Self::Apple),
            other => Err(OAuthError::UnsupportedProvider(other.to_owned())),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OAuth token data normalized across providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenData {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// Identity reported by a provider's userinfo endpoint (or id_token)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Result of exchanging an authorization code.
///
/// Some dialects (Apple) return identity inline in the exchange response
/// instead of exposing a userinfo endpoint.
#[derive(Debug, Clone)]
pub struct CodeExchange {
    pub tokens: TokenData,
    pub user_info: Option<UserInfo>,
}

/// Entry in the provider directory listing
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSummary {
    pub id: &'static str,
    pub name: &'static str,
    pub enabled: bool,
    pub icon: &'static str,
}

/// OAuth error types
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("Provider not supported: {0}")]
    UnsupportedProvider(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid state parameter")]
    InvalidState,

    #[error("State was issued for a different provider")]
    ProviderMismatch,

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("User info fetch failed: {0}")]
    UserInfoFailed(String),

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("State store error: {0}")]
    StoreError(String),
}

/// Trait for OAuth provider implementations
#[async_trait::async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Which provider this implementation speaks for
    fn provider(&self) -> Provider;

    /// Build the authorization URL embedding the given state token
    fn auth_url(&self, state: &str) -> String;

    /// Exchange an authorization code for tokens (and, for dialects that
    /// return it inline, identity)
    async fn exchange_code(&self, code: &str) -> Result<CodeExchange, OAuthError>;

    /// Fetch identity from the provider's userinfo endpoint
    async fn fetch_user_info(&self, access_token: &str) -> Result<UserInfo, OAuthError>;

    /// Exchange a refresh token for a new access token
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenData, OAuthError>;
}

/// OAuth provider registry; only configured providers are registered
pub struct ProviderRegistry {
    providers: HashMap<Provider, Box<dyn OAuthProvider>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register a provider implementation
    pub fn register(&mut self, implementation: Box<dyn OAuthProvider>) {
        self.providers
            .insert(implementation.provider(), implementation);
    }

    /// Get a registered provider
    #[must_use]
    pub fn get(&self, provider: Provider) -> Option<&dyn OAuthProvider> {
        self.providers.get(&provider).map(AsRef::as_ref)
    }

    /// Whether a provider is registered (i.e. configured)
    #[must_use]
    pub fn is_enabled(&self, provider: Provider) -> bool {
        self.providers.contains_key(&provider)
    }

    /// Provider directory listing over the full supported set.
    ///
    /// Disabled providers stay in the list so the front-end can render them
    /// greyed out; `enabled` is true iff client credentials are configured.
    #[must_use]
    pub fn directory(&self) -> Vec<ProviderSummary> {
        Provider::ALL
            .iter()
            .map(|p| ProviderSummary {
                id: p.as_str(),
                name: p.display_name(),
                enabled: self.is_enabled(*p),
                icon: p.icon(),
            })
            .collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
