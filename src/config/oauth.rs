// ABOUTME: OAuth configuration types for identity provider authentication
// ABOUTME: Handles Google, Outlook, Yahoo, and Apple client credentials and scopes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

use crate::oauth::Provider;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;
use tracing::{info, warn};

/// OAuth provider configuration for all supported identity providers
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OAuthConfig {
    /// Google OAuth configuration
    pub google: OAuthProviderConfig,
    /// Microsoft/Outlook OAuth configuration
    pub outlook: OAuthProviderConfig,
    /// Yahoo OAuth configuration
    pub yahoo: OAuthProviderConfig,
    /// Apple OAuth configuration
    pub apple: OAuthProviderConfig,
}

impl OAuthConfig {
    /// Load OAuth configuration from environment.
    ///
    /// Redirect URIs default to `{base_url}/auth/{provider}/callback` when the
    /// provider-specific override is unset.
    #[must_use]
    pub fn from_env(base_url: &str) -> Self {
        Self {
            google: OAuthProviderConfig::load(
                Provider::Google,
                base_url,
                &[
                    "openid",
                    "email",
                    "profile",
                    "https://www.googleapis.com/auth/gmail.readonly",
                ],
            ),
            outlook: OAuthProviderConfig::load(
                Provider::Outlook,
                base_url,
                &["openid", "profile", "email", "offline_access", "Mail.Read"],
            ),
            yahoo: OAuthProviderConfig::load(
                Provider::Yahoo,
                base_url,
                &["openid", "email", "profile"],
            ),
            // Apple forces form_post responses when scopes are requested, which
            // does not fit the GET callback route; identity comes from the
            // id_token instead
            apple: OAuthProviderConfig::load(Provider::Apple, base_url, &[]),
        }
    }

    /// Configuration for one provider
    #[must_use]
    pub const fn get(&self, provider: Provider) -> &OAuthProviderConfig {
        match provider {
            Provider::Google => &self.google,
            Provider::Outlook => &self.outlook,
            Provider::Yahoo => &self.yahoo,
            Provider::Apple => &self.apple,
        }
    }

    /// Providers with client credentials present
    #[must_use]
    pub fn enabled_providers(&self) -> Vec<Provider> {
        Provider::ALL
            .iter()
            .copied()
            .filter(|p| self.get(*p).enabled)
            .collect()
    }
}

/// OAuth provider-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OAuthProviderConfig {
    /// OAuth client ID
    pub client_id: Option<String>,
    /// OAuth client secret (never leaves the server)
    pub client_secret: Option<String>,
    /// OAuth redirect URI
    pub redirect_uri: String,
    /// OAuth scopes
    pub scopes: Vec<String>,
    /// Whether this provider can be initiated; derived from client ID presence
    pub enabled: bool,
}

impl OAuthProviderConfig {
    /// Load one provider's credentials from `{PROVIDER}_CLIENT_ID`,
    /// `{PROVIDER}_CLIENT_SECRET`, and `{PROVIDER}_REDIRECT_URI`.
    fn load(provider: Provider, base_url: &str, scopes: &[&str]) -> Self {
        let prefix = provider.as_str().to_uppercase();
        let client_id = env::var(format!("{prefix}_CLIENT_ID"))
            .ok()
            .filter(|v| !v.is_empty());
        let client_secret = env::var(format!("{prefix}_CLIENT_SECRET"))
            .ok()
            .filter(|v| !v.is_empty());
        let redirect_uri = env::var(format!("{prefix}_REDIRECT_URI")).unwrap_or_else(|_| {
            format!("{base_url}/auth/{}/callback", provider.as_str())
        });

        let enabled = client_id.is_some();
        if enabled && client_secret.is_none() {
            warn!(
                "OAuth provider {} has a client ID but no client secret; code exchange will fail",
                provider.as_str()
            );
        }
        if !enabled {
            info!("OAuth provider {} is not configured", provider.as_str());
        }

        Self {
            client_id,
            client_secret,
            redirect_uri,
            scopes: scopes.iter().map(|s| (*s).to_owned()).collect(),
            enabled,
        }
    }

    /// SHA-256 fingerprint of the client secret (first 8 hex chars), for
    /// comparing configured secrets in diagnostics without logging values.
    #[must_use]
    pub fn secret_fingerprint(&self) -> Option<String> {
        self.client_secret.as_ref().map(|secret| {
            let mut hasher = Sha256::new();
            hasher.update(secret.as_bytes());
            let result = hasher.finalize();
            format!("{result:x}").chars().take(8).collect()
        })
    }

    /// Space-separated scope string for authorization URLs
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}
