// ABOUTME: OAuth flow orchestration across initiate, callback, complete, and refresh
// ABOUTME: Owns redirect construction so the browser always lands back on the front-end
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

//! # OAuth Flow Orchestration
//!
//! The manager ties the provider registry, pending-authorization store, token
//! cipher, and handoff minting together into the four flow operations. The
//! callback path has one unusual contract: it never surfaces an error to the
//! caller. The browser arriving there is mid-navigation with no page to render
//! an error into, so every failure becomes a redirect back to the front-end
//! with a machine-readable reason.

use super::state::PendingAuthStore;
use super::{OAuthError, Provider, ProviderRegistry, TokenData, UserInfo};
use crate::crypto::TokenCipher;
use crate::handoff::{HandoffManager, HandoffValidationError};
use std::sync::Arc;
use tracing::{info, warn};

/// Fully verified result of `POST /auth/complete`
#[derive(Debug, Clone)]
pub struct CompletedConnection {
    pub provider: Provider,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub tokens: TokenData,
}

/// Failure modes of the complete operation, kept distinct so the transport
/// layer can tell "restart the flow" apart from "reject the caller"
#[derive(Debug, thiserror::Error)]
pub enum CompleteError {
    #[error(transparent)]
    Credential(#[from] HandoffValidationError),

    /// Credential verified but the embedded token bundle would not decrypt;
    /// treated as an authentication failure, not a server error
    #[error("Token bundle decryption failed")]
    BundleUndecryptable,
}

/// Central OAuth flow orchestrator
pub struct OAuthManager {
    registry: ProviderRegistry,
    store: Arc<dyn PendingAuthStore>,
    cipher: Arc<TokenCipher>,
    handoff: Arc<HandoffManager>,
    frontend_url: String,
}

impl OAuthManager {
    #[must_use]
    pub fn new(
        registry: ProviderRegistry,
        store: Arc<dyn PendingAuthStore>,
        cipher: Arc<TokenCipher>,
        handoff: Arc<HandoffManager>,
        frontend_url: String,
    ) -> Self {
        Self {
            registry,
            store,
            cipher,
            handoff,
            frontend_url: frontend_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Access the provider registry, for the directory listing
    #[must_use]
    pub const fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Begin the connection flow: record a pending authorization and return
    /// the provider authorization URL to redirect the user to.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::NotConfigured`] when the provider has no client
    /// credentials, and a store error if the pending authorization cannot be
    /// recorded.
    pub async fn initiate(
        &self,
        provider: Provider,
        return_location: Option<String>,
    ) -> Result<String, OAuthError> {
        let implementation = self
            .registry
            .get(provider)
            .ok_or_else(|| OAuthError::NotConfigured(provider.to_string()))?;

        let return_location =
            return_location.unwrap_or_else(|| crate::constants::defaults::RETURN_LOCATION.to_owned());
        let state_token = self.store.create(provider, return_location).await?;

        info!("Initiated {provider} connection flow");
        Ok(implementation.auth_url(&state_token))
    }

    /// Handle the provider callback. Always returns a redirect URL; failures
    /// are encoded as `error=<reason>` on the front-end return location.
    ///
    /// `provider_error` is the `error` query parameter some providers attach
    /// when the user denies consent; it short-circuits the flow without
    /// consuming the state token.
    pub async fn handle_callback(
        &self,
        provider: Provider,
        code: &str,
        state: &str,
        provider_error: Option<&str>,
    ) -> String {
        if let Some(reported) = provider_error {
            warn!("{provider} callback reported an upstream error: {reported}");
            return self.error_redirect(
                defaults_return(),
                provider,
                &urlencoding::encode(reported),
            );
        }

        let pending = match self.store.consume(state).await {
            Ok(Some(pending)) => pending,
            Ok(None) => {
                warn!("Callback for {provider} presented an unknown or expired state token");
                return self.error_redirect(defaults_return(), provider, "invalid_state");
            }
            Err(e) => {
                warn!("State store failure during {provider} callback: {e}");
                return self.error_redirect(defaults_return(), provider, "invalid_state");
            }
        };

        let return_location = pending.return_location.clone();

        // A state minted for one provider is not honored on another's
        // callback route, even when the token itself is genuine
        if pending.provider != provider {
            warn!(
                "State token minted for {} presented on {provider} callback",
                pending.provider
            );
            return self.error_redirect(&return_location, provider, "provider_mismatch");
        }

        let Some(implementation) = self.registry.get(provider) else {
            warn!("Callback for unconfigured provider {provider}");
            return self.error_redirect(&return_location, provider, "provider_not_configured");
        };

        let exchange = match implementation.exchange_code(code).await {
            Ok(exchange) => exchange,
            Err(e) => {
                warn!("Code exchange with {provider} failed: {e}");
                return self.error_redirect(&return_location, provider, "token_exchange_failed");
            }
        };

        let user_info = match exchange.user_info {
            Some(info) => info,
            None => match implementation.fetch_user_info(&exchange.tokens.access_token).await {
                Ok(info) => info,
                Err(e) => {
                    warn!("User info fetch from {provider} failed: {e}");
                    return self.error_redirect(&return_location, provider, "userinfo_failed");
                }
            },
        };

        match self.mint_handoff(provider, &exchange.tokens, &user_info) {
            Ok(credential) => {
                info!("Completed {provider} callback for connected account");
                self.success_redirect(&return_location, provider, &credential)
            }
            Err(e) => {
                warn!("Handoff credential minting failed for {provider}: {e}");
                self.error_redirect(&return_location, provider, "internal_error")
            }
        }
    }

    /// Verify a handoff credential and unseal the token bundle.
    ///
    /// # Errors
    ///
    /// Returns [`CompleteError::Credential`] for expired, tampered, or
    /// malformed credentials and [`CompleteError::BundleUndecryptable`] when
    /// the embedded bundle does not decrypt (key rotation, tampering).
    pub fn complete(&self, auth_token: &str) -> Result<CompletedConnection, CompleteError> {
        let claims = self.handoff.verify(auth_token)?;

        let tokens: TokenData = self
            .cipher
            .decrypt_object(&claims.tokens)
            .map_err(|e| {
                warn!("Sealed token bundle failed to decrypt: {e}");
                CompleteError::BundleUndecryptable
            })?;

        info!("Completed {} connection for handoff {}", claims.provider, claims.jti);
        Ok(CompletedConnection {
            provider: claims.provider,
            email: claims.email,
            name: claims.name,
            picture: claims.picture,
            tokens,
        })
    }

    /// Exchange a refresh token for fresh access credentials.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::NotConfigured`] for unconfigured providers and
    /// [`OAuthError::TokenRefreshFailed`] when the upstream exchange fails.
    pub async fn refresh(
        &self,
        provider: Provider,
        refresh_token: &str,
    ) -> Result<TokenData, OAuthError> {
        let implementation = self
            .registry
            .get(provider)
            .ok_or_else(|| OAuthError::NotConfigured(provider.to_string()))?;

        let tokens = implementation.refresh_token(refresh_token).await?;
        info!("Refreshed {provider} access token");
        Ok(tokens)
    }

    fn mint_handoff(
        &self,
        provider: Provider,
        tokens: &TokenData,
        user_info: &UserInfo,
    ) -> anyhow::Result<String> {
        let sealed = self.cipher.encrypt_object(tokens)?;
        self.handoff.mint(
            provider,
            &user_info.email,
            user_info.name.clone(),
            user_info.picture.clone(),
            sealed,
        )
    }

    fn success_redirect(&self, return_location: &str, provider: Provider, credential: &str) -> String {
        format!(
            "{}{return_location}{}auth_token={}&provider={provider}",
            self.frontend_url,
            query_joiner(return_location),
            urlencoding::encode(credential),
        )
    }

    fn error_redirect(&self, return_location: &str, provider: Provider, reason: &str) -> String {
        format!(
            "{}{return_location}{}error={reason}&provider={provider}",
            self.frontend_url,
            query_joiner(return_location),
        )
    }
}

/// `?` for bare paths, `&` when the return location already carries a query
const fn query_joiner(location: &str) -> char {
    let bytes = location.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'?' {
            return '&';
        }
        i += 1;
    }
    '?'
}

fn defaults_return() -> &'static str {
    crate::constants::defaults::RETURN_LOCATION
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff::generate_signing_secret;
    use crate::oauth::state::InMemoryStateStore;
    use crate::oauth::{CodeExchange, OAuthProvider};
    use chrono::Utc;

    struct FakeProvider {
        provider: Provider,
        fail_exchange: bool,
    }

    #[async_trait::async_trait]
    impl OAuthProvider for FakeProvider {
        fn provider(&self) -> Provider {
            self.provider
        }

        fn auth_url(&self, state: &str) -> String {
            format!("https://provider.test/authorize?state={state}")
        }

        async fn exchange_code(&self, _code: &str) -> Result<CodeExchange, OAuthError> {
            if self.fail_exchange {
                return Err(OAuthError::TokenExchangeFailed("upstream said no".into()));
            }
            Ok(CodeExchange {
                tokens: TokenData {
                    access_token: "access-123".to_owned(),
                    refresh_token: "refresh-456".to_owned(),
                    expires_at: Utc::now() + chrono::Duration::hours(1),
                },
                user_info: None,
            })
        }

        async fn fetch_user_info(&self, _access_token: &str) -> Result<UserInfo, OAuthError> {
            Ok(UserInfo {
                email: "user@example.com".to_owned(),
                name: Some("Example User".to_owned()),
                picture: None,
            })
        }

        async fn refresh_token(&self, _refresh_token: &str) -> Result<TokenData, OAuthError> {
            Ok(TokenData {
                access_token: "fresh-access".to_owned(),
                refresh_token: "fresh-refresh".to_owned(),
                expires_at: Utc::now() + chrono::Duration::hours(1),
            })
        }
    }

    fn manager_with(provider: Provider, fail_exchange: bool) -> OAuthManager {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(FakeProvider {
            provider,
            fail_exchange,
        }));
        OAuthManager::new(
            registry,
            Arc::new(InMemoryStateStore::new()),
            Arc::new(TokenCipher::from_bytes([3u8; 32])),
            Arc::new(HandoffManager::new(generate_signing_secret().to_vec())),
            "http://localhost:5173".to_owned(),
        )
    }

    fn state_from_auth_url(url: &str) -> String {
        url.split("state=").nth(1).unwrap().to_owned()
    }

    #[tokio::test]
    async fn test_initiate_requires_configuration() {
        let manager = manager_with(Provider::Google, false);
        let err = manager.initiate(Provider::Yahoo, None).await.unwrap_err();
        assert!(matches!(err, OAuthError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_full_flow_round_trip() {
        let manager = manager_with(Provider::Google, false);
        let auth_url = manager
            .initiate(Provider::Google, Some("/settings".to_owned()))
            .await
            .unwrap();
        let state = state_from_auth_url(&auth_url);

        let redirect = manager.handle_callback(Provider::Google, "code-abc", &state, None).await;
        assert!(redirect.starts_with("http://localhost:5173/settings?auth_token="));
        assert!(redirect.ends_with("&provider=google"));
        assert!(!redirect.contains("access-123"), "raw tokens must not leak");

        let credential = redirect
            .split("auth_token=")
            .nth(1)
            .and_then(|rest| rest.split('&').next())
            .map(|c| urlencoding::decode(c).unwrap().into_owned())
            .unwrap();
        let connection = manager.complete(&credential).unwrap();
        assert_eq!(connection.provider, Provider::Google);
        assert_eq!(connection.email, "user@example.com");
        assert_eq!(connection.tokens.access_token, "access-123");
        assert_eq!(connection.tokens.refresh_token, "refresh-456");
    }

    #[tokio::test]
    async fn test_unknown_state_redirects_with_invalid_state() {
        let manager = manager_with(Provider::Google, false);
        let redirect = manager
            .handle_callback(Provider::Google, "code", "never-issued", None)
            .await;
        assert!(redirect.contains("error=invalid_state"));
        assert!(redirect.contains("provider=google"));
    }

    #[tokio::test]
    async fn test_state_replay_fails_second_time() {
        let manager = manager_with(Provider::Google, false);
        let auth_url = manager.initiate(Provider::Google, None).await.unwrap();
        let state = state_from_auth_url(&auth_url);

        let first = manager.handle_callback(Provider::Google, "code", &state, None).await;
        assert!(first.contains("auth_token="));
        let second = manager.handle_callback(Provider::Google, "code", &state, None).await;
        assert!(second.contains("error=invalid_state"));
    }

    #[tokio::test]
    async fn test_provider_mismatch() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(FakeProvider {
            provider: Provider::Google,
            fail_exchange: false,
        }));
        registry.register(Box::new(FakeProvider {
            provider: Provider::Yahoo,
            fail_exchange: false,
        }));
        let manager = OAuthManager::new(
            registry,
            Arc::new(InMemoryStateStore::new()),
            Arc::new(TokenCipher::from_bytes([3u8; 32])),
            Arc::new(HandoffManager::new(generate_signing_secret().to_vec())),
            "http://localhost:5173".to_owned(),
        );

        let auth_url = manager.initiate(Provider::Google, None).await.unwrap();
        let state = state_from_auth_url(&auth_url);

        let redirect = manager.handle_callback(Provider::Yahoo, "code", &state, None).await;
        assert!(redirect.contains("error=provider_mismatch"));
        assert!(redirect.contains("provider=yahoo"));
    }

    #[tokio::test]
    async fn test_provider_reported_error_preserves_state() {
        let manager = manager_with(Provider::Google, false);
        let auth_url = manager.initiate(Provider::Google, None).await.unwrap();
        let state = state_from_auth_url(&auth_url);

        let redirect = manager
            .handle_callback(Provider::Google, "", &state, Some("access_denied"))
            .await;
        assert!(redirect.contains("error=access_denied"));

        // The denial did not consume the state token
        let retry = manager.handle_callback(Provider::Google, "code", &state, None).await;
        assert!(retry.contains("auth_token="));
    }

    #[tokio::test]
    async fn test_exchange_failure_redirects() {
        let manager = manager_with(Provider::Outlook, true);
        let auth_url = manager.initiate(Provider::Outlook, None).await.unwrap();
        let state = state_from_auth_url(&auth_url);

        let redirect = manager.handle_callback(Provider::Outlook, "code", &state, None).await;
        assert!(redirect.contains("error=token_exchange_failed"));
    }

    #[tokio::test]
    async fn test_return_location_with_existing_query() {
        let manager = manager_with(Provider::Google, false);
        let auth_url = manager
            .initiate(Provider::Google, Some("/inbox?tab=accounts".to_owned()))
            .await
            .unwrap();
        let state = state_from_auth_url(&auth_url);

        let redirect = manager.handle_callback(Provider::Google, "code", &state, None).await;
        assert!(redirect.starts_with("http://localhost:5173/inbox?tab=accounts&auth_token="));
    }

    #[tokio::test]
    async fn test_refresh_delegates_to_provider() {
        let manager = manager_with(Provider::Google, false);
        let tokens = manager.refresh(Provider::Google, "refresh-456").await.unwrap();
        assert_eq!(tokens.access_token, "fresh-access");
    }

    #[test]
    fn test_complete_rejects_garbage() {
        let manager = manager_with(Provider::Google, false);
        assert!(matches!(
            manager.complete("garbage"),
            Err(CompleteError::Credential(_))
        ));
    }

    #[test]
    fn test_query_joiner() {
        assert_eq!(query_joiner("/settings"), '?');
        assert_eq!(query_joiner("/inbox?tab=accounts"), '&');
    }
}
