// ABOUTME: OAuth provider implementations for Google, Outlook, Yahoo, and Apple
// ABOUTME: Normalizes heterogeneous authorize/token/userinfo dialects behind one trait
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

//! # OAuth Provider Implementations
//!
//! One implementation per identity provider. Dialect differences handled here:
//! Google wants `access_type=offline&prompt=consent` to hand out refresh
//! tokens, Yahoo authenticates the token call with HTTP Basic, Apple has no
//! userinfo endpoint and reports identity inside the exchange's `id_token`.

use super::{CodeExchange, OAuthError, OAuthProvider, Provider, TokenData, UserInfo};
use crate::config::oauth::{OAuthConfig, OAuthProviderConfig};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use tracing::debug;

/// Token response shape shared by all four providers
#[derive(Debug, Deserialize)]
struct ProviderTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
    id_token: Option<String>,
}

impl ProviderTokenResponse {
    fn into_token_data(self, previous_refresh_token: Option<&str>) -> TokenData {
        TokenData {
            access_token: self.access_token,
            // Refresh responses routinely omit the refresh token; keep the old one
            refresh_token: self
                .refresh_token
                .or_else(|| previous_refresh_token.map(ToOwned::to_owned))
                .unwrap_or_default(),
            expires_at: chrono::Utc::now() + chrono::Duration::seconds(self.expires_in),
        }
    }
}

/// Common credentials every provider implementation carries
struct ProviderCredentials {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scopes: String,
}

impl ProviderCredentials {
    fn from_config(provider: Provider, config: &OAuthProviderConfig) -> Result<Self, OAuthError> {
        let client_id = config.client_id.clone().ok_or_else(|| {
            OAuthError::ConfigurationError(format!("{provider}: client ID not set"))
        })?;
        let client_secret = config.client_secret.clone().ok_or_else(|| {
            OAuthError::ConfigurationError(format!("{provider}: client secret not set"))
        })?;
        Ok(Self {
            client_id,
            client_secret,
            redirect_uri: config.redirect_uri.clone(),
            scopes: config.scope_string(),
        })
    }
}

async fn post_token_form(
    url: &str,
    params: &[(&str, &str)],
    basic_auth: Option<&ProviderCredentials>,
) -> Result<ProviderTokenResponse, OAuthError> {
    let client = reqwest::Client::new();
    let mut request = client.post(url).form(params);

    if let Some(creds) = basic_auth {
        let header = general_purpose::STANDARD
            .encode(format!("{}:{}", creds.client_id, creds.client_secret));
        request = request.header("Authorization", format!("Basic {header}"));
    }

    let response = request
        .send()
        .await
        .map_err(|e| OAuthError::TokenExchangeFailed(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| OAuthError::TokenExchangeFailed(e.to_string()))?;

    if !status.is_success() {
        return Err(OAuthError::TokenExchangeFailed(format!(
            "HTTP {status}: {body}"
        )));
    }

    serde_json::from_str(&body)
        .map_err(|e| OAuthError::TokenExchangeFailed(format!("Parse error: {e}")))
}

/// Decode the payload segment of a JWT without verifying it. Only used for
/// Apple's `id_token`, which arrives directly from Apple over the TLS
/// server-to-server exchange.
fn decode_id_token_identity(id_token: &str) -> Option<UserInfo> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = general_purpose::URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let email = claims.get("email")?.as_str()?.to_owned();
    Some(UserInfo {
        email,
        name: claims
            .get("name")
            .and_then(|v| v.as_str())
            .map(ToOwned::to_owned),
        picture: None,
    })
}

// ============================================================================
// Google
// ============================================================================

/// Google OAuth provider
pub struct GoogleOAuthProvider {
    creds: ProviderCredentials,
}

impl GoogleOAuthProvider {
    /// # Errors
    /// Returns a configuration error when client credentials are missing
    pub fn new(config: &OAuthProviderConfig) -> Result<Self, OAuthError> {
        Ok(Self {
            creds: ProviderCredentials::from_config(Provider::Google, config)?,
        })
    }
}

#[async_trait::async_trait]
impl OAuthProvider for GoogleOAuthProvider {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn auth_url(&self, state: &str) -> String {
        format!(
            "https://accounts.google.com/o/oauth2/v2/auth?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&access_type=offline&prompt=consent",
            urlencoding::encode(&self.creds.client_id),
            urlencoding::encode(&self.creds.redirect_uri),
            urlencoding::encode(&self.creds.scopes),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<CodeExchange, OAuthError> {
        let params = [
            ("client_id", self.creds.client_id.as_str()),
            ("client_secret", self.creds.client_secret.as_str()),
            ("redirect_uri", self.creds.redirect_uri.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ];
        let response =
            post_token_form("https://oauth2.googleapis.com/token", &params, None).await?;

        Ok(CodeExchange {
            tokens: response.into_token_data(None),
            user_info: None,
        })
    }

    async fn fetch_user_info(&self, access_token: &str) -> Result<UserInfo, OAuthError> {
        #[derive(Deserialize)]
        struct GoogleUserInfo {
            email: String,
            name: Option<String>,
            picture: Option<String>,
        }

        let client = reqwest::Client::new();
        let response = client
            .get("https://www.googleapis.com/oauth2/v2/userinfo")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OAuthError::UserInfoFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OAuthError::UserInfoFailed(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let info: GoogleUserInfo = response
            .json()
            .await
            .map_err(|e| OAuthError::UserInfoFailed(format!("Parse error: {e}")))?;
        Ok(UserInfo {
            email: info.email,
            name: info.name,
            picture: info.picture,
        })
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenData, OAuthError> {
        let params = [
            ("client_id", self.creds.client_id.as_str()),
            ("client_secret", self.creds.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let response = post_token_form("https://oauth2.googleapis.com/token", &params, None)
            .await
            .map_err(|e| OAuthError::TokenRefreshFailed(e.to_string()))?;
        Ok(response.into_token_data(Some(refresh_token)))
    }
}

// ============================================================================
// Outlook (Microsoft identity platform)
// ============================================================================

/// Microsoft/Outlook OAuth provider
pub struct OutlookOAuthProvider {
    creds: ProviderCredentials,
}

impl OutlookOAuthProvider {
    /// # Errors
    /// Returns a configuration error when client credentials are missing
    pub fn new(config: &OAuthProviderConfig) -> Result<Self, OAuthError> {
        Ok(Self {
            creds: ProviderCredentials::from_config(Provider::Outlook, config)?,
        })
    }
}

#[async_trait::async_trait]
impl OAuthProvider for OutlookOAuthProvider {
    fn provider(&self) -> Provider {
        Provider::Outlook
    }

    fn auth_url(&self, state: &str) -> String {
        format!(
            "https://login.microsoftonline.com/common/oauth2/v2.0/authorize?client_id={}&redirect_uri={}&response_type=code&response_mode=query&scope={}&state={}",
            urlencoding::encode(&self.creds.client_id),
            urlencoding::encode(&self.creds.redirect_uri),
            urlencoding::encode(&self.creds.scopes),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<CodeExchange, OAuthError> {
        let params = [
            ("client_id", self.creds.client_id.as_str()),
            ("client_secret", self.creds.client_secret.as_str()),
            ("redirect_uri", self.creds.redirect_uri.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("scope", self.creds.scopes.as_str()),
        ];
        let response = post_token_form(
            "https://login.microsoftonline.com/common/oauth2/v2.0/token",
            &params,
            None,
        )
        .await?;

        Ok(CodeExchange {
            tokens: response.into_token_data(None),
            user_info: None,
        })
    }

    async fn fetch_user_info(&self, access_token: &str) -> Result<UserInfo, OAuthError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct GraphUser {
            mail: Option<String>,
            user_principal_name: Option<String>,
            display_name: Option<String>,
        }

        let client = reqwest::Client::new();
        let response = client
            .get("https://graph.microsoft.com/v1.0/me")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OAuthError::UserInfoFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OAuthError::UserInfoFailed(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let user: GraphUser = response
            .json()
            .await
            .map_err(|e| OAuthError::UserInfoFailed(format!("Parse error: {e}")))?;

        // Graph reports mailbox address in `mail` for licensed accounts and
        // only the UPN otherwise
        let email = user
            .mail
            .or(user.user_principal_name)
            .ok_or_else(|| OAuthError::UserInfoFailed("No email in Graph profile".to_owned()))?;

        Ok(UserInfo {
            email,
            name: user.display_name,
            picture: None,
        })
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenData, OAuthError> {
        let params = [
            ("client_id", self.creds.client_id.as_str()),
            ("client_secret", self.creds.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
            ("scope", self.creds.scopes.as_str()),
        ];
        let response = post_token_form(
            "https://login.microsoftonline.com/common/oauth2/v2.0/token",
            &params,
            None,
        )
        .await
        .map_err(|e| OAuthError::TokenRefreshFailed(e.to_string()))?;
        Ok(response.into_token_data(Some(refresh_token)))
    }
}

// ============================================================================
// Yahoo
// ============================================================================

/// Yahoo OAuth provider
pub struct YahooOAuthProvider {
    creds: ProviderCredentials,
}

impl YahooOAuthProvider {
    /// # Errors
    /// Returns a configuration error when client credentials are missing
    pub fn new(config: &OAuthProviderConfig) -> Result<Self, OAuthError> {
        Ok(Self {
            creds: ProviderCredentials::from_config(Provider::Yahoo, config)?,
        })
    }
}

#[async_trait::async_trait]
impl OAuthProvider for YahooOAuthProvider {
    fn provider(&self) -> Provider {
        Provider::Yahoo
    }

    fn auth_url(&self, state: &str) -> String {
        format!(
            "https://api.login.yahoo.com/oauth2/request_auth?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            urlencoding::encode(&self.creds.client_id),
            urlencoding::encode(&self.creds.redirect_uri),
            urlencoding::encode(&self.creds.scopes),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<CodeExchange, OAuthError> {
        // Yahoo authenticates the client with HTTP Basic, not body params
        let params = [
            ("redirect_uri", self.creds.redirect_uri.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ];
        let response = post_token_form(
            "https://api.login.yahoo.com/oauth2/get_token",
            &params,
            Some(&self.creds),
        )
        .await?;

        Ok(CodeExchange {
            tokens: response.into_token_data(None),
            user_info: None,
        })
    }

    async fn fetch_user_info(&self, access_token: &str) -> Result<UserInfo, OAuthError> {
        #[derive(Deserialize)]
        struct YahooUserInfo {
            email: String,
            name: Option<String>,
            picture: Option<String>,
        }

        let client = reqwest::Client::new();
        let response = client
            .get("https://api.login.yahoo.com/openid/v1/userinfo")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OAuthError::UserInfoFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OAuthError::UserInfoFailed(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let info: YahooUserInfo = response
            .json()
            .await
            .map_err(|e| OAuthError::UserInfoFailed(format!("Parse error: {e}")))?;
        Ok(UserInfo {
            email: info.email,
            name: info.name,
            picture: info.picture,
        })
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenData, OAuthError> {
        let params = [
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
            ("redirect_uri", self.creds.redirect_uri.as_str()),
        ];
        let response = post_token_form(
            "https://api.login.yahoo.com/oauth2/get_token",
            &params,
            Some(&self.creds),
        )
        .await
        .map_err(|e| OAuthError::TokenRefreshFailed(e.to_string()))?;
        Ok(response.into_token_data(Some(refresh_token)))
    }
}

// ============================================================================
// Apple
// ============================================================================

/// Apple OAuth provider.
///
/// Sign in with Apple has no userinfo endpoint; identity comes from the
/// `id_token` in the code-exchange response. The authorization URL omits the
/// scope parameter so the response arrives in query mode on our GET callback
/// (Apple forces `form_post` whenever scopes are requested).
pub struct AppleOAuthProvider {
    creds: ProviderCredentials,
}

impl AppleOAuthProvider {
    /// # Errors
    /// Returns a configuration error when client credentials are missing
    pub fn new(config: &OAuthProviderConfig) -> Result<Self, OAuthError> {
        Ok(Self {
            creds: ProviderCredentials::from_config(Provider::Apple, config)?,
        })
    }
}

#[async_trait::async_trait]
impl OAuthProvider for AppleOAuthProvider {
    fn provider(&self) -> Provider {
        Provider::Apple
    }

    fn auth_url(&self, state: &str) -> String {
        format!(
            "https://appleid.apple.com/auth/authorize?client_id={}&redirect_uri={}&response_type=code&state={}",
            urlencoding::encode(&self.creds.client_id),
            urlencoding::encode(&self.creds.redirect_uri),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<CodeExchange, OAuthError> {
        let params = [
            ("client_id", self.creds.client_id.as_str()),
            ("client_secret", self.creds.client_secret.as_str()),
            ("redirect_uri", self.creds.redirect_uri.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ];
        let response =
            post_token_form("https://appleid.apple.com/auth/token", &params, None).await?;

        let user_info = response
            .id_token
            .as_deref()
            .and_then(decode_id_token_identity);
        if user_info.is_none() {
            debug!("Apple exchange returned no decodable id_token identity");
        }

        Ok(CodeExchange {
            tokens: response.into_token_data(None),
            user_info,
        })
    }

    async fn fetch_user_info(&self, _access_token: &str) -> Result<UserInfo, OAuthError> {
        Err(OAuthError::UserInfoFailed(
            "Apple does not expose a userinfo endpoint".to_owned(),
        ))
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenData, OAuthError> {
        let params = [
            ("client_id", self.creds.client_id.as_str()),
            ("client_secret", self.creds.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let response = post_token_form("https://appleid.apple.com/auth/token", &params, None)
            .await
            .map_err(|e| OAuthError::TokenRefreshFailed(e.to_string()))?;
        Ok(response.into_token_data(Some(refresh_token)))
    }
}

// ============================================================================
// Registry construction
// ============================================================================

/// Build the provider registry from configuration; only providers with both
/// a client ID and secret get registered.
#[must_use]
pub fn registry_from_config(config: &OAuthConfig) -> super::ProviderRegistry {
    let mut registry = super::ProviderRegistry::new();

    for provider in Provider::ALL {
        let provider_config = config.get(provider);
        if !provider_config.enabled {
            continue;
        }
        let implementation: Result<Box<dyn OAuthProvider>, OAuthError> = match provider {
            Provider::Google => {
                GoogleOAuthProvider::new(provider_config).map(|p| Box::new(p) as _)
            }
            Provider::Outlook => {
                OutlookOAuthProvider::new(provider_config).map(|p| Box::new(p) as _)
            }
            Provider::Yahoo => YahooOAuthProvider::new(provider_config).map(|p| Box::new(p) as _),
            Provider::Apple => AppleOAuthProvider::new(provider_config).map(|p| Box::new(p) as _),
        };
        match implementation {
            Ok(implementation) => registry.register(implementation),
            Err(e) => tracing::warn!("Skipping provider {provider}: {e}"),
        }
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::oauth::OAuthProviderConfig;

    fn config_with_credentials() -> OAuthProviderConfig {
        OAuthProviderConfig {
            client_id: Some("client-id".to_owned()),
            client_secret: Some("client-secret".to_owned()),
            redirect_uri: "http://localhost:8787/auth/google/callback".to_owned(),
            scopes: vec!["openid".to_owned(), "email".to_owned()],
            enabled: true,
        }
    }

    #[test]
    fn test_auth_url_embeds_state() {
        let provider = GoogleOAuthProvider::new(&config_with_credentials()).unwrap();
        let url = provider.auth_url("state-token-123");
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("state=state-token-123"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("scope=openid%20email"));
    }

    #[test]
    fn test_missing_secret_is_config_error() {
        let config = OAuthProviderConfig {
            client_secret: None,
            ..config_with_credentials()
        };
        assert!(matches!(
            GoogleOAuthProvider::new(&config),
            Err(OAuthError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_id_token_identity_decoding() {
        use base64::engine::general_purpose;
        use base64::Engine;
        let payload =
            general_purpose::URL_SAFE_NO_PAD.encode(r#"{"email":"user@icloud.com","sub":"001"}"#);
        let id_token = format!("header.{payload}.signature");
        let info = decode_id_token_identity(&id_token).unwrap();
        assert_eq!(info.email, "user@icloud.com");
        assert!(info.name.is_none());
    }

    #[test]
    fn test_refresh_keeps_previous_refresh_token() {
        let response = ProviderTokenResponse {
            access_token: "new-access".to_owned(),
            refresh_token: None,
            expires_in: 3600,
            id_token: None,
        };
        let tokens = response.into_token_data(Some("old-refresh"));
        assert_eq!(tokens.refresh_token, "old-refresh");
    }
}
