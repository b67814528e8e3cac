// ABOUTME: OAuth route handlers for the connect, callback, complete, and refresh endpoints
// ABOUTME: Thin axum wrappers delegating flow logic to the OAuth orchestrator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

//! OAuth routes.
//!
//! The callback handler is deliberately infallible: the browser arriving
//! there is mid-navigation, so every outcome is a redirect. The JSON
//! endpoints (`complete`, `refresh`) use the standard `{error, message}`
//! error body.

use crate::constants::defaults;
use crate::context::ServerResources;
use crate::errors::AppError;
use crate::handoff::HandoffValidationError;
use crate::oauth::manager::CompleteError;
use crate::oauth::{OAuthError, Provider, ProviderSummary, TokenData};
use crate::rate_limiting::{rate_limit_middleware, RateLimiter};
use axum::extract::{Path, Query, State};
use axum::middleware::from_fn_with_state;
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Provider directory response
#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    pub providers: Vec<ProviderSummary>,
}

#[derive(Debug, Deserialize)]
pub struct InitiateQuery {
    /// Front-end location to return the user to after the flow completes
    pub redirect: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Provider-reported error, e.g. the user denied consent
    pub error: Option<String>,
}

/// Body of `POST /auth/complete`
#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub token: String,
}

/// Connected account returned to the client once the flow completes
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedAccount {
    pub id: String,
    pub provider: Provider,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub connected_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    pub success: bool,
    pub account: ConnectedAccount,
}

/// Body of `POST /auth/refresh`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub provider: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// OAuth routes implementation
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create all OAuth flow routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        let auth_limiter = Arc::new(RateLimiter::new(
            resources.config.rate_limits.auth_per_minute,
        ));

        // The literal /auth/providers route must win over /auth/:provider;
        // "providers" is not a provider id
        let initiation = Router::new()
            .route("/auth/:provider", get(initiate_handler))
            .layer(from_fn_with_state(auth_limiter, rate_limit_middleware));

        Router::new()
            .route("/auth/providers", get(list_providers_handler))
            .merge(initiation)
            .route("/auth/:provider/callback", get(callback_handler))
            .route("/auth/complete", post(complete_handler))
            .route("/auth/refresh", post(refresh_handler))
            .with_state(resources)
    }
}

fn parse_provider(raw: &str) -> Result<Provider, AppError> {
    raw.parse().map_err(|_| {
        AppError::invalid_provider(format!(
            "Provider must be one of: google, outlook, yahoo, apple (got '{raw}')"
        ))
    })
}

async fn list_providers_handler(
    State(resources): State<Arc<ServerResources>>,
) -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        providers: resources.oauth.registry().directory(),
    })
}

async fn initiate_handler(
    State(resources): State<Arc<ServerResources>>,
    Path(provider): Path<String>,
    Query(query): Query<InitiateQuery>,
) -> Result<Redirect, AppError> {
    let provider = parse_provider(&provider)?;

    let auth_url = resources
        .oauth
        .initiate(provider, query.redirect)
        .await
        .map_err(|e| match e {
            OAuthError::NotConfigured(p) => {
                AppError::provider_not_configured(format!("Provider '{p}' has no client credentials"))
            }
            other => AppError::internal(other.to_string()),
        })?;

    Ok(Redirect::temporary(&auth_url))
}

async fn callback_handler(
    State(resources): State<Arc<ServerResources>>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    let Ok(provider) = provider.parse::<Provider>() else {
        // Even a bad path segment resolves to a redirect here
        let target = format!(
            "{}{}?error=invalid_provider",
            resources.config.frontend_url.trim_end_matches('/'),
            defaults::RETURN_LOCATION,
        );
        return Redirect::temporary(&target);
    };

    let target = resources
        .oauth
        .handle_callback(
            provider,
            query.code.as_deref().unwrap_or_default(),
            query.state.as_deref().unwrap_or_default(),
            query.error.as_deref(),
        )
        .await;
    Redirect::temporary(&target)
}

async fn complete_handler(
    State(resources): State<Arc<ServerResources>>,
    Json(request): Json<CompleteRequest>,
) -> Result<Json<CompleteResponse>, AppError> {
    let connection = resources.oauth.complete(&request.token).map_err(|e| match e {
        CompleteError::Credential(HandoffValidationError::TokenExpired { .. }) => {
            AppError::auth_expired("Token expired - retry the connection")
        }
        CompleteError::Credential(HandoffValidationError::TokenMalformed { .. }) => {
            AppError::invalid_input("Malformed handoff credential")
        }
        CompleteError::Credential(HandoffValidationError::TokenInvalid { .. })
        | CompleteError::BundleUndecryptable => AppError::auth_invalid("Invalid token"),
    })?;

    let TokenData {
        access_token,
        refresh_token,
        expires_at,
    } = connection.tokens;

    Ok(Json(CompleteResponse {
        success: true,
        account: ConnectedAccount {
            id: Uuid::new_v4().to_string(),
            provider: connection.provider,
            email: connection.email,
            name: connection.name,
            picture: connection.picture,
            access_token,
            refresh_token,
            expires_at,
            is_active: true,
            connected_at: Utc::now(),
        },
    }))
}

async fn refresh_handler(
    State(resources): State<Arc<ServerResources>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, AppError> {
    let provider = parse_provider(&request.provider)?;
    if request.refresh_token.is_empty() {
        return Err(AppError::invalid_input("refreshToken must not be empty"));
    }

    let tokens = resources
        .oauth
        .refresh(provider, &request.refresh_token)
        .await
        .map_err(|e| match e {
            OAuthError::NotConfigured(p) => {
                AppError::provider_not_configured(format!("Provider '{p}' has no client credentials"))
            }
            OAuthError::TokenRefreshFailed(_) => {
                AppError::external_auth_failed("Provider rejected the refresh token")
            }
            other => AppError::internal(other.to_string()),
        })?;

    Ok(Json(RefreshResponse {
        success: true,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_at: tokens.expires_at,
    }))
}
