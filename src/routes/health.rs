// ABOUTME: Health check route handlers for service monitoring and status endpoints
// ABOUTME: Readiness reports the active state-store backend and configured provider count
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

//! Health check routes for service monitoring.
//!
//! `/health` is pure liveness. `/ready` describes what this relay instance
//! actually came up with: which pending-authorization backend is in use and
//! how many providers have credentials. Bootstrap fails fast on an
//! unreachable Redis, so a serving instance reporting `redis` is connected.

use crate::constants::service_names;
use crate::context::ServerResources;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

/// Readiness snapshot of this relay instance
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    pub status: &'static str,
    /// Pending-authorization backend the instance booted with
    pub state_store: &'static str,
    /// How many providers have client credentials configured
    pub enabled_providers: usize,
    pub timestamp: String,
}

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create all health check routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/ready", get(ready_handler))
            .with_state(resources)
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": service_names::RELAY,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn ready_handler(State(resources): State<Arc<ServerResources>>) -> Json<ReadyResponse> {
    let enabled_providers = resources
        .oauth
        .registry()
        .directory()
        .iter()
        .filter(|entry| entry.enabled)
        .count();

    Json(ReadyResponse {
        status: "ready",
        state_store: if resources.config.redis_url.is_some() {
            "redis"
        } else {
            "memory"
        },
        enabled_providers,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
