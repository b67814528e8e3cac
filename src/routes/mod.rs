// ABOUTME: Route module organization for the FlowSphere relay HTTP surface
// ABOUTME: Assembles domain routers, rate limiting, CORS, and request tracing into one app
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

//! Route modules for the relay HTTP surface.
//!
//! Each domain module contains route definitions and thin handler functions
//! that delegate to the orchestrator and relay layers.

/// OAuth connect/callback/complete/refresh routes
pub mod auth;
/// Transactional email relay route
pub mod email;
/// Health check and readiness routes
pub mod health;

pub use auth::AuthRoutes;
pub use email::EmailRoutes;
pub use health::HealthRoutes;

use crate::context::ServerResources;
use crate::middleware::setup_cors;
use crate::rate_limiting::{rate_limit_middleware, RateLimiter};
use axum::middleware::from_fn_with_state;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Assemble the full application router with its middleware stack
#[must_use]
pub fn build_router(resources: Arc<ServerResources>) -> Router {
    let global_limiter = Arc::new(RateLimiter::new(
        resources.config.rate_limits.global_per_minute,
    ));

    Router::new()
        .merge(AuthRoutes::routes(Arc::clone(&resources)))
        .merge(EmailRoutes::routes(Arc::clone(&resources)))
        .merge(HealthRoutes::routes(Arc::clone(&resources)))
        .layer(from_fn_with_state(global_limiter, rate_limit_middleware))
        .layer(setup_cors(&resources.config))
        .layer(TraceLayer::new_for_http())
}
