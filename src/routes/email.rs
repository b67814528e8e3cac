// ABOUTME: Transactional email relay route handler
// ABOUTME: Always answers HTTP 200; delivery failures surface as a skipped outcome
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

use crate::context::ServerResources;
use crate::email::EmailOutcome;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

/// Body of `POST /email/send`
#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Email routes implementation
pub struct EmailRoutes;

impl EmailRoutes {
    /// Create the email relay route
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/email/send", post(send_handler))
            .with_state(resources)
    }
}

async fn send_handler(
    State(resources): State<Arc<ServerResources>>,
    Json(request): Json<SendEmailRequest>,
) -> Json<EmailOutcome> {
    Json(
        resources
            .email
            .send(&request.to, &request.subject, &request.html)
            .await,
    )
}
