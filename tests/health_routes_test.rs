// ABOUTME: Integration tests for the health and readiness endpoints
// ABOUTME: Verifies liveness plus the backend and provider details in the readiness report
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use axum::body::Body;
use common::{test_config, test_resources};
use flowsphere_relay::routes::build_router;
use http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

async fn get_json(uri: &str) -> Value {
    let router = build_router(test_resources(test_config()));
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let body = get_json("/health").await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "flowsphere-relay");
    assert!(body["version"].is_string());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_ready_reports_backend_and_providers() {
    // Test resources run without Redis and with one scripted provider
    let body = get_json("/ready").await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["stateStore"], "memory");
    assert_eq!(body["enabledProviders"], 1);
    assert!(body["timestamp"].is_string());
}
