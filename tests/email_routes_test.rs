// ABOUTME: Integration tests for the email relay route
// ABOUTME: Verifies the always-200 contract and structured skipped outcomes
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
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(body: &Value) -> (StatusCode, Value) {
    let router = build_router(test_resources(test_config()));
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/email/send")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_unconfigured_relay_reports_skipped() {
    let (status, body) = send(&json!({
        "to": "user@example.com",
        "subject": "Welcome",
        "html": "<p>Hello</p>"
    }))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["skipped"], true);
    assert_eq!(body["reason"], "Email relay not configured");
}

#[tokio::test]
async fn test_invalid_recipient_reports_skipped() {
    let (status, body) = send(&json!({
        "to": "not-an-address",
        "subject": "Welcome",
        "html": "<p>Hello</p>"
    }))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["skipped"], true);
    assert_eq!(body["reason"], "Invalid email");
}
