// ABOUTME: Per-IP fixed-window rate limiting with standard X-RateLimit response headers
// ABOUTME: Axum middleware layer applied globally and, with a tighter budget, to auth routes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

//! # Rate Limiting
//!
//! Fixed one-minute window per client IP. Two budgets exist: a global one for
//! every route and a tighter one for OAuth initiation, because each initiation
//! writes a pending authorization that lives for ten minutes.

use crate::errors::AppError;
use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::HeaderValue;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::warn;

const WINDOW: Duration = Duration::from_secs(60);

struct Window {
    count: u32,
    started_at: Instant,
}

/// Outcome of a rate-limit check, carried into the response headers
#[derive(Debug, Clone, Copy)]
pub struct RateLimitStatus {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Seconds until the current window resets
    pub reset_secs: u64,
}

/// Fixed-window counter keyed by client IP
pub struct RateLimiter {
    limit: u32,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Record one request from `ip` and report whether it fits the budget
    pub fn check(&self, ip: IpAddr) -> RateLimitStatus {
        let now = Instant::now();
        let Ok(mut windows) = self.windows.lock() else {
            // Poisoned lock: fail open rather than block all traffic
            return RateLimitStatus {
                allowed: true,
                limit: self.limit,
                remaining: self.limit,
                reset_secs: WINDOW.as_secs(),
            };
        };

        // Opportunistic cleanup keeps the map bounded by active clients
        windows.retain(|_, window| now.duration_since(window.started_at) < WINDOW);

        let window = windows.entry(ip).or_insert(Window {
            count: 0,
            started_at: now,
        });

        let elapsed = now.duration_since(window.started_at);
        let reset_secs = WINDOW.saturating_sub(elapsed).as_secs().max(1);

        if window.count >= self.limit {
            return RateLimitStatus {
                allowed: false,
                limit: self.limit,
                remaining: 0,
                reset_secs,
            };
        }

        window.count += 1;
        RateLimitStatus {
            allowed: true,
            limit: self.limit,
            remaining: self.limit - window.count,
            reset_secs,
        }
    }
}

/// Client IP for rate-limit purposes. Requests served without connection
/// info (in-process test calls) attribute to localhost.
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::LOCALHOST), |info| info.0.ip())
}

fn apply_headers(response: &mut Response, status: RateLimitStatus) {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&status.limit.to_string()) {
        headers.insert("x-ratelimit-limit", value);
    }
    if let Ok(value) = HeaderValue::from_str(&status.remaining.to_string()) {
        headers.insert("x-ratelimit-remaining", value);
    }
    if let Ok(value) = HeaderValue::from_str(&status.reset_secs.to_string()) {
        headers.insert("x-ratelimit-reset", value);
    }
}

/// Axum middleware; attach with `middleware::from_fn_with_state`
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);
    let status = limiter.check(ip);

    if !status.allowed {
        warn!("Rate limit exceeded for {ip}");
        let mut response = AppError::new(
            crate::errors::ErrorCode::RateLimitExceeded,
            format!("Limit of {} requests per minute exceeded", status.limit),
        )
        .into_response();
        apply_headers(&mut response, status);
        if let Ok(value) = HeaderValue::from_str(&status.reset_secs.to_string()) {
            response.headers_mut().insert("retry-after", value);
        }
        return response;
    }

    let mut response = next.run(request).await;
    apply_headers(&mut response, status);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_enforced() {
        let limiter = RateLimiter::new(3);
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

        for expected_remaining in [2, 1, 0] {
            let status = limiter.check(ip);
            assert!(status.allowed);
            assert_eq!(status.remaining, expected_remaining);
        }

        let status = limiter.check(ip);
        assert!(!status.allowed);
        assert_eq!(status.remaining, 0);
        assert!(status.reset_secs >= 1);
    }

    #[test]
    fn test_budgets_are_per_ip() {
        let limiter = RateLimiter::new(1);
        let first = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let second = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

        assert!(limiter.check(first).allowed);
        assert!(!limiter.check(first).allowed);
        assert!(limiter.check(second).allowed);
    }
}
