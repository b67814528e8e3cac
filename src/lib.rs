// ABOUTME: Main library entry point for the FlowSphere OAuth relay
// ABOUTME: Exposes the OAuth flow orchestration, token sealing, and HTTP surface modules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

#![deny(unsafe_code)]

//! # FlowSphere Relay
//!
//! Server-side OAuth relay for the FlowSphere client: the piece that holds
//! provider client secrets, drives the connect/callback/refresh flow against
//! Google, Outlook, Yahoo, and Apple, and hands tokens back to the client
//! sealed inside a short-lived signed credential. Also carries the
//! transactional email side channel.
//!
//! ## Architecture
//!
//! - **oauth**: provider dialects, the pending-authorization store, and the
//!   flow orchestrator
//! - **crypto**: AES-256-GCM token cipher
//! - **handoff**: short-lived signed credential minted at callback time
//! - **routes / middleware / `rate_limiting`**: the axum HTTP surface
//! - **email**: Resend-backed relay that never fails the caller
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flowsphere_relay::config::environment::ServerConfig;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = ServerConfig::from_env()?;
//! println!("FlowSphere relay configured on port {}", config.http_port);
//! # Ok(())
//! # }
//! ```

/// Configuration management (environment, per-provider OAuth credentials)
pub mod config;
/// Application-wide constants
pub mod constants;
/// Shared server resources threaded through request handlers
pub mod context;
/// Token cipher for sealing OAuth token bundles
pub mod crypto;
/// Transactional email relay
pub mod email;
/// Unified error handling and HTTP error responses
pub mod errors;
/// Signed handoff credential minting and verification
pub mod handoff;
/// Logging configuration
pub mod logging;
/// HTTP middleware (CORS)
pub mod middleware;
/// OAuth providers, pending-authorization store, and flow orchestration
pub mod oauth;
/// Per-IP rate limiting
pub mod rate_limiting;
/// HTTP route handlers
pub mod routes;
