// ABOUTME: Configuration module for environment-driven server settings
// ABOUTME: Groups deployment configuration and per-provider OAuth credentials
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

//! Configuration management
//!
//! All configuration comes from the environment; there is no config file.

/// Deployment and runtime configuration
pub mod environment;
/// OAuth provider credential configuration
pub mod oauth;
