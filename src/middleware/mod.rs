// ABOUTME: HTTP middleware module for cross-cutting request handling
// ABOUTME: Currently hosts CORS configuration for browser-based clients
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

pub mod cors;

pub use cors::setup_cors;
