// ABOUTME: Cryptographic utilities module
// ABOUTME: Houses the symmetric token cipher used to seal OAuth token bundles
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

//! Cryptographic utilities

/// Symmetric token cipher for sealing OAuth token bundles in transit
pub mod cipher;

pub use cipher::TokenCipher;
