// ABOUTME: Application constants for timeouts, limits, and environment variable names
// ABOUTME: Centralizes flow TTLs, rate limit defaults, and service identifiers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

//! Application-wide constants

/// Service identifiers used in logging and token audiences
pub mod service_names {
    /// Service name for structured logging
    pub const RELAY: &str = "flowsphere-relay";
    /// Audience claim embedded in handoff credentials
    pub const HANDOFF_AUDIENCE: &str = "flowsphere-client";
}

/// OAuth flow timing constants
pub mod oauth_flow {
    /// How long a pending authorization stays valid after initiation
    pub const STATE_TTL_SECS: u64 = 600;
    /// Interval between background sweeps of expired pending authorizations
    pub const SWEEP_INTERVAL_SECS: u64 = 300;
    /// Lifetime of the signed handoff credential issued at callback time
    pub const HANDOFF_TTL_SECS: u64 = 300;
    /// Length in bytes of the random state token
    pub const STATE_TOKEN_BYTES: usize = 32;
}

/// Network defaults
pub mod ports {
    /// Default HTTP port for the relay server
    pub const DEFAULT_HTTP_PORT: u16 = 8787;
}

/// Rate limiting defaults (requests per one-minute window, per client IP)
pub mod rate_limits {
    /// Global limit applied to all routes
    pub const GLOBAL_PER_MINUTE: u32 = 120;
    /// Stricter limit applied to OAuth initiation routes
    pub const AUTH_PER_MINUTE: u32 = 10;
}

/// Environment variable names
pub mod env_config {
    /// Signing secret for handoff credentials (base64, 32+ bytes)
    pub const JWT_SECRET: &str = "FLOWSPHERE_JWT_SECRET";
    /// Symmetric key for the token cipher (base64, exactly 32 bytes)
    pub const TOKEN_CIPHER_KEY: &str = "FLOWSPHERE_TOKEN_CIPHER_KEY";
    /// Deployment environment (development, production, testing)
    pub const ENVIRONMENT: &str = "FLOWSPHERE_ENV";
    /// HTTP port override
    pub const HTTP_PORT: &str = "HTTP_PORT";
    /// Comma-separated CORS origin allow-list, or "*"
    pub const CORS_ALLOWED_ORIGINS: &str = "CORS_ALLOWED_ORIGINS";
    /// Base URL of the FlowSphere front-end, used for callback redirects
    pub const FRONTEND_URL: &str = "FRONTEND_URL";
    /// Base URL of this server, used to build provider redirect URIs
    pub const BASE_URL: &str = "BASE_URL";
    /// Redis connection URL; presence selects the Redis state store backend
    pub const REDIS_URL: &str = "REDIS_URL";
    /// Resend API key for the transactional email relay
    pub const RESEND_API_KEY: &str = "RESEND_API_KEY";
    /// Sender address for relayed email
    pub const EMAIL_FROM: &str = "EMAIL_FROM";
}

/// Default values used when the environment leaves settings unset
pub mod defaults {
    /// Front-end location clients are returned to when no redirect is requested
    pub const RETURN_LOCATION: &str = "/settings";
    /// Front-end base URL for development
    pub const FRONTEND_URL: &str = "http://localhost:5173";
    /// Relay base URL for development
    pub const BASE_URL: &str = "http://localhost:8787";
    /// Sender address for relayed email when none is configured
    pub const EMAIL_FROM: &str = "FlowSphere <noreply@flowsphere.app>";
}
