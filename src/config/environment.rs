// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, deployment modes, and runtime configuration parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

//! Environment-based configuration management for production deployment

use crate::config::oauth::OAuthConfig;
use crate::constants::{defaults, env_config, ports, rate_limits};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Environment type for security and logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if this is a development environment
    #[must_use]
    pub const fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Comma-separated origin allow-list, or "*" for development
    pub allowed_origins: String,
}

/// Rate limiting configuration (per client IP, one-minute window)
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Limit applied to all routes
    pub global_per_minute: u32,
    /// Stricter limit applied to OAuth initiation routes
    pub auth_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global_per_minute: rate_limits::GLOBAL_PER_MINUTE,
            auth_per_minute: rate_limits::AUTH_PER_MINUTE,
        }
    }
}

/// Transactional email relay configuration
#[derive(Debug, Clone, Default)]
pub struct EmailConfig {
    /// Resend API key; relay reports a skipped outcome when absent
    pub api_key: Option<String>,
    /// Sender address
    pub from: String,
}

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// Deployment environment
    pub environment: Environment,
    /// CORS settings
    pub cors: CorsConfig,
    /// Rate limiting settings
    pub rate_limits: RateLimitConfig,
    /// Front-end base URL for callback redirects
    pub frontend_url: String,
    /// This server's own base URL, used for provider redirect URIs
    pub base_url: String,
    /// Redis URL; presence selects the Redis pending-authorization backend
    pub redis_url: Option<String>,
    /// Per-provider OAuth credentials
    pub oauth: OAuthConfig,
    /// Email relay settings
    pub email: EmailConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `HTTP_PORT` is set but not a valid port number.
    pub fn from_env() -> Result<Self> {
        let environment = Environment::from_str_or_default(
            &env::var(env_config::ENVIRONMENT).unwrap_or_default(),
        );

        let http_port = match env::var(env_config::HTTP_PORT) {
            Ok(value) => value
                .parse::<u16>()
                .map_err(|e| anyhow::anyhow!("Invalid {}: {e}", env_config::HTTP_PORT))?,
            Err(_) => ports::DEFAULT_HTTP_PORT,
        };

        let base_url = env::var(env_config::BASE_URL)
            .unwrap_or_else(|_| defaults::BASE_URL.to_owned());
        let frontend_url = env::var(env_config::FRONTEND_URL)
            .unwrap_or_else(|_| defaults::FRONTEND_URL.to_owned());

        Ok(Self {
            http_port,
            environment,
            cors: CorsConfig {
                allowed_origins: env::var(env_config::CORS_ALLOWED_ORIGINS)
                    .unwrap_or_else(|_| "*".to_owned()),
            },
            rate_limits: RateLimitConfig::default(),
            oauth: OAuthConfig::from_env(&base_url),
            email: EmailConfig {
                api_key: env::var(env_config::RESEND_API_KEY)
                    .ok()
                    .filter(|key| !key.is_empty()),
                from: env::var(env_config::EMAIL_FROM)
                    .unwrap_or_else(|_| defaults::EMAIL_FROM.to_owned()),
            },
            frontend_url,
            base_url,
            redis_url: env::var(env_config::REDIS_URL)
                .ok()
                .filter(|url| !url.is_empty()),
        })
    }

    /// One-line startup summary for the logs; never includes secrets
    #[must_use]
    pub fn summary(&self) -> String {
        let enabled: Vec<&str> = self
            .oauth
            .enabled_providers()
            .iter()
            .map(|p| p.as_str())
            .collect();
        format!(
            "env={} port={} frontend={} state_store={} providers=[{}] email_relay={}",
            self.environment,
            self.http_port,
            self.frontend_url,
            if self.redis_url.is_some() { "redis" } else { "memory" },
            enabled.join(","),
            if self.email.api_key.is_some() { "configured" } else { "disabled" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            Environment::from_str_or_default("prod"),
            Environment::Production
        );
        assert_eq!(
            Environment::from_str_or_default("TESTING"),
            Environment::Testing
        );
        assert_eq!(
            Environment::from_str_or_default("something-else"),
            Environment::Development
        );
    }

    #[test]
    fn test_summary_has_no_secrets() {
        let config = ServerConfig {
            http_port: 9000,
            environment: Environment::Development,
            cors: CorsConfig {
                allowed_origins: "*".to_owned(),
            },
            rate_limits: RateLimitConfig::default(),
            frontend_url: "http://localhost:5173".to_owned(),
            base_url: "http://localhost:9000".to_owned(),
            redis_url: None,
            oauth: OAuthConfig::default(),
            email: EmailConfig {
                api_key: Some("re_secret_key".to_owned()),
                from: "FlowSphere <noreply@flowsphere.app>".to_owned(),
            },
        };
        let summary = config.summary();
        assert!(!summary.contains("re_secret_key"));
        assert!(summary.contains("state_store=memory"));
    }
}
