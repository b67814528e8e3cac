// ABOUTME: Logging configuration and structured logging setup for observability
// ABOUTME: Selects pretty output for development and JSON output for production
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

//! Production-ready logging configuration with structured output

use crate::config::environment::Environment;
use crate::constants::service_names;
use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber from environment settings.
///
/// `RUST_LOG` controls the filter; when unset the filter defaults to `info`
/// for the relay and `warn` for dependencies. Production deployments emit
/// JSON lines, everything else gets the pretty formatter.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_from_env(environment: &Environment) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,{}=info", env!("CARGO_CRATE_NAME"))));

    if environment.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()?;
    }

    tracing::info!(
        service = service_names::RELAY,
        version = env!("CARGO_PKG_VERSION"),
        environment = %environment,
        "logging initialized"
    );
    Ok(())
}
