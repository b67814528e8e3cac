// ABOUTME: Main server binary wiring configuration, key material, and the HTTP listener
// ABOUTME: Fails fast on missing production secrets before binding the port
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

//! # FlowSphere Relay Server Binary
//!
//! Starts the OAuth relay: loads configuration from the environment, boots
//! the shared resources (cipher, handoff signer, pending-authorization
//! store, provider registry), and serves the HTTP surface.

use anyhow::Result;
use clap::Parser;
use flowsphere_relay::{
    config::environment::ServerConfig, context::ServerResources, logging, routes,
};
use std::net::SocketAddr;
use tracing::info;

#[derive(Parser)]
#[command(name = "flowsphere-relay")]
#[command(about = "FlowSphere OAuth relay - provider connect/callback/refresh flows")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    logging::init_from_env(&config.environment)?;
    info!("Starting FlowSphere relay");
    info!("{}", config.summary());

    let http_port = config.http_port;
    let resources = ServerResources::bootstrap(config).await?;
    let app = routes::build_router(resources);

    let addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
