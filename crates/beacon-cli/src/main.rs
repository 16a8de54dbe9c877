//! # Beacon Observer
//!
//! Joins the observe topic of a Beacon server and prints every stream,
//! consumer and message event as it happens.
//!
//! ## Usage
//!
//! ```bash
//! # Observe a local server
//! beacon-observe
//!
//! # Observe with a custom config
//! BEACON_CONFIG=/path/to/beacon.toml beacon-observe
//!
//! # Override the server with environment variables
//! BEACON_URL=wss://beacon.example.com/ws BEACON_TOKEN=... beacon-observe
//! ```

mod config;
mod metrics;
mod observer;

use anyhow::{Context, Result};
use beacon_core::ObserveChannel;
use beacon_transport::{Transport, WebSocketTransport};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout only carries events
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "beacon_cli=info,beacon_core=info,beacon_transport=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = config::Config::load()?;

    metrics::init_metrics();
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    info!("Connecting to {}", config.url);
    let transport = Arc::new(
        WebSocketTransport::connect(config.websocket_config())
            .await
            .with_context(|| format!("Failed to connect to {}", config.url))?,
    );

    let channel = ObserveChannel::with_logger(transport.clone(), Arc::new(metrics::MetricsLogger));
    observer::register(&channel, config.output.format);
    channel
        .connect()
        .await
        .context("Failed to join observe topic")?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
        _ = wait_for_disconnect(&transport) => warn!("Connection to server lost"),
    }

    channel.close().await;
    if let Err(e) = transport.close().await {
        warn!(error = %e, "Failed to close connection");
    }

    Ok(())
}

async fn wait_for_disconnect(transport: &WebSocketTransport) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    while transport.is_healthy() {
        ticker.tick().await;
    }
}
