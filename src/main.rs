//! edge-relay binary: load config, start logging and metrics, serve.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use edge_relay::config::{load_config, validate_config, ConfigError, EdgeConfig};
use edge_relay::lifecycle::{wait_for_signal, Shutdown};
use edge_relay::observability::{logging, metrics};
use edge_relay::HttpServer;

#[derive(Parser)]
#[command(name = "edge-relay")]
#[command(about = "HEAD/OPTIONS CORS proxy and WebSocket echo server", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address (e.g. 127.0.0.1:3000)
    #[arg(short, long)]
    bind: Option<String>,
}

fn resolve_config(cli: &Cli) -> Result<EdgeConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EdgeConfig::default(),
    };

    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    logging::init_logging(&config.observability)?;

    tracing::info!("edge-relay v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config)?;

    let loaded = server.config();
    tracing::info!(
        bind_address = %loaded.listener.bind_address,
        default_user_agent = %loaded.upstream.default_user_agent,
        upgrade_failure_status = loaded.websocket.upgrade_failure_status,
        metrics_enabled = loaded.observability.metrics_enabled,
        "Configuration loaded"
    );

    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
