//! Waypoint server binary.
//!
//! Serves the static mounts declared in a TOML config file through the
//! ordered dispatch chain.
//!
//! ```text
//! waypoint --config waypoint.toml [--bind 127.0.0.1:8080] [--check]
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;

use waypoint::config::{load_config, ServerConfig};
use waypoint::error::ServerError;
use waypoint::http::HttpServer;
use waypoint::lifecycle::{wait_for_signal, Shutdown};
use waypoint::observability::{init_logging, metrics};

#[derive(Parser)]
#[command(name = "waypoint")]
#[command(about = "Ordered fall-through HTTP dispatcher", long_about = None)]
struct Cli {
    /// Path to the TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Validate the config and mounts, then exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("waypoint: {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "waypoint starting");

    match run(config, cli.check).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ServerConfig, check_only: bool) -> Result<(), ServerError> {
    let bind_address = config.listener.bind_address.clone();
    let metrics_address = config
        .observability
        .metrics_enabled
        .then(|| config.observability.metrics_address.parse().ok())
        .flatten();

    let server = HttpServer::from_config(config)?;
    tracing::info!(
        bind_address = %bind_address,
        entries = server.registry().len(),
        "Configuration loaded"
    );
    if check_only {
        tracing::info!("Configuration OK");
        return Ok(());
    }

    if let Some(addr) = metrics_address {
        metrics::init_metrics(addr);
    }

    let listener = TcpListener::bind(&bind_address)
        .await
        .map_err(|source| ServerError::Bind {
            address: bind_address.clone(),
            source,
        })?;

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, receiver).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
