use std::net::SocketAddr;
use std::path::PathBuf;

use axum::routing::get;
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use wattson_prime::{
    AppState, api,
    board::DeviceBoard,
    config::{BoardConfig, Config, StoreConfig},
    store::{DeviceStore, MemoryStore, SqliteStore, seed},
};

#[derive(Parser)]
#[command(name = "wattson-prime")]
#[command(about = "Wattson household device board")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "wattson.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "tracing=info,wattson_prime=info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        info!(path = ?cli.config, "Loading configuration");
        Config::load(&cli.config)?
    } else {
        info!("No configuration file found, using defaults");
        Config::default()
    };

    info!(http_addr = %config.server.http_addr, "Starting server");

    match config.store {
        StoreConfig::Memory { seed: seed_file, demo } => {
            let devices = match seed_file {
                Some(path) => {
                    info!(path = ?path, "Seeding in-memory store from file");
                    seed::load(&path)?
                }
                None if demo => {
                    info!("Seeding in-memory store with demo devices");
                    seed::demo_devices()
                }
                None => Vec::new(),
            };
            let store = MemoryStore::with_devices(devices)?;
            run_server(store, config.board, config.server.http_addr).await?;
        }
        StoreConfig::Sqlite { path, seed: seed_file } => {
            info!(path = ?path, "Using SQLite store");
            let store = SqliteStore::new(&path).await?;
            if let Some(seed_path) = seed_file {
                if store.fetch_all().await?.is_empty() {
                    info!(path = ?seed_path, "Importing seed devices into empty store");
                    store.import(&seed::load(&seed_path)?).await?;
                } else {
                    warn!(path = ?seed_path, "Store already has devices, seed file ignored");
                }
            }
            run_server(store, config.board, config.server.http_addr).await?;
        }
    }

    Ok(())
}

async fn run_server<S: DeviceStore>(
    store: S,
    board_config: BoardConfig,
    http_addr: SocketAddr,
) -> color_eyre::Result<()> {
    let tz = board_config.time_zone()?;
    let board = DeviceBoard::new(store, tz, board_config.toggle_timeout());

    match board.refresh().await {
        Ok(devices) => info!(devices, "Board loaded"),
        Err(e) => warn!(error = %e, "Initial load failed, starting with an empty board"),
    }

    let state = AppState {
        board,
        top_devices: board_config.top_devices,
    };

    let axum_app = api::api_router(state).route("/health", get(health_handler));

    let cancel = CancellationToken::new();

    let axum_listener = TcpListener::bind(http_addr).await?;
    info!(%http_addr, "HTTP server listening");

    let cancel_clone = cancel.clone();
    tokio::select! {
        result = axum::serve(axum_listener, axum_app).with_graceful_shutdown(async move {
            cancel_clone.cancelled().await;
        }) => {
            if let Err(e) = result {
                tracing::error!(error = ?e, "HTTP server error");
            }
            info!("HTTP server shut down");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            cancel.cancel();
        }
    }

    Ok(())
}

async fn health_handler() -> &'static str {
    "OK"
}
