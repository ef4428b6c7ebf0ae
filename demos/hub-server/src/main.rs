//! Orka hub server.
//!
//! Run with: cargo run -p orka-hub-server -- --port 8000
//!
//! Agents connect to `ws://<host>:<port>/agent?clientName=<name>`, the
//! operator console to `ws://<host>:<port>/console`.

use std::{future::IntoFuture, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use orka_core::{ConsoleFeed, HubConfig, SettingsStore, settings::DEFAULT_PORT};
use orka_hub::Hub;
use orka_settings::{JsonFileSettings, MemorySettings};
use orka_transport::{WsDialer, hub_router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "orka-hub", about = "Hub connecting an operator console to a fleet of agents")]
struct Args {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on; overrides the stored server options.
    #[arg(long)]
    port: Option<u16>,

    /// Settings file; defaults to `<config dir>/orka/settings.json`.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Keep settings in memory only.
    #[arg(long, default_value_t = false)]
    in_memory: bool,

    /// Grace period for close handlers on shutdown, in milliseconds.
    #[arg(long, default_value_t = 100)]
    grace_ms: u64,

    /// Notifications replayed to a reconnecting console.
    #[arg(long, default_value_t = orka_core::feed::DEFAULT_HISTORY)]
    history: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    if args.in_memory {
        serve(args, MemorySettings::new()).await
    } else {
        let path = args
            .settings
            .clone()
            .or_else(JsonFileSettings::default_path)
            .context("no settings path given and no config directory available")?;
        let settings = JsonFileSettings::open(&path)
            .await
            .with_context(|| format!("failed to load settings from {}", path.display()))?;
        tracing::info!(path = %path.display(), "Loaded settings");
        serve(args, settings).await
    }
}

async fn serve<S>(args: Args, settings: S) -> anyhow::Result<()>
where
    S: SettingsStore + 'static,
{
    let stored_port = match settings.server_options().await {
        Ok(options) => Some(options.port),
        Err(e) => {
            tracing::warn!("Could not read server options: {e}");
            None
        }
    };
    let port = args.port.or(stored_port).unwrap_or(DEFAULT_PORT);

    let config = HubConfig {
        listen_port: port,
        shutdown_grace: Duration::from_millis(args.grace_ms),
        feed_history: args.history,
        ..HubConfig::default()
    };
    let hub = Arc::new(Hub::new(
        Arc::new(ConsoleFeed::new(config.feed_history)),
        Arc::new(settings),
        Arc::new(WsDialer::new()),
        config,
    ));
    let mut shutdown = hub.shutdown_signal();

    let app = hub_router(Arc::clone(&hub));

    let addr: SocketAddr = format!("{}:{port}", args.bind)
        .parse()
        .with_context(|| format!("invalid bind address {}", args.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Hub listening on ws://{addr}");

    tokio::select! {
        served = axum::serve(listener, app).into_future() => served.context("server error")?,
        _ = shutdown.wait_for(|done| *done) => {
            tracing::info!("Shutdown requested by console, exiting");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, draining connections");
            hub.shutdown().await;
        }
    }

    Ok(())
}
