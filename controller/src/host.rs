use std::{
    fs::OpenOptions,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use anyhow::Context;
use boiler_common::config::{config_path, LoggingConfig};
use boiler_sensor::Ds18b20;
use tokio::{net::TcpListener, sync::watch};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    config_store::ConfigStore,
    control_loop::spawn_control_loop,
    handler::RequestHandler,
    relay::SysfsRelay,
    state::AppState,
    store::SqliteStore,
    ws::{self, WsState},
};

pub async fn run() -> anyhow::Result<()> {
    let path = config_path();
    let config = ConfigStore::open(&path)
        .await
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    let settings = config.current().await;

    init_tracing(&settings.logging)?;
    info!("configuration loaded from {}", config.path().display());

    let hardware = match config.hardware().await {
        Ok(hardware) => hardware,
        Err(err) => {
            error!("{err}");
            return Err(err).context("cannot start without hardware configuration");
        }
    };

    let relay = SysfsRelay::new(&settings.relay.base_path, hardware.relay_1, hardware.relay_2);
    if let Err(err) = relay.export().await {
        warn!("relay outputs not ready: {err}");
    }

    let store = SqliteStore::open(&settings.storage.database, settings.storage.default_set_point)
        .with_context(|| format!("failed to open {}", settings.storage.database))?;

    let state = AppState {
        config: Arc::new(config),
        hardware: Arc::new(hardware),
        sensor: Arc::new(Ds18b20::new(&settings.sensor.base_path)),
        relay: Arc::new(relay),
        store: Arc::new(store),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let control = spawn_control_loop(state.clone(), shutdown_rx);

    let app = ws::router(WsState::new(RequestHandler::new(state))).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                settings.server.host, settings.server.port
            )
        })?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind controller server at {addr}"))?;

    info!("controller listening on ws://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(err) = control.await {
        warn!("control loop ended abnormally: {err}");
    }
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.filter_directive()));

    match logging.log_file() {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
