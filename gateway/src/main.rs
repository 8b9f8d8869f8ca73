//! Lux Gateway

use anyhow::Context;
use lux_bootstrap::{ShutdownController, init_runtime};
use lux_config::AppConfig;
use lux_gateway::{AppState, Dependencies, router};
use std::net::SocketAddr;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 文件可选
    let _ = dotenvy::dotenv();

    let config_dir = std::env::var("LUX_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let config = AppConfig::load(&config_dir).context("Failed to load configuration")?;

    init_runtime(&config);

    let metrics = if config.telemetry.metrics_enabled {
        match lux_telemetry::init_metrics() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "Failed to install Prometheus recorder, metrics disabled");
                None
            }
        }
    } else {
        None
    };

    let deps = Dependencies::connect(&config)
        .await
        .context("Failed to initialize dependencies")?;
    let state = AppState::new(&config, deps, metrics);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let shutdown = ShutdownController::new();
    shutdown.listen_for_signals();

    info!(%addr, "Starting gateway");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.wait())
        .await
        .context("Server error")?;

    info!("Gateway stopped");
    Ok(())
}
