//! promkit exporter
//!
//! - Loads `promkit.yaml` (or the path given as the first argument)
//! - Registers the configured metrics in the default registry
//! - Drives them with a synthetic workload
//! - Serves `/metrics` for a pull-based collector

use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use promkit_exporter::{app_state, config, router, workload};

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());

    let cfg = match config::load_from_file(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(%path, error = %e, "config load failed");
            return ExitCode::FAILURE;
        }
    };
    let listen = match cfg.exporter.listen_addr() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(error = %e, "bad listen address");
            return ExitCode::FAILURE;
        }
    };

    let state = match app_state::AppState::new(cfg) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "metric setup failed");
            return ExitCode::FAILURE;
        }
    };

    tokio::spawn(workload::run(state.clone()));
    let app = router::build_router(state);

    tracing::info!(%listen, "promkit-exporter starting");
    let listener = match tokio::net::TcpListener::bind(listen).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%listen, error = %e, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
