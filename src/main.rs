//! Svcgraph Server entry point.

use std::net::SocketAddr;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use svcgraph_server::AppState;
use svcgraph_server::config::Config;
use svcgraph_service::ServiceState;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let service = match ServiceState::open(&config.service_config()).await {
        Ok(service) => service,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open graph store");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        persistent = service.persistent(),
        "Svcgraph Server starting",
    );

    let state = AppState::new(service.clone(), config.cors_origins.clone());
    let app = svcgraph_server::router(state);

    let addr = match config.host.parse() {
        Ok(ip) => SocketAddr::new(ip, config.port),
        Err(e) => {
            tracing::error!(host = %config.host, error = %e, "Invalid bind address");
            return ExitCode::FAILURE;
        }
    };
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(%addr, "Svcgraph Server ready");

    let result = svcgraph_server::serve(listener, app, shutdown_signal()).await;
    service.close().await;

    match result {
        Ok(()) => {
            tracing::info!("Svcgraph Server shut down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install signal handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
