//! Strongbox server binary
//!
//! Exit codes: 0 clean shutdown, 1 fatal configuration error, 2 database
//! connection or migration failure.

use std::net::SocketAddr;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use strongbox_api::{AppConfig, AppState, router};
use strongbox_store::postgres::PostgresStore;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "configuration error");
            return ExitCode::from(1);
        }
    };
    let port = config.port;

    let store = match PostgresStore::connect(&config.database_url, config.db_max_connections).await
    {
        Ok(store) => store,
        Err(err) => {
            error!(%err, "database connection failed");
            return ExitCode::from(2);
        }
    };
    if let Err(err) = store.migrate().await {
        error!(%err, "migration failed");
        return ExitCode::from(2);
    }

    let state = match AppState::from_backend(config, store) {
        Ok(state) => state,
        Err(err) => {
            error!(%err, "service initialisation failed");
            return ExitCode::from(1);
        }
    };
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(%err, %addr, "failed to bind");
            return ExitCode::from(1);
        }
    };
    info!(%addr, "strongbox listening");

    let serve = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal());

    if let Err(err) = serve.await {
        error!(%err, "server error");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}
