//! Strongbox HTTP surface
//!
//! The axum router over the service layer: request decoding and
//! validation, caller resolution from bearer credentials, keyed rate
//! limiting, cookie handling, CORS, and the error-to-status mapping.
//! Everything under `/api`; see the service crates for semantics.

#![forbid(unsafe_code)]

pub mod config;
pub mod cookies;
mod error;
mod extract;
pub mod oauth;
mod rate_limit;
mod routes;
mod state;

use std::time::Duration;

use axum::Router;
use http::Method;
use http::header;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use config::{AppConfig, ConfigError};
pub use error::ApiError;
pub use state::AppState;

/// Total per-request deadline.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the application router with the full middleware stack.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(state.config.frontend_origin.clone())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .nest("/api", routes::api_router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit,
        ))
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_bytes))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
