//! REST API and WebSocket server
//!
//! Exposes the monitor's external operations over HTTP, plus WebSocket
//! streaming of samples and alert transitions.
//!
//! ## Endpoints
//!
//! - `GET /api/v1/health` - Health check
//! - `GET /api/v1/stats` - Store and persistence statistics
//! - `GET /api/v1/metrics/current` - Latest sample
//! - `GET /api/v1/metrics/history?from=&to=&disks=` - Samples in a time range
//! - `GET /api/v1/alerts` - State of every threshold
//! - `GET|PUT|DELETE /api/v1/thresholds` - Threshold configuration
//! - `GET|PUT /api/v1/disks/visible` - Disks shown by default
//! - `WS /api/v1/stream` - Live samples and alert transitions

pub mod error;
pub mod routes;
pub mod state;
pub mod types;
pub mod websocket;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;

use std::net::SocketAddr;

use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ApiConfig;

/// Build the router with every route
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/stats", get(routes::stats::get_stats))
        .route("/api/v1/metrics/current", get(routes::metrics::get_current))
        .route("/api/v1/metrics/history", get(routes::metrics::get_history))
        .route("/api/v1/alerts", get(routes::alerts::get_alert_states))
        .route(
            "/api/v1/thresholds",
            get(routes::thresholds::list_thresholds)
                .put(routes::thresholds::put_threshold)
                .delete(routes::thresholds::delete_threshold),
        )
        .route(
            "/api/v1/disks/visible",
            get(routes::disks::get_visible_disks).put(routes::disks::put_visible_disks),
        )
        .route("/api/v1/stream", get(websocket::websocket_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
pub async fn spawn_api_server(config: &ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind_addr);

    let mut app = router(state);

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
