//! Health check endpoint

use axum::{Json, extract::State};
use tracing::warn;

use crate::api::{state::ApiState, types::HealthResponse};

/// GET /api/v1/health
///
/// Reports `degraded` when the persistence backend is unhealthy.
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    let storage = match &state.storage {
        Some(storage) => match storage.health_check().await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!("storage health check failed: {e:#}");
                None
            }
        },
        None => None,
    };

    let healthy = match (&state.storage, &storage) {
        (None, _) => true,
        (Some(_), Some(status)) => status.healthy,
        (Some(_), None) => false,
    };

    Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        storage,
    })
}
