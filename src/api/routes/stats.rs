//! Statistics endpoint

use axum::{Json, extract::State};

use crate::api::{state::ApiState, types::StatsResponse};

/// GET /api/v1/stats
///
/// Store counters, plus persistence counters when a storage actor runs
pub async fn get_stats(State(state): State<ApiState>) -> Json<StatsResponse> {
    let store = state.monitor.stats().await;

    let storage = match &state.storage {
        Some(storage) => storage.get_stats().await,
        None => None,
    };

    Json(StatsResponse {
        timestamp: chrono::Utc::now().to_rfc3339(),
        store,
        storage,
    })
}
