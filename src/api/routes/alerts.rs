//! Alert state endpoint

use axum::{Json, extract::State};

use crate::api::{state::ApiState, types::AlertsResponse};

/// GET /api/v1/alerts
///
/// One entry per configured threshold, ordered by metric
pub async fn get_alert_states(State(state): State<ApiState>) -> Json<AlertsResponse> {
    let alerts = state.monitor.alert_states().await;

    Json(AlertsResponse {
        count: alerts.len(),
        alerts,
    })
}
