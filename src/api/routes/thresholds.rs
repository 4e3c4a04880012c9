//! Threshold configuration endpoints

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use tracing::info;

use crate::{
    alerts::Threshold,
    api::{
        error::ApiResult,
        state::ApiState,
        types::{MetricQuery, ThresholdsResponse},
    },
};

/// GET /api/v1/thresholds
pub async fn list_thresholds(State(state): State<ApiState>) -> Json<ThresholdsResponse> {
    let thresholds = state.monitor.thresholds();

    Json(ThresholdsResponse {
        count: thresholds.len(),
        thresholds,
    })
}

/// PUT /api/v1/thresholds
///
/// Adds the threshold or replaces the one configured for the same metric.
pub async fn put_threshold(
    State(state): State<ApiState>,
    payload: Result<Json<Threshold>, JsonRejection>,
) -> ApiResult<Json<Threshold>> {
    let Json(threshold) = payload?;
    state.monitor.put_threshold(threshold.clone()).await?;
    info!(
        "threshold for {} set to {}%",
        threshold.metric, threshold.limit_percent
    );
    Ok(Json(threshold))
}

/// DELETE /api/v1/thresholds?metric=
pub async fn delete_threshold(
    State(state): State<ApiState>,
    params: Result<Query<MetricQuery>, QueryRejection>,
) -> ApiResult<StatusCode> {
    let Query(params) = params?;
    state.monitor.delete_threshold(&params.metric).await?;
    info!("threshold for {} removed", params.metric);
    Ok(StatusCode::NO_CONTENT)
}
