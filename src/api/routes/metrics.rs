//! Sample endpoints

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use tracing::debug;

use crate::{
    Sample,
    api::{
        error::ApiResult,
        state::ApiState,
        types::{HistoryQuery, HistoryResponse},
    },
    store::TimeRange,
};

/// GET /api/v1/metrics/current
///
/// Latest retained sample, 404 before the first tick
pub async fn get_current(State(state): State<ApiState>) -> ApiResult<Json<Sample>> {
    let sample = state.monitor.current_metrics().await?;
    Ok(Json(sample))
}

/// GET /api/v1/metrics/history?from=&to=&disks=
pub async fn get_history(
    State(state): State<ApiState>,
    params: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Json<HistoryResponse>> {
    let Query(params) = params?;
    let range = TimeRange {
        from: params.from,
        to: params.to,
    };
    let disks = params
        .disk_selection()
        .unwrap_or_else(|| state.monitor.visible_disks());

    debug!("history query {range:?} for disks {disks}");

    let samples = state.monitor.history(range, Some(disks.clone())).await?;

    Ok(Json(HistoryResponse {
        disks,
        count: samples.len(),
        samples,
    }))
}
