//! Visible disk selection endpoints

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::api::{error::ApiResult, state::ApiState, types::VisibleDisksBody};

/// GET /api/v1/disks/visible
pub async fn get_visible_disks(State(state): State<ApiState>) -> Json<VisibleDisksBody> {
    Json(VisibleDisksBody {
        visible_disks: state.monitor.visible_disks(),
    })
}

/// PUT /api/v1/disks/visible
///
/// Every named mount point must appear in the retained samples.
pub async fn put_visible_disks(
    State(state): State<ApiState>,
    payload: Result<Json<VisibleDisksBody>, JsonRejection>,
) -> ApiResult<Json<VisibleDisksBody>> {
    let Json(body) = payload?;
    state
        .monitor
        .put_visible_disks(body.visible_disks.clone())
        .await?;
    Ok(Json(body))
}
