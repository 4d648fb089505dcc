//! Mission endpoints
//!
//! Owner identity arrives as a verified `owner_id` query parameter; the
//! auth layer in front of the gateway owns token validation. The status
//! callback endpoint is the exception: workers address missions by id
//! alone, so it carries no owner scope.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::response::{error_codes, error_response, reject, success_response};
use crate::api::router::AppState;
use crate::models::{ApiResponse, MissionId, MissionParams, MissionRecord, MissionStatus};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Deserialize)]
pub struct OwnerParams {
    pub owner_id: u64,
}

#[derive(Deserialize)]
pub struct OwnerPageParams {
    pub owner_id: u64,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

pub(crate) fn page_bounds(page: Option<usize>, page_size: Option<usize>) -> (usize, usize) {
    let page = page.unwrap_or(1).max(1);
    let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, page_size)
}

#[derive(Debug, Serialize)]
pub struct SubmitMissionData {
    pub mission: MissionRecord,
    pub cost_charged: u64,
}

/// POST /api/v1/missions?owner_id=
pub async fn submit_mission(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<OwnerParams>,
    Json(body): Json<MissionParams>,
) -> (StatusCode, Json<ApiResponse<Option<SubmitMissionData>>>) {
    match state.controller.submit_mission(params.owner_id, body).await {
        Ok(mission) => {
            let cost_charged = mission.cost_charged;
            (
                StatusCode::CREATED,
                Json(success_response(SubmitMissionData {
                    mission,
                    cost_charged,
                })),
            )
        }
        Err(e) => reject(&e),
    }
}

#[derive(Debug, Serialize)]
pub struct MissionListData {
    pub items: Vec<MissionRecord>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// GET /api/v1/missions?owner_id=&page=&page_size=
pub async fn list_missions(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<OwnerPageParams>,
) -> (StatusCode, Json<ApiResponse<Option<MissionListData>>>) {
    let (page, page_size) = page_bounds(params.page, params.page_size);

    match state
        .controller
        .list_missions(params.owner_id, page, page_size)
    {
        Ok((items, total)) => (
            StatusCode::OK,
            Json(success_response(MissionListData {
                items,
                total,
                page,
                page_size,
            })),
        ),
        Err(e) => reject(&e),
    }
}

/// GET /api/v1/missions/:mission_id?owner_id=
pub async fn get_mission(
    Extension(state): Extension<Arc<AppState>>,
    Path(mission_id): Path<String>,
    Query(params): Query<OwnerParams>,
) -> (StatusCode, Json<ApiResponse<Option<MissionRecord>>>) {
    let mission_id = match MissionId::from_str(&mission_id) {
        Ok(id) => id,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(error_response(error_codes::INVALID_MISSION_ID, e)),
            );
        }
    };

    match state.controller.get_mission(params.owner_id, mission_id) {
        Ok(mission) => (StatusCode::OK, Json(success_response(mission))),
        Err(e) => reject(&e),
    }
}

#[derive(Debug, Serialize)]
pub struct MissionStatusData {
    pub mission_id: MissionId,
    pub status: MissionStatus,
    pub error_message: Option<String>,
}

/// GET /api/v1/missions/:mission_id/status?owner_id=
///
/// Cheap polling endpoint; same owner scoping as the full read.
pub async fn get_mission_status(
    Extension(state): Extension<Arc<AppState>>,
    Path(mission_id): Path<String>,
    Query(params): Query<OwnerParams>,
) -> (StatusCode, Json<ApiResponse<Option<MissionStatusData>>>) {
    let mission_id = match MissionId::from_str(&mission_id) {
        Ok(id) => id,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(error_response(error_codes::INVALID_MISSION_ID, e)),
            );
        }
    };

    match state.controller.get_mission(params.owner_id, mission_id) {
        Ok(mission) => (
            StatusCode::OK,
            Json(success_response(MissionStatusData {
                mission_id: mission.id,
                status: mission.status,
                error_message: mission.error_message,
            })),
        ),
        Err(e) => reject(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
    #[serde(default)]
    pub job_ref: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// POST /api/v1/missions/:mission_id/status
///
/// Worker callback; delivery is at-least-once, so repeats of the current
/// status succeed.
pub async fn update_mission_status(
    Extension(state): Extension<Arc<AppState>>,
    Path(mission_id): Path<String>,
    Json(body): Json<StatusUpdateRequest>,
) -> (StatusCode, Json<ApiResponse<Option<MissionRecord>>>) {
    let mission_id = match MissionId::from_str(&mission_id) {
        Ok(id) => id,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(error_response(error_codes::INVALID_MISSION_ID, e)),
            );
        }
    };

    let Some(new_status) = MissionStatus::from_str(&body.status) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(error_response(
                error_codes::INVALID_STATUS,
                format!("Unknown mission status: {}", body.status),
            )),
        );
    };

    match state.controller.update_mission_status(
        mission_id,
        new_status,
        body.job_ref.as_deref(),
        body.error_message.as_deref(),
    ) {
        Ok(mission) => (StatusCode::OK, Json(success_response(mission))),
        Err(e) => reject(&e),
    }
}
