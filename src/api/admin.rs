//! Privileged endpoints and the admin token gate.

use std::sync::Arc;

use axum::extract::Extension;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use crate::api::response::{error_codes, error_response, success_response};
use crate::api::router::AppState;
use crate::metrics::MetricsSnapshot;
use crate::models::ApiResponse;

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Check the admin token header against the configured token.
///
/// An empty configured token disables the privileged surface outright:
/// no header value can match it.
pub(crate) fn require_admin<T>(
    admin_token: &str,
    headers: &HeaderMap,
) -> Result<(), (StatusCode, Json<ApiResponse<Option<T>>>)> {
    let presented = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if admin_token.is_empty() || presented != admin_token {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(error_response(
                error_codes::UNAUTHORIZED,
                "Admin token missing or invalid".to_string(),
            )),
        ));
    }
    Ok(())
}

/// GET /api/v1/admin/metrics
pub async fn get_metrics(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<ApiResponse<Option<MetricsSnapshot>>>) {
    if let Err(resp) = require_admin(&state.admin_token, &headers) {
        return resp;
    }

    (
        StatusCode::OK,
        Json(success_response(state.metrics.get_snapshot())),
    )
}
