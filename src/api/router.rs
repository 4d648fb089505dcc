//! Route table and shared handler state.

use std::sync::Arc;

use axum::extract::Extension;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::admission::{AdmissionController, PurchaseHandler};
use crate::api::response::success_response;
use crate::api::{admin, credits, missions};
use crate::db::LedgerDb;
use crate::metrics::AdmissionMetrics;
use crate::models::ApiResponse;

pub struct AppState {
    pub controller: AdmissionController,
    pub purchases: PurchaseHandler,
    pub ledger: Arc<LedgerDb>,
    pub metrics: Arc<AdmissionMetrics>,
    pub admin_token: String,
}

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/v1/missions",
            post(missions::submit_mission).get(missions::list_missions),
        )
        .route("/api/v1/missions/:mission_id", get(missions::get_mission))
        .route(
            "/api/v1/missions/:mission_id/status",
            get(missions::get_mission_status).post(missions::update_mission_status),
        )
        .route("/api/v1/credits/balance", get(credits::get_balance))
        .route(
            "/api/v1/credits/transactions",
            get(credits::list_transactions),
        )
        .route("/api/v1/credits/packages", get(credits::list_packages))
        .route("/api/v1/credits/purchase", post(credits::purchase))
        .route("/api/v1/credits/grant", post(credits::grant))
        .route("/api/v1/admin/metrics", get(admin::get_metrics))
        .layer(Extension(state))
        .layer(CorsLayer::permissive())
}

async fn health() -> Json<ApiResponse<Option<&'static str>>> {
    Json(success_response("mission gateway is healthy"))
}
