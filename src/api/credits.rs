//! Credit ledger endpoints

use std::sync::Arc;

use axum::extract::{Extension, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::admin::require_admin;
use crate::api::missions::{page_bounds, OwnerPageParams, OwnerParams};
use crate::api::response::{reject, success_response};
use crate::api::router::AppState;
use crate::models::{
    ApiResponse, CreditPackage, CreditTransaction, PaymentConfirmation, PurchaseReceipt,
};

#[derive(Debug, Serialize)]
pub struct BalanceData {
    pub owner_id: u64,
    pub balance: u64,
}

/// GET /api/v1/credits/balance?owner_id=
///
/// First access materializes the welcome grant, so this never 404s.
pub async fn get_balance(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<OwnerParams>,
) -> (StatusCode, Json<ApiResponse<Option<BalanceData>>>) {
    match state.ledger.balance(params.owner_id) {
        Ok(balance) => (
            StatusCode::OK,
            Json(success_response(BalanceData {
                owner_id: params.owner_id,
                balance,
            })),
        ),
        Err(e) => reject(&e),
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionListData {
    pub items: Vec<CreditTransaction>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// GET /api/v1/credits/transactions?owner_id=&page=&page_size=
pub async fn list_transactions(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<OwnerPageParams>,
) -> (StatusCode, Json<ApiResponse<Option<TransactionListData>>>) {
    let (page, page_size) = page_bounds(params.page, params.page_size);

    match state
        .ledger
        .list_transactions(params.owner_id, page, page_size)
    {
        Ok((items, total)) => (
            StatusCode::OK,
            Json(success_response(TransactionListData {
                items,
                total,
                page,
                page_size,
            })),
        ),
        Err(e) => reject(&e),
    }
}

/// GET /api/v1/credits/packages
pub async fn list_packages(
    Extension(state): Extension<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<Option<Vec<CreditPackage>>>>) {
    match state.ledger.list_packages() {
        Ok(packages) => (StatusCode::OK, Json(success_response(packages))),
        Err(e) => reject(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub package_id: String,
    pub payment: PaymentConfirmation,
}

/// POST /api/v1/credits/purchase?owner_id=
pub async fn purchase(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<OwnerParams>,
    Json(body): Json<PurchaseRequest>,
) -> (StatusCode, Json<ApiResponse<Option<PurchaseReceipt>>>) {
    match state
        .purchases
        .purchase(params.owner_id, &body.package_id, &body.payment)
    {
        Ok(receipt) => (StatusCode::OK, Json(success_response(receipt))),
        Err(e) => reject(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub owner_id: u64,
    pub amount: i64,
    pub description: String,
}

/// POST /api/v1/credits/grant
///
/// Privileged: requires the configured admin token.
pub async fn grant(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<GrantRequest>,
) -> (StatusCode, Json<ApiResponse<Option<PurchaseReceipt>>>) {
    if let Err(resp) = require_admin(&state.admin_token, &headers) {
        return resp;
    }

    match state
        .purchases
        .grant(body.owner_id, body.amount, &body.description)
    {
        Ok(receipt) => (StatusCode::OK, Json(success_response(receipt))),
        Err(e) => reject(&e),
    }
}
