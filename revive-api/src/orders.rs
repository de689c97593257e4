use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use revive_order::PurchaseReceipt;
use revive_shared::models::{Order, Payment, PaymentType, Role};

use crate::error::AppError;
use crate::middleware::Claims;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PaymentFilter {
    #[serde(rename = "type")]
    pub payment_type: Option<PaymentType>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reseller/bundles/{id}/purchase", post(purchase_bundle))
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/payments", get(list_payments))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /reseller/bundles/{id}/purchase
/// Charges the reseller and claims the bundle; losers of a race get 409.
async fn purchase_bundle(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(bundle_id): Path<Uuid>,
) -> Result<(StatusCode, Json<PurchaseReceipt>), AppError> {
    let reseller_id = claims.require(Role::Reseller)?;
    let receipt = state.orchestrator.purchase_bundle(bundle_id, reseller_id).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// GET /orders
/// Consumers see purchases, suppliers see sales, resellers see both sides.
async fn list_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(state.orchestrator.list_orders(claims.sub, claims.role).await?))
}

async fn get_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.orchestrator.get_order_by_id(claims.sub, order_id).await?))
}

/// GET /payments?type=b2b
async fn list_payments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<PaymentFilter>,
) -> Result<Json<Vec<Payment>>, AppError> {
    Ok(Json(state.reports.list_payments(claims.sub, filter.payment_type).await?))
}
