use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use revive_shared::models::{Listing, ListingDraft, ResellerMetrics, Role, WarehouseItem};

use crate::error::AppError;
use crate::middleware::Claims;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reseller/products", post(unpack_product))
        .route("/reseller/warehouse", get(list_warehouse))
        .route("/reseller/warehouse/bundles/{bundle_id}", get(list_warehouse_by_bundle))
        .route("/reseller/warehouse/{item_id}/skip", post(mark_skipped))
        .route("/reseller/warehouse/{item_id}/damage", post(mark_damaged))
        .route("/reseller/warehouse/{item_id}", delete(delete_item))
        .route("/reseller/dashboard", get(dashboard))
}

/// POST /reseller/products
/// Turns one item of an arrived bundle into a consumer listing.
async fn unpack_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(draft): Json<ListingDraft>,
) -> Result<(StatusCode, Json<Listing>), AppError> {
    let reseller_id = claims.require(Role::Reseller)?;
    let listing = state.unpack.unpack_product(reseller_id, draft).await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

async fn list_warehouse(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<WarehouseItem>>, AppError> {
    let reseller_id = claims.require(Role::Reseller)?;
    Ok(Json(state.warehouse.list_by_reseller(reseller_id).await?))
}

async fn list_warehouse_by_bundle(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(bundle_id): Path<Uuid>,
) -> Result<Json<Vec<WarehouseItem>>, AppError> {
    let reseller_id = claims.require(Role::Reseller)?;
    Ok(Json(state.warehouse.list_by_bundle(reseller_id, bundle_id).await?))
}

async fn mark_skipped(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<WarehouseItem>, AppError> {
    let reseller_id = claims.require(Role::Reseller)?;
    Ok(Json(state.warehouse.mark_skipped(reseller_id, item_id).await?))
}

async fn mark_damaged(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<WarehouseItem>, AppError> {
    let reseller_id = claims.require(Role::Reseller)?;
    Ok(Json(state.warehouse.mark_damaged(reseller_id, item_id).await?))
}

async fn delete_item(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(item_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let reseller_id = claims.require(Role::Reseller)?;
    state.warehouse.delete(reseller_id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ResellerMetrics>, AppError> {
    let reseller_id = claims.require(Role::Reseller)?;
    Ok(Json(state.reports.get_reseller_metrics(reseller_id).await?))
}
