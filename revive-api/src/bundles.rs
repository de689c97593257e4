use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use uuid::Uuid;

use revive_shared::models::{Bundle, BundleDraft, BundlePatch, DashboardMetrics, Order, Role};

use crate::error::AppError;
use crate::middleware::Claims;
use crate::state::AppState;

/// Browsing available bundles needs no token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/bundles", get(list_available_bundles))
        .route("/bundles/{id}", get(get_bundle_public))
}

pub fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/supplier/bundles", get(list_my_bundles).post(create_bundle))
        .route(
            "/supplier/bundles/{id}",
            get(get_my_bundle).patch(update_bundle).delete(delete_bundle),
        )
        .route("/supplier/dashboard", get(dashboard))
        .route("/supplier/sold-history", get(sold_history))
}

async fn list_available_bundles(State(state): State<AppState>) -> Result<Json<Vec<Bundle>>, AppError> {
    Ok(Json(state.lifecycle.list_available().await?))
}

async fn get_bundle_public(
    State(state): State<AppState>,
    Path(bundle_id): Path<Uuid>,
) -> Result<Json<Bundle>, AppError> {
    Ok(Json(state.lifecycle.get_bundle_public(bundle_id).await?))
}

/// POST /supplier/bundles
async fn create_bundle(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(draft): Json<BundleDraft>,
) -> Result<(StatusCode, Json<Bundle>), AppError> {
    let supplier_id = claims.require(Role::Supplier)?;
    let bundle = state.lifecycle.create_bundle(supplier_id, Bundle::new(supplier_id, draft)).await?;
    Ok((StatusCode::CREATED, Json(bundle)))
}

async fn list_my_bundles(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Bundle>>, AppError> {
    let supplier_id = claims.require(Role::Supplier)?;
    Ok(Json(state.lifecycle.list_bundles(supplier_id).await?))
}

async fn get_my_bundle(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(bundle_id): Path<Uuid>,
) -> Result<Json<Bundle>, AppError> {
    let supplier_id = claims.require(Role::Supplier)?;
    Ok(Json(state.lifecycle.get_bundle(supplier_id, bundle_id).await?))
}

/// PATCH /supplier/bundles/{id}
/// Only bundles that are still available can be edited.
async fn update_bundle(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(bundle_id): Path<Uuid>,
    Json(patch): Json<BundlePatch>,
) -> Result<Json<Bundle>, AppError> {
    let supplier_id = claims.require(Role::Supplier)?;
    Ok(Json(state.lifecycle.update_bundle(supplier_id, bundle_id, &patch).await?))
}

/// DELETE /supplier/bundles/{id}
/// Deactivates; bundles are never physically removed.
async fn delete_bundle(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(bundle_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let supplier_id = claims.require(Role::Supplier)?;
    state.lifecycle.delete_bundle(supplier_id, bundle_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DashboardMetrics>, AppError> {
    let supplier_id = claims.require(Role::Supplier)?;
    Ok(Json(state.reports.get_dashboard_metrics(supplier_id).await?))
}

async fn sold_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Order>>, AppError> {
    let supplier_id = claims.require(Role::Supplier)?;
    Ok(Json(state.reports.get_sold_bundle_history(supplier_id).await?))
}
