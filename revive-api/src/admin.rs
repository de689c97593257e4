use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use revive_catalog::{DrainReport, QualityRating};
use revive_shared::models::{AdminMetrics, Role, TrustState, User};

use crate::error::AppError;
use crate::middleware::Claims;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Both values on the 0-100 quality scale.
#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub declared_quality: f64,
    pub actual_quality: f64,
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub repaired: usize,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/blacklist", get(blacklisted_users))
        .route("/admin/suppliers/{id}/ratings", post(record_rating))
        .route("/admin/trust-outbox/drain", post(drain_outbox))
        .route("/admin/warehouse/reconcile", post(reconcile_warehouse))
}

// ============================================================================
// Handlers
// ============================================================================

async fn dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<AdminMetrics>, AppError> {
    claims.require(Role::Admin)?;
    Ok(Json(state.reports.get_admin_dashboard_metrics().await?))
}

async fn blacklisted_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<User>>, AppError> {
    claims.require(Role::Admin)?;
    Ok(Json(state.reports.list_blacklisted_users().await?))
}

/// POST /admin/suppliers/{id}/ratings
/// Applies a quality rating directly, bypassing the outbox.
async fn record_rating(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(supplier_id): Path<Uuid>,
    Json(req): Json<RatingRequest>,
) -> Result<Json<TrustState>, AppError> {
    claims.require(Role::Admin)?;
    let declared = QualityRating::new(req.declared_quality)?;
    let actual = QualityRating::new(req.actual_quality)?;
    Ok(Json(
        state
            .trust
            .update_supplier_trust_score_on_new_rating(supplier_id, declared, actual)
            .await?,
    ))
}

/// POST /admin/trust-outbox/drain
/// Runs one relay pass now instead of waiting for the worker.
async fn drain_outbox(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DrainReport>, AppError> {
    claims.require(Role::Admin)?;
    Ok(Json(state.outbox_relay.drain_once().await?))
}

async fn reconcile_warehouse(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ReconcileResponse>, AppError> {
    claims.require(Role::Admin)?;
    let repaired = state.warehouse.reconcile().await?;
    Ok(Json(ReconcileResponse { repaired }))
}
