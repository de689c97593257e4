use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use revive_shared::models::{CartItem, CheckoutReceipt, Role};

use crate::error::AppError;
use crate::middleware::Claims;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddCartItemRequest {
    pub listing_id: Uuid,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(get_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/{listing_id}", delete(remove_item))
        .route("/cart/items/{listing_id}/checkout", post(checkout_item))
        .route("/cart/checkout", post(checkout_cart))
}

async fn get_cart(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<CartItem>>, AppError> {
    let user_id = claims.require(Role::Consumer)?;
    Ok(Json(state.checkout.get_cart_items(user_id).await?))
}

async fn add_item(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddCartItemRequest>,
) -> Result<(StatusCode, Json<CartItem>), AppError> {
    let user_id = claims.require(Role::Consumer)?;
    let item = state.checkout.add_cart_item(user_id, req.listing_id).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn remove_item(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(listing_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let user_id = claims.require(Role::Consumer)?;
    state.checkout.remove_cart_item(user_id, listing_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /cart/checkout
/// All or nothing: any unavailable item rejects the whole cart with 409.
async fn checkout_cart(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<CheckoutReceipt>, AppError> {
    let user_id = claims.require(Role::Consumer)?;
    Ok(Json(state.checkout.checkout_cart(user_id).await?))
}

async fn checkout_item(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(listing_id): Path<Uuid>,
) -> Result<Json<CheckoutReceipt>, AppError> {
    let user_id = claims.require(Role::Consumer)?;
    Ok(Json(state.checkout.checkout_single_item(user_id, listing_id).await?))
}
