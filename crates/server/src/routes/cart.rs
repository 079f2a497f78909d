//! Customer cart route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Deserialize;

use stockroom_core::{CartItemId, ProductId};

use crate::error::Result;
use crate::middleware::RequireCustomer;
use crate::models::CartLine;
use crate::services::cart::CartService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/customer/cart", get(list).delete(clear))
        .route("/api/customer/cart/add", post(add))
        .route("/api/customer/cart/{id}", put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: i32,
}

const fn one() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: i32,
}

/// # Errors
///
/// Returns 500 if the query fails.
pub async fn list(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
) -> Result<Json<Vec<CartLine>>> {
    Ok(Json(CartService::new(state.pool()).list(customer.id).await?))
}

/// Add a product, merging with an existing line.
///
/// # Errors
///
/// Returns 404 for unknown products, 400 for inactive products, bad
/// quantities, or insufficient stock.
pub async fn add(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
    Json(body): Json<AddToCartRequest>,
) -> Result<Json<CartLine>> {
    let line = CartService::new(state.pool())
        .add(customer.id, body.product_id, body.quantity)
        .await?;
    Ok(Json(line))
}

/// # Errors
///
/// Returns 403 when the line belongs to someone else.
pub async fn update(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
    Path(id): Path<CartItemId>,
    Json(body): Json<QuantityRequest>,
) -> Result<Json<CartLine>> {
    let line = CartService::new(state.pool())
        .update(customer.id, id, body.quantity)
        .await?;
    Ok(Json(line))
}

/// # Errors
///
/// Returns 403 when the line belongs to someone else.
pub async fn remove(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
    Path(id): Path<CartItemId>,
) -> Result<StatusCode> {
    CartService::new(state.pool()).remove(customer.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// # Errors
///
/// Returns 500 if the delete fails.
pub async fn clear(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
) -> Result<StatusCode> {
    CartService::new(state.pool()).clear(customer.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
