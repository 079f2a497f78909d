//! Customer wishlist route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};

use stockroom_core::{ProductId, WishlistItemId};

use crate::error::Result;
use crate::middleware::RequireCustomer;
use crate::models::WishlistEntry;
use crate::services::wishlist::WishlistService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/customer/wishlist", get(list))
        .route("/api/customer/wishlist/add/{product_id}", post(add))
        .route("/api/customer/wishlist/{id}", delete(remove))
}

/// # Errors
///
/// Returns 500 if the query fails.
pub async fn list(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
) -> Result<Json<Vec<WishlistEntry>>> {
    Ok(Json(WishlistService::new(state.pool()).list(customer.id).await?))
}

/// # Errors
///
/// Returns 404 for an unknown product, 409 if it is already saved.
pub async fn add(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<(StatusCode, Json<WishlistEntry>)> {
    let entry = WishlistService::new(state.pool())
        .add(customer.id, product_id)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// # Errors
///
/// Returns 403 for someone else's entry.
pub async fn remove(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
    Path(id): Path<WishlistItemId>,
) -> Result<StatusCode> {
    WishlistService::new(state.pool())
        .remove(customer.id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
