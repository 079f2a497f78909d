//! Product review route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Deserialize;

use stockroom_core::{ProductId, ReviewId};

use crate::error::Result;
use crate::middleware::RequireCustomer;
use crate::models::Review;
use crate::services::reviews::ReviewService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products/{id}/reviews", get(for_product))
        .route("/api/customer/reviews", post(create))
        .route("/api/customer/reviews/{id}", put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub product_id: ProductId,
    pub rating: i16,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: Option<i16>,
    pub comment: Option<String>,
}

/// Reviews for a product, newest first.
///
/// # Errors
///
/// Returns 404 if the product doesn't exist.
pub async fn for_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Vec<Review>>> {
    Ok(Json(ReviewService::new(state.pool()).for_product(id).await?))
}

/// # Errors
///
/// Returns 403 if the caller never bought the product, 409 for a second
/// review, 400 for a rating outside 1..=5.
pub async fn create(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
    Json(body): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>)> {
    let review = ReviewService::new(state.pool())
        .create(
            customer.id,
            body.product_id,
            body.rating,
            body.comment.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// # Errors
///
/// Returns 403 for someone else's review.
pub async fn update(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
    Json(body): Json<UpdateReviewRequest>,
) -> Result<Json<Review>> {
    let review = ReviewService::new(state.pool())
        .update(customer.id, id, body.rating, body.comment.as_deref())
        .await?;
    Ok(Json(review))
}

/// # Errors
///
/// Returns 403 for someone else's review.
pub async fn remove(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
) -> Result<StatusCode> {
    ReviewService::new(state.pool())
        .delete(customer.id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
