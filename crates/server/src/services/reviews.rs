//! Product reviews. Only customers who bought a product may review it, once.

use sqlx::PgPool;
use thiserror::Error;

use stockroom_core::{ProductId, ReviewId, UserId};

use crate::db::{ProductRepository, RepositoryError, ReviewRepository};
use crate::models::Review;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("product not found")]
    ProductNotFound,

    #[error("you can only review products you have purchased")]
    NotPurchased,

    #[error("you have already reviewed this product")]
    AlreadyReviewed,

    #[error("rating must be between 1 and 5")]
    InvalidRating,

    #[error("review not found")]
    NotFound,

    #[error("review belongs to another user")]
    NotOwner,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

fn validate_rating(rating: i16) -> Result<(), ReviewError> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(ReviewError::InvalidRating)
    }
}

pub struct ReviewService<'a> {
    reviews: ReviewRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            reviews: ReviewRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// Reviews for a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::ProductNotFound` if the product doesn't exist.
    pub async fn for_product(&self, product_id: ProductId) -> Result<Vec<Review>, ReviewError> {
        self.products
            .stock_level(product_id)
            .await?
            .ok_or(ReviewError::ProductNotFound)?;
        Ok(self.reviews.list_for_product(product_id).await?)
    }

    /// # Errors
    ///
    /// Returns `ReviewError::InvalidRating`, `ProductNotFound`,
    /// `NotPurchased`, or `AlreadyReviewed`.
    pub async fn create(
        &self,
        user_id: UserId,
        product_id: ProductId,
        rating: i16,
        comment: Option<&str>,
    ) -> Result<Review, ReviewError> {
        validate_rating(rating)?;
        self.products
            .stock_level(product_id)
            .await?
            .ok_or(ReviewError::ProductNotFound)?;

        if !self.reviews.has_purchased(user_id, product_id).await? {
            return Err(ReviewError::NotPurchased);
        }

        let review = self
            .reviews
            .create(user_id, product_id, rating, comment)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => ReviewError::AlreadyReviewed,
                other => other.into(),
            })?;
        tracing::info!(review_id = %review.id, product_id = %product_id, rating, "Review created");
        Ok(review)
    }

    /// # Errors
    ///
    /// Returns `ReviewError::NotFound`, `NotOwner`, or `InvalidRating`.
    pub async fn update(
        &self,
        user_id: UserId,
        id: ReviewId,
        rating: Option<i16>,
        comment: Option<&str>,
    ) -> Result<Review, ReviewError> {
        if let Some(rating) = rating {
            validate_rating(rating)?;
        }
        self.owned(user_id, id).await?;
        self.reviews
            .update(id, rating, comment)
            .await
            .map_err(not_found)
    }

    /// # Errors
    ///
    /// Returns `ReviewError::NotFound` or `NotOwner`.
    pub async fn delete(&self, user_id: UserId, id: ReviewId) -> Result<(), ReviewError> {
        self.owned(user_id, id).await?;
        self.reviews.delete(id).await.map_err(not_found)
    }

    async fn owned(&self, user_id: UserId, id: ReviewId) -> Result<Review, ReviewError> {
        let review = self.reviews.get(id).await?.ok_or(ReviewError::NotFound)?;
        if review.user_id != user_id {
            return Err(ReviewError::NotOwner);
        }
        Ok(review)
    }
}

fn not_found(err: RepositoryError) -> ReviewError {
    match err {
        RepositoryError::NotFound => ReviewError::NotFound,
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert!(matches!(validate_rating(0), Err(ReviewError::InvalidRating)));
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(matches!(validate_rating(6), Err(ReviewError::InvalidRating)));
    }
}
