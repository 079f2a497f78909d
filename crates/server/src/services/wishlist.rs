//! Customer wishlists.

use sqlx::PgPool;
use thiserror::Error;

use stockroom_core::{ProductId, UserId, WishlistItemId};

use crate::db::{ProductRepository, RepositoryError, WishlistRepository};
use crate::models::WishlistEntry;

#[derive(Debug, Error)]
pub enum WishlistError {
    #[error("product not found")]
    ProductNotFound,

    #[error("product is already in your wishlist")]
    AlreadyInWishlist,

    #[error("wishlist item not found")]
    NotFound,

    #[error("wishlist item belongs to another user")]
    NotOwner,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct WishlistService<'a> {
    wishlist: WishlistRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> WishlistService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            wishlist: WishlistRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// # Errors
    ///
    /// Returns `WishlistError::Repository` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<WishlistEntry>, WishlistError> {
        Ok(self.wishlist.list(user_id).await?)
    }

    /// # Errors
    ///
    /// Returns `WishlistError::Repository` if the query fails.
    pub async fn count(&self, user_id: UserId) -> Result<i64, WishlistError> {
        Ok(self.wishlist.count(user_id).await?)
    }

    /// # Errors
    ///
    /// Returns `WishlistError::ProductNotFound` or `AlreadyInWishlist`.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<WishlistEntry, WishlistError> {
        self.products
            .stock_level(product_id)
            .await?
            .ok_or(WishlistError::ProductNotFound)?;

        self.wishlist
            .add(user_id, product_id)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => WishlistError::AlreadyInWishlist,
                other => other.into(),
            })
    }

    /// # Errors
    ///
    /// Returns `WishlistError::NotFound` or `NotOwner`.
    pub async fn remove(&self, user_id: UserId, id: WishlistItemId) -> Result<(), WishlistError> {
        let owner = self
            .wishlist
            .owner_of(id)
            .await?
            .ok_or(WishlistError::NotFound)?;
        if owner != user_id {
            return Err(WishlistError::NotOwner);
        }

        self.wishlist.remove(id).await.map_err(|e| match e {
            RepositoryError::NotFound => WishlistError::NotFound,
            other => other.into(),
        })
    }
}
