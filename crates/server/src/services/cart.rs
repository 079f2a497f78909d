//! Customer cart rules: active products only, quantities backed by stock,
//! and lines editable only by their owner.

use sqlx::PgPool;
use thiserror::Error;

use stockroom_core::{CartItemId, ProductId, UserId};

use crate::db::cart::CartItemRecord;
use crate::db::{CartRepository, ProductRepository, RepositoryError};
use crate::models::CartLine;

#[derive(Debug, Error)]
pub enum CartError {
    #[error("product not found")]
    ProductNotFound,

    #[error("product is not available")]
    ProductInactive,

    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("only {available} units of {product} in stock")]
    InsufficientStock { product: String, available: i32 },

    #[error("cart item not found")]
    ItemNotFound,

    #[error("cart item belongs to another user")]
    NotOwner,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct CartService<'a> {
    cart: CartRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            cart: CartRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// # Errors
    ///
    /// Returns `CartError::Repository` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<CartLine>, CartError> {
        Ok(self.cart.list(user_id).await?)
    }

    /// Add a product, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity`, `ProductNotFound`,
    /// `ProductInactive`, or `InsufficientStock` when the merged quantity
    /// exceeds current stock.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartLine, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }

        let product = self
            .products
            .get(product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;
        if !product.active {
            return Err(CartError::ProductInactive);
        }

        let existing = self.cart.quantity_of(user_id, product_id).await?.unwrap_or(0);
        let wanted = existing.saturating_add(quantity);
        if product.stock < wanted {
            return Err(CartError::InsufficientStock {
                product: product.name,
                available: product.stock,
            });
        }

        let record = self.cart.add(user_id, product_id, quantity).await?;
        self.line(user_id, record.id).await
    }

    /// Replace a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound`, `NotOwner`, `InvalidQuantity`, or
    /// `InsufficientStock`.
    pub async fn update(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<CartLine, CartError> {
        let item = self.owned_item(user_id, item_id).await?;
        if quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }

        let product = self
            .products
            .stock_level(item.product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;
        if product.stock < quantity {
            return Err(CartError::InsufficientStock {
                product: product.name,
                available: product.stock,
            });
        }

        self.cart.set_quantity(item_id, quantity).await?;
        self.line(user_id, item_id).await
    }

    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` or `NotOwner`.
    pub async fn remove(&self, user_id: UserId, item_id: CartItemId) -> Result<(), CartError> {
        self.owned_item(user_id, item_id).await?;
        self.cart.remove(item_id).await.map_err(|e| match e {
            RepositoryError::NotFound => CartError::ItemNotFound,
            other => other.into(),
        })
    }

    /// # Errors
    ///
    /// Returns `CartError::Repository` if the delete fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), CartError> {
        let removed = self.cart.clear(user_id).await?;
        tracing::debug!(user_id = %user_id, removed, "Cart cleared");
        Ok(())
    }

    async fn line(&self, user_id: UserId, item_id: CartItemId) -> Result<CartLine, CartError> {
        self.list(user_id)
            .await?
            .into_iter()
            .find(|line| line.id == item_id)
            .ok_or(CartError::ItemNotFound)
    }

    async fn owned_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<CartItemRecord, CartError> {
        let item = self
            .cart
            .get(item_id)
            .await?
            .ok_or(CartError::ItemNotFound)?;
        if item.user_id != user_id {
            return Err(CartError::NotOwner);
        }
        Ok(item)
    }
}
