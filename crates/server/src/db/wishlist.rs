//! Wishlist repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use stockroom_core::{ProductId, UserId, WishlistItemId};

use super::RepositoryError;
use crate::models::WishlistEntry;

#[derive(sqlx::FromRow)]
struct WishlistRow {
    id: WishlistItemId,
    product_id: ProductId,
    product_name: String,
    product_price: Decimal,
    product_image: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<WishlistRow> for WishlistEntry {
    fn from(r: WishlistRow) -> Self {
        Self {
            id: r.id,
            product_id: r.product_id,
            product_name: r.product_name,
            product_price: r.product_price,
            product_image: r.product_image,
            created_at: r.created_at,
        }
    }
}

const SELECT_WISHLIST: &str = r"
    SELECT w.id, w.product_id, p.name AS product_name, p.price AS product_price,
           (SELECT i.image_url FROM shop.product_image i
            WHERE i.product_id = p.id
            ORDER BY i.is_primary DESC, i.id LIMIT 1) AS product_image,
           w.created_at
    FROM shop.wishlist_item w
    JOIN shop.product p ON p.id = w.product_id
";

/// Repository for `shop.wishlist_item`.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<WishlistEntry>, RepositoryError> {
        let rows: Vec<WishlistRow> = sqlx::query_as(&format!(
            "{SELECT_WISHLIST} WHERE w.user_id = $1 ORDER BY w.created_at DESC, w.id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(WishlistEntry::from).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shop.wishlist_item WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;
        Ok(row.0)
    }

    /// Owner of an entry, if it exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn owner_of(&self, id: WishlistItemId) -> Result<Option<UserId>, RepositoryError> {
        let row: Option<(UserId,)> =
            sqlx::query_as("SELECT user_id FROM shop.wishlist_item WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(row.map(|r| r.0))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product is already saved.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<WishlistEntry, RepositoryError> {
        let (id,): (WishlistItemId,) = sqlx::query_as(
            "INSERT INTO shop.wishlist_item (user_id, product_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "product already in wishlist"))?;

        let row: WishlistRow = sqlx::query_as(&format!("{SELECT_WISHLIST} WHERE w.id = $1"))
            .bind(id)
            .fetch_one(self.pool)
            .await?;
        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the entry doesn't exist.
    pub async fn remove(&self, id: WishlistItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.wishlist_item WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
