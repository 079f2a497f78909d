//! Product and product image repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use stockroom_core::{
    CategoryId, LOW_STOCK_ALERT_THRESHOLD, PageRequest, ProductId, ProductImageId, StockStatus,
};

use super::{RepositoryError, like_pattern};
use crate::models::{Product, ProductImage};

const SELECT_PRODUCT: &str = r"
    SELECT p.id, p.name, p.description, p.price, p.stock, p.active, p.category_id,
           c.name AS category_name, p.created_at, p.updated_at,
           COALESCE(
               (SELECT array_agg(i.image_url ORDER BY i.is_primary DESC, i.id)
                FROM shop.product_image i WHERE i.product_id = p.id),
               '{}'
           ) AS image_urls,
           (SELECT AVG(r.rating)::float8 FROM shop.review r WHERE r.product_id = p.id)
               AS average_rating,
           (SELECT COUNT(*) FROM shop.review r WHERE r.product_id = p.id) AS review_count
    FROM shop.product p
    JOIN shop.category c ON c.id = p.category_id
";

const PRODUCT_FILTER: &str = r"
    WHERE ($1::text IS NULL OR p.name ILIKE $1)
      AND ($2::int IS NULL OR p.category_id = $2)
      AND ($3::numeric IS NULL OR p.price >= $3)
      AND ($4::numeric IS NULL OR p.price <= $4)
      AND ($5::bool IS NULL OR p.active = $5)
";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: Option<String>,
    price: Decimal,
    stock: i32,
    active: bool,
    category_id: CategoryId,
    category_name: String,
    image_urls: Vec<String>,
    average_rating: Option<f64>,
    review_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            price: r.price,
            stock: r.stock,
            active: r.active,
            stock_status: StockStatus::from_stock(r.stock),
            category_id: r.category_id,
            category_name: r.category_name,
            image_urls: r.image_urls,
            average_rating: r.average_rating,
            review_count: r.review_count,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductImageRow {
    id: ProductImageId,
    product_id: ProductId,
    image_url: String,
    is_primary: bool,
    created_at: DateTime<Utc>,
}

impl From<ProductImageRow> for ProductImage {
    fn from(r: ProductImageRow) -> Self {
        Self {
            id: r.id,
            product_id: r.product_id,
            image_url: r.image_url,
            is_primary: r.is_primary,
            created_at: r.created_at,
        }
    }
}

/// Column a product listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    CreatedAt,
    Name,
    Price,
    Stock,
}

impl ProductSort {
    /// Parse the `sortBy` query value; unknown values fall back to `createdAt`.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("name") => Self::Name,
            Some("price") => Self::Price,
            Some("stock") => Self::Stock,
            _ => Self::CreatedAt,
        }
    }

    const fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "p.created_at",
            Self::Name => "p.name",
            Self::Price => "p.price",
            Self::Stock => "p.stock",
        }
    }
}

/// Filters for product listings. `None` disables a filter.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub name: Option<String>,
    pub category_id: Option<CategoryId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub active: Option<bool>,
    pub sort: ProductSort,
    pub descending: bool,
}

/// Fields for a new product.
#[derive(Debug)]
pub struct NewProduct<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub price: Decimal,
    pub stock: i32,
    pub category_id: CategoryId,
    pub active: bool,
}

/// Partial product update; `None` leaves a column unchanged.
#[derive(Debug, Default)]
pub struct ProductChanges<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub category_id: Option<CategoryId>,
    pub active: Option<bool>,
}

/// A product whose stock is under the alert threshold.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LowStockProduct {
    pub id: ProductId,
    pub name: String,
    pub stock: i32,
}

/// Repository for `shop.product` and `shop.product_image`.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!("{SELECT_PRODUCT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Product::from))
    }

    /// Filtered, sorted page of products plus the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<(Vec<Product>, u64), RepositoryError> {
        let pattern = filter
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(like_pattern);
        let direction = if filter.descending { "DESC" } else { "ASC" };

        let sql = format!(
            "{SELECT_PRODUCT} {PRODUCT_FILTER} ORDER BY {} {direction}, p.id {direction} LIMIT $6 OFFSET $7",
            filter.sort.column()
        );
        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(pattern.as_deref())
            .bind(filter.category_id)
            .bind(filter.min_price)
            .bind(filter.max_price)
            .bind(filter.active)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;

        let total: (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM shop.product p {PRODUCT_FILTER}"))
                .bind(pattern.as_deref())
                .bind(filter.category_id)
                .bind(filter.min_price)
                .bind(filter.max_price)
                .bind(filter.active)
                .fetch_one(self.pool)
                .await?;

        Ok((
            rows.into_iter().map(Product::from).collect(),
            u64::try_from(total.0).unwrap_or(0),
        ))
    }

    /// Active products in a category, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active_by_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "{SELECT_PRODUCT} WHERE p.category_id = $1 AND p.active ORDER BY p.created_at DESC, p.id DESC"
        ))
        .bind(category_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Every product ordered by ID, for reports.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!("{SELECT_PRODUCT} ORDER BY p.id"))
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the category doesn't exist.
    pub async fn create(&self, new: NewProduct<'_>) -> Result<ProductId, RepositoryError> {
        let row: (ProductId,) = sqlx::query_as(
            r"
            INSERT INTO shop.product (name, description, price, stock, category_id, active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(new.name)
        .bind(new.description)
        .bind(new.price)
        .bind(new.stock)
        .bind(new.category_id)
        .bind(new.active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "category does not exist"))?;

        Ok(row.0)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn update(
        &self,
        id: ProductId,
        changes: ProductChanges<'_>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.product SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                stock = COALESCE($5, stock),
                category_id = COALESCE($6, category_id),
                active = COALESCE($7, active)
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.price)
        .bind(changes.stock)
        .bind(changes.category_id)
        .bind(changes.active)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "category does not exist"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if the product appears in orders.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_constraint(e, "product has been ordered"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Products under the alert threshold, lowest stock first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_low_stock(&self) -> Result<Vec<LowStockProduct>, RepositoryError> {
        let rows: Vec<LowStockProduct> = sqlx::query_as(
            "SELECT id, name, stock FROM shop.product WHERE stock < $1 ORDER BY stock, id",
        )
        .bind(LOW_STOCK_ALERT_THRESHOLD)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Name and stock for a single product, for the low-stock check.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stock_level(
        &self,
        id: ProductId,
    ) -> Result<Option<LowStockProduct>, RepositoryError> {
        let row: Option<LowStockProduct> =
            sqlx::query_as("SELECT id, name, stock FROM shop.product WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(row)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shop.product")
            .fetch_one(self.pool)
            .await?;
        Ok(row.0)
    }

    /// Full product records under the alert threshold, lowest stock first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn low_stock_details(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "{SELECT_PRODUCT} WHERE p.stock < $1 ORDER BY p.stock, p.id LIMIT $2"
        ))
        .bind(LOW_STOCK_ALERT_THRESHOLD)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Products ranked by total quantity ordered, excluding cancelled orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn most_sold(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            r"
            WITH sold AS (
                SELECT oi.product_id, SUM(oi.quantity) AS quantity
                FROM shop.order_item oi
                JOIN shop.customer_order o ON o.id = oi.order_id
                WHERE o.status <> 'CANCELLED'
                GROUP BY oi.product_id
            )
            {SELECT_PRODUCT}
            JOIN sold s ON s.product_id = p.id
            ORDER BY s.quantity DESC, p.id
            LIMIT $1
            "
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_images(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ProductImage>, RepositoryError> {
        let rows: Vec<ProductImageRow> = sqlx::query_as(
            r"
            SELECT id, product_id, image_url, is_primary, created_at
            FROM shop.product_image
            WHERE product_id = $1
            ORDER BY is_primary DESC, id
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(ProductImage::from).collect())
    }

    /// Attach an image. The image becomes primary when the product has none.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn add_image(
        &self,
        product_id: ProductId,
        image_url: &str,
    ) -> Result<ProductImage, RepositoryError> {
        let row: ProductImageRow = sqlx::query_as(
            r"
            INSERT INTO shop.product_image (product_id, image_url, is_primary)
            VALUES (
                $1, $2,
                NOT EXISTS (SELECT 1 FROM shop.product_image WHERE product_id = $1 AND is_primary)
            )
            RETURNING id, product_id, image_url, is_primary, created_at
            ",
        )
        .bind(product_id)
        .bind(image_url)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    /// Delete an image belonging to `product_id`, promoting the oldest
    /// remaining image when the primary was removed.
    ///
    /// Returns the deleted image so its file can be removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the image doesn't belong to the product.
    pub async fn delete_image(
        &self,
        product_id: ProductId,
        image_id: ProductImageId,
    ) -> Result<ProductImage, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<ProductImageRow> = sqlx::query_as(
            r"
            DELETE FROM shop.product_image
            WHERE id = $1 AND product_id = $2
            RETURNING id, product_id, image_url, is_primary, created_at
            ",
        )
        .bind(image_id)
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?;

        let image = ProductImage::from(row.ok_or(RepositoryError::NotFound)?);

        if image.is_primary {
            sqlx::query(
                r"
                UPDATE shop.product_image SET is_primary = TRUE
                WHERE id = (
                    SELECT id FROM shop.product_image WHERE product_id = $1 ORDER BY id LIMIT 1
                )
                ",
            )
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_parse_whitelist() {
        assert_eq!(ProductSort::parse(Some("price")), ProductSort::Price);
        assert_eq!(ProductSort::parse(Some("name")), ProductSort::Name);
        assert_eq!(ProductSort::parse(Some("stock")), ProductSort::Stock);
        assert_eq!(ProductSort::parse(Some("createdAt")), ProductSort::CreatedAt);
        assert_eq!(
            ProductSort::parse(Some("price; DROP TABLE shop.product")),
            ProductSort::CreatedAt
        );
        assert_eq!(ProductSort::parse(None), ProductSort::CreatedAt);
    }

    #[test]
    fn test_sort_columns_are_qualified() {
        for sort in [
            ProductSort::CreatedAt,
            ProductSort::Name,
            ProductSort::Price,
            ProductSort::Stock,
        ] {
            assert!(sort.column().starts_with("p."));
        }
    }
}
