//! Order repository, including the checkout transaction.
//!
//! Checkout locks every product in the cart (`SELECT ... FOR UPDATE`, in
//! product ID order so concurrent checkouts lock in the same order), then
//! decrements stock with a conditional `UPDATE ... WHERE stock >= $qty`.
//! Either every line is ordered and the cart is emptied, or nothing changes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use stockroom_core::{OrderId, OrderItemId, OrderStatus, PageRequest, ProductId, UserId};

use super::RepositoryError;
use crate::models::{Order, OrderItem};

const SELECT_ORDER: &str = r"
    SELECT o.id, o.user_id, u.name AS user_name, o.staff_id, s.name AS staff_name,
           o.status, o.total_amount, o.shipping_address, o.phone_number,
           o.special_instructions, o.preferred_delivery_date, o.created_at, o.updated_at
    FROM shop.customer_order o
    JOIN shop.user u ON u.id = o.user_id
    LEFT JOIN shop.user s ON s.id = o.staff_id
";

const ORDER_FILTER: &str = r"
    WHERE ($1::int IS NULL OR o.user_id = $1)
      AND ($2::shop.order_status IS NULL OR o.status = $2)
      AND ($3::timestamptz IS NULL OR o.created_at >= $3)
      AND ($4::timestamptz IS NULL OR o.created_at <= $4)
";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    user_name: String,
    staff_id: Option<UserId>,
    staff_name: Option<String>,
    status: OrderStatus,
    total_amount: Decimal,
    shipping_address: String,
    phone_number: Option<String>,
    special_instructions: Option<String>,
    preferred_delivery_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, order_items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            user_id: self.user_id,
            user_name: self.user_name,
            staff_id: self.staff_id,
            staff_name: self.staff_name,
            status: self.status,
            total_amount: self.total_amount,
            shipping_address: self.shipping_address,
            phone_number: self.phone_number,
            special_instructions: self.special_instructions,
            preferred_delivery_date: self.preferred_delivery_date,
            order_items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    product_name: String,
    quantity: i32,
    price: Decimal,
}

#[derive(sqlx::FromRow)]
struct LockedCartLine {
    product_id: ProductId,
    product_name: String,
    price: Decimal,
    stock: i32,
    active: bool,
    quantity: i32,
}

/// Delivery details captured at checkout.
#[derive(Debug, Clone)]
pub struct CheckoutDetails {
    pub shipping_address: String,
    pub phone_number: Option<String>,
    pub special_instructions: Option<String>,
    pub preferred_delivery_date: Option<DateTime<Utc>>,
}

/// Admin order search filters. `None` disables a filter; dates are inclusive.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<UserId>,
    pub status: Option<OrderStatus>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Reasons a checkout transaction is rolled back.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: i32,
        available: i32,
    },

    #[error("{0} is no longer available")]
    ProductUnavailable(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Repository for `shop.customer_order` and `shop.order_item`.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Convert the caller's cart into a `PENDING` order.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` when there is nothing to order,
    /// `CheckoutError::InsufficientStock` or `ProductUnavailable` when a line
    /// cannot be fulfilled, and `CheckoutError::Repository` on database failure.
    /// The transaction is rolled back in every error case.
    pub async fn checkout(
        &self,
        user_id: UserId,
        details: &CheckoutDetails,
    ) -> Result<Order, CheckoutError> {
        let mut tx = self.pool.begin().await?;

        let lines: Vec<LockedCartLine> = sqlx::query_as(
            r"
            SELECT ci.product_id, p.name AS product_name, p.price, p.stock, p.active, ci.quantity
            FROM shop.cart_item ci
            JOIN shop.product p ON p.id = ci.product_id
            WHERE ci.user_id = $1
            ORDER BY p.id
            FOR UPDATE OF p
            ",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let (order_id,): (OrderId,) = sqlx::query_as(
            r"
            INSERT INTO shop.customer_order
                (user_id, status, total_amount, shipping_address, phone_number,
                 special_instructions, preferred_delivery_date)
            VALUES ($1, 'PENDING', 0, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(user_id)
        .bind(&details.shipping_address)
        .bind(details.phone_number.as_deref())
        .bind(details.special_instructions.as_deref())
        .bind(details.preferred_delivery_date)
        .fetch_one(&mut *tx)
        .await?;

        let mut total = Decimal::ZERO;
        for line in &lines {
            if !line.active {
                return Err(CheckoutError::ProductUnavailable(line.product_name.clone()));
            }

            let decremented: Option<(i32,)> = sqlx::query_as(
                r"
                UPDATE shop.product SET stock = stock - $1
                WHERE id = $2 AND stock >= $1
                RETURNING stock
                ",
            )
            .bind(line.quantity)
            .bind(line.product_id)
            .fetch_optional(&mut *tx)
            .await?;

            if decremented.is_none() {
                return Err(CheckoutError::InsufficientStock {
                    product: line.product_name.clone(),
                    requested: line.quantity,
                    available: line.stock,
                });
            }

            sqlx::query(
                r"
                INSERT INTO shop.order_item (order_id, product_id, quantity, price)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.price)
            .execute(&mut *tx)
            .await?;

            total += line.price * Decimal::from(line.quantity);
        }

        sqlx::query("UPDATE shop.customer_order SET total_amount = $2 WHERE id = $1")
            .bind(order_id)
            .bind(total)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM shop.cart_item WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(self.get(order_id).await?.ok_or(RepositoryError::NotFound)?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!("{SELECT_ORDER} WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.attach_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Orders placed by a customer, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_customer(
        &self,
        user_id: UserId,
        limit: Option<i64>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "{SELECT_ORDER} WHERE o.user_id = $1 ORDER BY o.created_at DESC, o.id DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        self.attach_items(rows).await
    }

    /// Orders assigned to a staff member, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_staff(&self, staff_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "{SELECT_ORDER} WHERE o.staff_id = $1 ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(staff_id)
        .fetch_all(self.pool)
        .await?;
        self.attach_items(rows).await
    }

    /// Orders assigned to a staff member that were placed today (UTC).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_today_for_staff(
        &self,
        staff_id: UserId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            r"{SELECT_ORDER}
            WHERE o.staff_id = $1
              AND o.created_at >= date_trunc('day', NOW(), 'UTC')
            ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(staff_id)
        .fetch_all(self.pool)
        .await?;
        self.attach_items(rows).await
    }

    /// Orders in a status, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "{SELECT_ORDER} WHERE o.status = $1 ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(status)
        .fetch_all(self.pool)
        .await?;
        self.attach_items(rows).await
    }

    /// Filtered page of all orders plus the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<(Vec<Order>, u64), RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "{SELECT_ORDER} {ORDER_FILTER} ORDER BY o.created_at DESC, o.id DESC LIMIT $5 OFFSET $6"
        ))
        .bind(filter.user_id)
        .bind(filter.status)
        .bind(filter.start)
        .bind(filter.end)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM shop.customer_order o {ORDER_FILTER}"
        ))
        .bind(filter.user_id)
        .bind(filter.status)
        .bind(filter.start)
        .bind(filter.end)
        .fetch_one(self.pool)
        .await?;

        let orders = self.attach_items(rows).await?;
        Ok((orders, u64::try_from(total.0).unwrap_or(0)))
    }

    /// Move an order from `from` to `to`, restocking every item when the
    /// new status is `CANCELLED`.
    ///
    /// The update only applies while the order is still in `from`, so two
    /// concurrent transitions cannot both succeed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order's status changed
    /// since it was read, or `RepositoryError::Database` on failure.
    pub async fn transition(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE shop.customer_order SET status = $3 WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "order {id} is no longer {from}"
            )));
        }

        if to == OrderStatus::Cancelled {
            sqlx::query(
                r"
                UPDATE shop.product p SET stock = p.stock + oi.quantity
                FROM shop.order_item oi
                WHERE oi.order_id = $1 AND p.id = oi.product_id
                ",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn assign(&self, id: OrderId, staff_id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE shop.customer_order SET staff_id = $2 WHERE id = $1")
            .bind(id)
            .bind(staff_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Load items for a batch of orders, preserving the order of `rows`.
    async fn attach_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<OrderId> = rows.iter().map(|r| r.id).collect();
        let items: Vec<OrderItemRow> = sqlx::query_as(
            r"
            SELECT oi.id, oi.order_id, oi.product_id, p.name AS product_name,
                   oi.quantity, oi.price
            FROM shop.order_item oi
            JOIN shop.product p ON p.id = oi.product_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.id
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(OrderItem {
                id: item.id,
                product_id: item.product_id,
                product_name: item.product_name,
                quantity: item.quantity,
                price: item.price,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect())
    }
}
