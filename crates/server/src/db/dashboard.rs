//! Aggregate queries behind the role dashboards.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use stockroom_core::{OrderStatus, Role, UserId};

use super::RepositoryError;

/// Revenue for one calendar month (UTC).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MonthRevenue {
    pub month_start: DateTime<Utc>,
    pub revenue: Decimal,
}

/// Read-only aggregate queries.
pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_users(&self, role: Role) -> Result<i64, RepositoryError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shop.user WHERE role = $1")
            .bind(role)
            .fetch_one(self.pool)
            .await?;
        Ok(row.0)
    }

    /// Sum of delivered order totals.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn total_sales(&self) -> Result<Decimal, RepositoryError> {
        let row: (Decimal,) = sqlx::query_as(
            "SELECT COALESCE(SUM(total_amount), 0) FROM shop.customer_order WHERE status = 'DELIVERED'",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(row.0)
    }

    /// Revenue of non-cancelled orders per month since `since`.
    ///
    /// Months without orders are absent from the result.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn monthly_revenue(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<MonthRevenue>, RepositoryError> {
        let rows: Vec<MonthRevenue> = sqlx::query_as(
            r"
            SELECT date_trunc('month', created_at, 'UTC') AS month_start,
                   SUM(total_amount) AS revenue
            FROM shop.customer_order
            WHERE status <> 'CANCELLED' AND created_at >= $1
            GROUP BY 1
            ORDER BY 1
            ",
        )
        .bind(since)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_customer_orders(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM shop.customer_order WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(self.pool)
                .await?;
        Ok(row.0)
    }

    /// Orders assigned to `staff_id` in `status`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_assigned(
        &self,
        staff_id: UserId,
        status: OrderStatus,
    ) -> Result<i64, RepositoryError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM shop.customer_order WHERE staff_id = $1 AND status = $2",
        )
        .bind(staff_id)
        .bind(status)
        .fetch_one(self.pool)
        .await?;
        Ok(row.0)
    }
}
