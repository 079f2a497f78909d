//! Notification repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use stockroom_core::{NotificationId, NotificationType, UserId};

use super::{RepositoryError, like_pattern};
use crate::models::Notification;

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: NotificationId,
    user_id: UserId,
    message: String,
    #[sqlx(rename = "type")]
    kind: NotificationType,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(r: NotificationRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            message: r.message,
            kind: r.kind,
            is_read: r.is_read,
            created_at: r.created_at,
        }
    }
}

/// Repository for `shop.notification`.
pub struct NotificationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        message: &str,
        kind: NotificationType,
    ) -> Result<Notification, RepositoryError> {
        let row: NotificationRow = sqlx::query_as(
            r"
            INSERT INTO shop.notification (user_id, message, type)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, message, type, is_read, created_at
            ",
        )
        .bind(user_id)
        .bind(message)
        .bind(kind)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    /// A user's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Notification>, RepositoryError> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            r"
            SELECT id, user_id, message, type, is_read, created_at
            FROM shop.notification
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: NotificationId) -> Result<Option<Notification>, RepositoryError> {
        let row: Option<NotificationRow> = sqlx::query_as(
            "SELECT id, user_id, message, type, is_read, created_at FROM shop.notification WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Notification::from))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unread_count(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM shop.notification WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(row.0)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the notification doesn't exist.
    pub async fn mark_read(&self, id: NotificationId) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE shop.notification SET is_read = TRUE WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Returns how many notifications changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_all_read(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.notification SET is_read = TRUE WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Whether the user still has an unread low-stock alert for `product_name`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_unread_low_stock(
        &self,
        user_id: UserId,
        product_name: &str,
    ) -> Result<bool, RepositoryError> {
        let row: (bool,) = sqlx::query_as(
            r"
            SELECT EXISTS(
                SELECT 1 FROM shop.notification
                WHERE user_id = $1 AND type = 'LOW_STOCK' AND NOT is_read
                  AND message ILIKE $2
            )
            ",
        )
        .bind(user_id)
        .bind(like_pattern(product_name))
        .fetch_one(self.pool)
        .await?;
        Ok(row.0)
    }
}
