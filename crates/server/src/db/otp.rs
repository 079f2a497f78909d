//! Password reset codes.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use stockroom_core::{Email, OtpCode};

use super::RepositoryError;

/// Repository for `shop.otp_token`.
pub struct OtpRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OtpRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a fresh code for `email`, removing every earlier code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either statement fails.
    pub async fn replace(
        &self,
        email: &Email,
        code: &OtpCode,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM shop.otp_token WHERE email = $1")
            .bind(email.as_str())
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO shop.otp_token (email, code, expires_at) VALUES ($1, $2, $3)")
            .bind(email.as_str())
            .bind(code)
            .bind(expires_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Whether an unused, unexpired code matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_valid(&self, email: &Email, code: &OtpCode) -> Result<bool, RepositoryError> {
        let row: (bool,) = sqlx::query_as(
            r"
            SELECT EXISTS(
                SELECT 1 FROM shop.otp_token
                WHERE email = $1 AND code = $2 AND NOT used AND expires_at > NOW()
            )
            ",
        )
        .bind(email.as_str())
        .bind(code)
        .fetch_one(self.pool)
        .await?;

        Ok(row.0)
    }

    /// Mark a matching code as used.
    ///
    /// Returns `false` when no unused, unexpired code matched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn consume(&self, email: &Email, code: &OtpCode) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.otp_token SET used = TRUE
            WHERE email = $1 AND code = $2 AND NOT used AND expires_at > NOW()
            ",
        )
        .bind(email.as_str())
        .bind(code)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove expired codes. Returns how many were deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.otp_token WHERE expires_at <= NOW()")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
