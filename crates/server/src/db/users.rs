//! User repository for database operations.
//!
//! Emails are stored lowercase (the [`Email`] type normalizes on parse), and
//! the unique index is on `LOWER(email)`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use stockroom_core::{Email, PageRequest, Role, ThemePreference, UserId};

use super::{RepositoryError, like_pattern};
use crate::models::User;

macro_rules! user_columns {
    () => {
        "id, name, email, phone, address, avatar_url, role, enabled, theme_preference, \
         email_notifications, push_notifications, created_at, updated_at"
    };
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    name: String,
    email: String,
    phone: Option<String>,
    address: Option<String>,
    avatar_url: Option<String>,
    role: Role,
    enabled: bool,
    theme_preference: String,
    email_notifications: bool,
    push_notifications: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let theme_preference = r
            .theme_preference
            .parse::<ThemePreference>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: r.id,
            name: r.name,
            email,
            phone: r.phone,
            address: r.address,
            avatar_url: r.avatar_url,
            role: r.role,
            enabled: r.enabled,
            theme_preference,
            email_notifications: r.email_notifications,
            push_notifications: r.push_notifications,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// Fields for a new account.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a Email,
    pub password_hash: &'a str,
    pub role: Role,
    pub phone: Option<&'a str>,
    pub address: Option<&'a str>,
}

/// Partial update; `None` leaves a column unchanged.
#[derive(Debug, Default)]
pub struct UserChanges<'a> {
    pub name: Option<&'a str>,
    pub email: Option<&'a Email>,
    pub phone: Option<&'a str>,
    pub address: Option<&'a str>,
    pub role: Option<Role>,
    pub enabled: Option<bool>,
    pub password_hash: Option<&'a str>,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(concat!(
            "SELECT ",
            user_columns!(),
            " FROM shop.user WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(concat!(
            "SELECT ",
            user_columns!(),
            " FROM shop.user WHERE LOWER(email) = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Whether any account uses `email`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError> {
        let row: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM shop.user WHERE LOWER(email) = $1)")
                .bind(email.as_str())
                .fetch_one(self.pool)
                .await?;
        Ok(row.0)
    }

    /// Get a user together with their password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<UserWithHashRow> = sqlx::query_as(concat!(
            "SELECT ",
            user_columns!(),
            ", password_hash FROM shop.user WHERE LOWER(email) = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| User::try_from(r.user).map(|user| (user, r.password_hash)))
            .transpose()
    }

    /// Get only the password hash for a user ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash_by_id(
        &self,
        id: UserId,
    ) -> Result<Option<String>, RepositoryError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT password_hash FROM shop.user WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(row.map(|r| r.0))
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: NewUser<'_>) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(concat!(
            "INSERT INTO shop.user (name, email, password_hash, role, phone, address) ",
            "VALUES ($1, $2, $3, $4, $5, $6) RETURNING ",
            user_columns!()
        ))
        .bind(new.name)
        .bind(new.email.as_str())
        .bind(new.password_hash)
        .bind(new.role)
        .bind(new.phone)
        .bind(new.address)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "email already exists"))?;

        row.try_into()
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new email is taken.
    pub async fn update(
        &self,
        id: UserId,
        changes: UserChanges<'_>,
    ) -> Result<User, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(concat!(
            "UPDATE shop.user SET ",
            "name = COALESCE($2, name), ",
            "email = COALESCE($3, email), ",
            "phone = COALESCE($4, phone), ",
            "address = COALESCE($5, address), ",
            "role = COALESCE($6, role), ",
            "enabled = COALESCE($7, enabled), ",
            "password_hash = COALESCE($8, password_hash) ",
            "WHERE id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.email.map(Email::as_str))
        .bind(changes.phone)
        .bind(changes.address)
        .bind(changes.role)
        .bind(changes.enabled)
        .bind(changes.password_hash)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "email already exists"))?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Set a new password hash by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no account uses the email.
    pub async fn set_password_by_email(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE shop.user SET password_hash = $2 WHERE LOWER(email) = $1")
                .bind(email.as_str())
                .bind(password_hash)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Partially update theme and notification preferences.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_settings(
        &self,
        id: UserId,
        theme: Option<ThemePreference>,
        email_notifications: Option<bool>,
        push_notifications: Option<bool>,
    ) -> Result<User, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(concat!(
            "UPDATE shop.user SET ",
            "theme_preference = COALESCE($2, theme_preference), ",
            "email_notifications = COALESCE($3, email_notifications), ",
            "push_notifications = COALESCE($4, push_notifications) ",
            "WHERE id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .bind(theme.map(ThemePreference::as_str))
        .bind(email_notifications)
        .bind(push_notifications)
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Record the URL of a newly uploaded avatar.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_avatar_url(&self, id: UserId, url: &str) -> Result<User, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(concat!(
            "UPDATE shop.user SET avatar_url = $2 WHERE id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .bind(url)
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Search accounts by role and a name/email keyword, newest first.
    ///
    /// Returns the page of users and the total number of matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(
        &self,
        role: Option<Role>,
        keyword: Option<&str>,
        page: PageRequest,
    ) -> Result<(Vec<User>, u64), RepositoryError> {
        let pattern = keyword
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(like_pattern);

        let rows: Vec<UserRow> = sqlx::query_as(concat!(
            "SELECT ",
            user_columns!(),
            " FROM shop.user ",
            "WHERE ($1::shop.user_role IS NULL OR role = $1) ",
            "AND ($2::text IS NULL OR name ILIKE $2 OR email ILIKE $2) ",
            "ORDER BY created_at DESC, id DESC ",
            "LIMIT $3 OFFSET $4"
        ))
        .bind(role)
        .bind(pattern.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: (i64,) = sqlx::query_as(
            r"
            SELECT COUNT(*) FROM shop.user
            WHERE ($1::shop.user_role IS NULL OR role = $1)
              AND ($2::text IS NULL OR name ILIKE $2 OR email ILIKE $2)
            ",
        )
        .bind(role)
        .bind(pattern.as_deref())
        .fetch_one(self.pool)
        .await?;

        let users = rows
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((users, u64::try_from(total.0).unwrap_or(0)))
    }

    /// All accounts with a role, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_role(&self, role: Role) -> Result<Vec<User>, RepositoryError> {
        let rows: Vec<UserRow> = sqlx::query_as(concat!(
            "SELECT ",
            user_columns!(),
            " FROM shop.user WHERE role = $1 ORDER BY name, id"
        ))
        .bind(role)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    /// Enabled staff members and administrators, who receive new-order notices.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_order_handlers(&self) -> Result<Vec<User>, RepositoryError> {
        let rows: Vec<UserRow> = sqlx::query_as(concat!(
            "SELECT ",
            user_columns!(),
            " FROM shop.user WHERE role IN ('STAFF', 'ADMIN') AND enabled ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Conflict` if the user still has orders.
    pub async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.user WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_constraint(e, "user has orders"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
