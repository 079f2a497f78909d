//! Default administrator seeding.
//!
//! Runs at server start-up and from `stockroom-cli seed admin`. Existing
//! accounts are never modified.

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

use stockroom_core::{Email, EmailError, Role, UserId};

use crate::config::SeedAdminConfig;
use crate::db::{RepositoryError, UserRepository, users::NewUser};
use crate::services::auth::{hash_password, validate_password};
use crate::services::auth::password::PasswordError;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("invalid seed admin email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("invalid seed admin password: {0}")]
    Password(#[from] PasswordError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// What [`ensure_admin`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Created(UserId),
    AlreadyExists,
}

/// Create the configured administrator unless an account already uses the
/// email.
///
/// # Errors
///
/// Returns `SeedError::InvalidEmail` or `Password` for a bad configuration,
/// `Repository` if the insert fails.
pub async fn ensure_admin(pool: &PgPool, seed: &SeedAdminConfig) -> Result<SeedOutcome, SeedError> {
    let email = Email::parse(&seed.email)?;
    let users = UserRepository::new(pool);
    if users.email_exists(&email).await? {
        tracing::debug!(email = %email, "Seed admin already exists");
        return Ok(SeedOutcome::AlreadyExists);
    }

    let password = seed.password.expose_secret();
    validate_password(password)?;
    let password_hash = hash_password(password)?;

    let user = users
        .create(NewUser {
            name: seed.name.trim(),
            email: &email,
            password_hash: &password_hash,
            role: Role::Admin,
            phone: None,
            address: None,
        })
        .await?;
    tracing::info!(user_id = %user.id, email = %email, "Seed admin created");
    Ok(SeedOutcome::Created(user.id))
}
