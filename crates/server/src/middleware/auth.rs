//! Authentication and role extractors.
//!
//! Handlers take one of these to declare who may call them. A missing
//! session identity is rejected with 401, a wrong role with 403.
//!
//! ```rust,ignore
//! async fn dashboard(RequireAdmin(admin): RequireAdmin) -> Result<Json<AdminDashboard>> {
//!     // ...
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use stockroom_core::Role;

use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};

/// Any signed-in user.
pub struct RequireAuth(pub CurrentUser);

/// A signed-in customer.
pub struct RequireCustomer(pub CurrentUser);

/// A signed-in staff member or administrator.
pub struct RequireStaff(pub CurrentUser);

/// A signed-in administrator.
pub struct RequireAdmin(pub CurrentUser);

async fn current_user(parts: &Parts) -> Result<CurrentUser, AppError> {
    // Session is set in extensions by SessionManagerLayer
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_owned()))?;

    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_owned()))
}

fn forbidden(required: &str) -> AppError {
    AppError::Forbidden(format!("{required} access required"))
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_user(parts).await.map(Self)
    }
}

impl<S> FromRequestParts<S> for RequireCustomer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts).await?;
        if user.role != Role::Customer {
            return Err(forbidden("Customer"));
        }
        Ok(Self(user))
    }
}

impl<S> FromRequestParts<S> for RequireStaff
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts).await?;
        if !user.role.is_staff() {
            return Err(forbidden("Staff"));
        }
        Ok(Self(user))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts).await?;
        if !user.role.is_admin() {
            return Err(forbidden("Admin"));
        }
        Ok(Self(user))
    }
}

/// Store the signed-in user in the session.
///
/// The session ID is cycled first so a pre-login session cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Replace the stored identity without cycling the session, after a
/// profile edit changes the name or email.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn refresh_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Drop the whole session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be deleted.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
