//! Authentication route handlers.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::middleware::{
    RequireAuth, auth_rate_limiter, clear_current_user, refresh_current_user, set_current_user,
};
use crate::models::CurrentUser;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Build the auth router. Routes that check credentials or codes share one
/// per-client rate limit; `me` and `logout` are polled freely.
pub fn router() -> Router<AppState> {
    let limited = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/forgot-password", post(forgot_password))
        .route("/api/auth/validate-otp", post(validate_otp))
        .route("/api/auth/reset-password", post(reset_password))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .merge(limited)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct OtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct OtpValidity {
    pub valid: bool,
}

/// Sign in and start a session.
///
/// # Errors
///
/// Returns 401 for unknown emails, wrong passwords, and disabled accounts.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<CurrentUser>> {
    let auth = AuthService::new(state.pool(), state.email());
    let user = auth.login(&body.email, &body.password).await?;

    let current = CurrentUser::from(&user);
    set_current_user(&session, &current).await?;
    set_sentry_user(&current.id, Some(current.email.as_str()));
    add_breadcrumb("auth", "User logged in", None);

    Ok(Json(current))
}

/// Create a customer account. The caller still has to log in.
///
/// # Errors
///
/// Returns 409 if the email is taken, 400 for a bad email or weak password.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<CurrentUser>)> {
    let auth = AuthService::new(state.pool(), state.email());
    let user = auth
        .register(body.name.trim(), &body.email, &body.password)
        .await?;
    Ok((StatusCode::CREATED, Json(CurrentUser::from(&user))))
}

/// End the session.
///
/// # Errors
///
/// Returns 500 if the session store fails.
pub async fn logout(session: Session) -> Result<Json<MessageResponse>> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Json(MessageResponse {
        message: "Logged out",
    }))
}

/// The signed-in user, re-read so profile and role edits show up. A session
/// whose account was deleted is dropped.
///
/// # Errors
///
/// Returns 401 without a session or when the account no longer exists.
pub async fn me(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CurrentUser>> {
    let auth = AuthService::new(state.pool(), state.email());
    let current = match auth.get_user(user.id).await {
        Ok(found) => CurrentUser::from(&found),
        Err(AuthError::UserNotFound) => {
            clear_current_user(&session).await?;
            return Err(AppError::Unauthorized("Authentication required".to_owned()));
        }
        Err(e) => return Err(e.into()),
    };
    if current != user {
        refresh_current_user(&session, &current).await?;
    }
    Ok(Json(current))
}

/// Email a password reset code.
///
/// # Errors
///
/// Returns 404 if no account uses the email.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<EmailRequest>,
) -> Result<Json<MessageResponse>> {
    AuthService::new(state.pool(), state.email())
        .forgot_password(&body.email)
        .await?;
    Ok(Json(MessageResponse {
        message: "A reset code has been sent to your email",
    }))
}

/// Check a reset code without consuming it.
///
/// # Errors
///
/// Returns 400 for a malformed email.
pub async fn validate_otp(
    State(state): State<AppState>,
    Json(body): Json<OtpRequest>,
) -> Result<Json<OtpValidity>> {
    let valid = AuthService::new(state.pool(), state.email())
        .validate_otp(&body.email, &body.otp)
        .await?;
    Ok(Json(OtpValidity { valid }))
}

/// Set a new password with a reset code.
///
/// # Errors
///
/// Returns 400 for an invalid or expired code or a weak password.
pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    AuthService::new(state.pool(), state.email())
        .reset_password(&body.email, &body.otp, &body.new_password)
        .await?;
    Ok(Json(MessageResponse {
        message: "Password has been reset",
    }))
}
