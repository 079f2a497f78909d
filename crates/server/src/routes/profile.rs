//! Own-profile route handlers for any signed-in user, plus the customer
//! aliases under `/api/customer/profile`.

use axum::{
    Json, Router,
    extract::{Multipart, State},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use stockroom_core::ThemePreference;

use super::MultipartForm;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, RequireCustomer, refresh_current_user};
use crate::models::{CurrentUser, User, UserSettings};
use crate::services::users::{ProfileUpdate, SettingsUpdate, UserService};
use crate::state::AppState;

/// Multipart field names accepted for an avatar upload.
const AVATAR_FIELDS: &[&str] = &["file", "avatar"];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/profile", get(show).put(update))
        .route("/api/profile/password", put(change_password))
        .route("/api/profile/settings", put(update_settings))
        .route("/api/profile/avatar", post(upload_avatar))
        .route(
            "/api/customer/profile",
            get(customer_show).put(customer_update),
        )
        .route("/api/customer/profile/password", put(customer_change_password))
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub settings: UserSettings,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        let settings = user.settings();
        Self { user, settings }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    pub theme_preference: Option<String>,
    pub email_notifications: Option<bool>,
    pub push_notifications: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

async fn load(state: &AppState, user: &CurrentUser) -> Result<ProfileResponse> {
    let user = UserService::new(state.pool(), state.storage())
        .get(user.id)
        .await?;
    Ok(user.into())
}

async fn apply_update(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
    body: UpdateProfileRequest,
) -> Result<ProfileResponse> {
    let updated = UserService::new(state.pool(), state.storage())
        .update_profile(
            user.id,
            ProfileUpdate {
                name: body.name,
                email: body.email,
                phone: body.phone,
                address: body.address,
            },
        )
        .await?;
    // Name and email are part of the session identity
    refresh_current_user(session, &CurrentUser::from(&updated)).await?;
    Ok(updated.into())
}

async fn apply_password(
    state: &AppState,
    user: &CurrentUser,
    body: &ChangePasswordRequest,
) -> Result<Json<MessageResponse>> {
    UserService::new(state.pool(), state.storage())
        .change_password(user.id, &body.current_password, &body.new_password)
        .await?;
    tracing::info!(user_id = %user.id, "Password changed");
    Ok(Json(MessageResponse {
        message: "Password updated",
    }))
}

/// # Errors
///
/// Returns 404 if the account was deleted after sign-in.
pub async fn show(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>> {
    Ok(Json(load(&state, &user).await?))
}

/// Update name, email, phone, or address.
///
/// # Errors
///
/// Returns 409 if the new email is in use, 400 for invalid values.
pub async fn update(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>> {
    Ok(Json(apply_update(&state, &session, &user, body).await?))
}

/// # Errors
///
/// Returns 400 if the current password is wrong or the new one is weak.
pub async fn change_password(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>> {
    apply_password(&state, &user, &body).await
}

/// Partially update display and notification preferences.
///
/// # Errors
///
/// Returns 400 for an unknown theme.
pub async fn update_settings(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<SettingsRequest>,
) -> Result<Json<ProfileResponse>> {
    let theme_preference = body
        .theme_preference
        .as_deref()
        .map(str::parse::<ThemePreference>)
        .transpose()
        .map_err(AppError::BadRequest)?;
    let updated = UserService::new(state.pool(), state.storage())
        .update_settings(
            user.id,
            SettingsUpdate {
                theme_preference,
                email_notifications: body.email_notifications,
                push_notifications: body.push_notifications,
            },
        )
        .await?;
    Ok(Json(updated.into()))
}

/// Replace the caller's avatar with the uploaded `file`.
///
/// # Errors
///
/// Returns 400 when no file is sent or the file type is rejected.
pub async fn upload_avatar(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ProfileResponse>> {
    let mut form = MultipartForm::read(multipart).await?;
    let upload = form
        .take_files(AVATAR_FIELDS)
        .into_iter()
        .next()
        .ok_or_else(|| AppError::BadRequest("file is required".to_owned()))?;
    let updated = UserService::new(state.pool(), state.storage())
        .upload_avatar(user.id, upload)
        .await?;
    Ok(Json(updated.into()))
}

// =============================================================================
// Customer aliases
// =============================================================================

/// # Errors
///
/// Returns 404 if the account was deleted after sign-in.
pub async fn customer_show(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>> {
    Ok(Json(load(&state, &customer).await?))
}

/// # Errors
///
/// Returns 409 if the new email is in use, 400 for invalid values.
pub async fn customer_update(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>> {
    Ok(Json(apply_update(&state, &session, &customer, body).await?))
}

/// # Errors
///
/// Returns 400 if the current password is wrong or the new one is weak.
pub async fn customer_change_password(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>> {
    apply_password(&state, &customer, &body).await
}
