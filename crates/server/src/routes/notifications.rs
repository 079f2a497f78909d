//! Notification route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::Serialize;

use stockroom_core::NotificationId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Notification;
use crate::services::notifications::NotificationService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(list))
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications/read-all", put(mark_all_read))
        .route("/api/notifications/{id}/read", put(mark_read))
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

/// The caller's notifications, newest first.
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn list(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<Notification>>> {
    let notifications = NotificationService::new(state.pool(), state.email())
        .list(user.id)
        .await?;
    Ok(Json(notifications))
}

/// # Errors
///
/// Returns 500 if the query fails.
pub async fn unread_count(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<UnreadCount>> {
    let count = NotificationService::new(state.pool(), state.email())
        .unread_count(user.id)
        .await?;
    Ok(Json(UnreadCount { count }))
}

/// # Errors
///
/// Returns 403 for someone else's notification.
pub async fn mark_read(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<NotificationId>,
) -> Result<StatusCode> {
    NotificationService::new(state.pool(), state.email())
        .mark_read(user.id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// # Errors
///
/// Returns 500 if the update fails.
pub async fn mark_all_read(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<MarkedRead>> {
    let updated = NotificationService::new(state.pool(), state.email())
        .mark_all_read(user.id)
        .await?;
    Ok(Json(MarkedRead { updated }))
}
