//! Account administration route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;

use stockroom_core::{Page, PageRequest, Role, UserId};

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::User;
use crate::services::users::{AccountUpdate, NewAccount, UserService};
use crate::state::AppState;

const PAGE_SIZE: u32 = 10;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(search).post(create))
        .route("/api/admin/users/role/{role}", get(by_role))
        .route(
            "/api/admin/users/{id}",
            get(show).put(update).delete(remove),
        )
}

fn users(state: &AppState) -> UserService<'_> {
    UserService::new(state.pool(), state.storage())
}

/// Parse a role name such as `staff` or `ROLE_ADMIN`.
fn parse_role(value: &str) -> Result<Role> {
    value
        .parse()
        .map_err(|e: stockroom_core::ParseRoleError| AppError::BadRequest(e.to_string()))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub role: Option<String>,
    pub keyword: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub enabled: Option<bool>,
}

impl UpdateUserRequest {
    fn into_update(self) -> Result<AccountUpdate> {
        Ok(AccountUpdate {
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            password: self.password.filter(|p| !p.is_empty()),
            role: self.role.as_deref().map(parse_role).transpose()?,
            enabled: self.enabled,
        })
    }
}

/// Search accounts by role and name/email keyword.
///
/// # Errors
///
/// Returns 400 for an unknown role.
pub async fn search(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Page<User>>> {
    let role = query
        .role
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .map(parse_role)
        .transpose()?;
    let keyword = query
        .keyword
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty());
    let page = PageRequest::new(query.page, query.size, PAGE_SIZE);
    Ok(Json(users(&state).search(role, keyword, page).await?))
}

/// # Errors
///
/// Returns 400 for an unknown role.
pub async fn by_role(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(role): Path<String>,
) -> Result<Json<Vec<User>>> {
    let role = parse_role(&role)?;
    Ok(Json(users(&state).list_by_role(role).await?))
}

/// # Errors
///
/// Returns 404 if the user doesn't exist.
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<User>> {
    Ok(Json(users(&state).get(id).await?))
}

/// Create an account with any role; customers are the default.
///
/// # Errors
///
/// Returns 409 if the email is taken, 400 for invalid fields.
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let role = body
        .role
        .as_deref()
        .map(parse_role)
        .transpose()?
        .unwrap_or(Role::Customer);
    let user = users(&state)
        .create(NewAccount {
            name: body.name,
            email: body.email,
            password: body.password,
            role,
            phone: body.phone,
            address: body.address,
        })
        .await?;
    tracing::info!(user_id = %user.id, role = %user.role, admin_id = %admin.id, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// # Errors
///
/// Returns 404 if the user doesn't exist, 409 if the new email is taken.
pub async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<User>> {
    let update = body.into_update()?;
    Ok(Json(users(&state).update(id, update).await?))
}

/// # Errors
///
/// Returns 400 for self-deletion, 409 when the user has orders.
pub async fn remove(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<StatusCode> {
    users(&state).delete(admin.id, id).await?;
    tracing::info!(user_id = %id, admin_id = %admin.id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_accepts_prefix_and_case() {
        assert_eq!(parse_role("staff").unwrap(), Role::Staff);
        assert_eq!(parse_role("ROLE_ADMIN").unwrap(), Role::Admin);
        assert!(matches!(parse_role("owner"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_update_request_ignores_empty_password() {
        let update = UpdateUserRequest {
            password: Some(String::new()),
            role: Some("customer".to_owned()),
            ..UpdateUserRequest::default()
        }
        .into_update()
        .unwrap();
        assert_eq!(update.password, None);
        assert_eq!(update.role, Some(Role::Customer));
    }
}
