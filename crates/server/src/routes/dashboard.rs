//! Role dashboard route handlers.

use axum::{Json, Router, extract::State, routing::get};

use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireCustomer, RequireStaff};
use crate::services::dashboard::{
    AdminDashboard, CustomerDashboard, DashboardService, StaffDashboard,
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/customer/dashboard", get(customer))
        .route("/api/staff/dashboard", get(staff))
        .route("/api/admin/dashboard", get(admin))
}

/// # Errors
///
/// Returns 500 if a dashboard query fails.
pub async fn customer(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
) -> Result<Json<CustomerDashboard>> {
    Ok(Json(
        DashboardService::new(state.pool())
            .customer(customer.id)
            .await?,
    ))
}

/// # Errors
///
/// Returns 500 if a dashboard query fails.
pub async fn staff(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<StaffDashboard>> {
    Ok(Json(DashboardService::new(state.pool()).staff(staff.id).await?))
}

/// # Errors
///
/// Returns 500 if a dashboard query fails.
pub async fn admin(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<AdminDashboard>> {
    Ok(Json(DashboardService::new(state.pool()).admin().await?))
}
