//! Report download route handlers.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Response,
    routing::get,
};
use serde::Deserialize;

use stockroom_core::UserId;

use super::attachment;
use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireCustomer, RequireStaff};
use crate::services::reports::{ReportFormat, ReportService};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/reports/sales", get(sales))
        .route("/api/admin/reports/products", get(products))
        .route("/api/admin/reports/orders", get(orders))
        .route(
            "/api/admin/reports/staff-activity/{staff_id}",
            get(staff_activity),
        )
        .route("/api/staff/reports/orders", get(my_orders))
        .route("/api/customer/reports/order-history", get(order_history))
}

#[derive(Debug, Default, Deserialize)]
pub struct FormatQuery {
    pub format: Option<String>,
}

impl FormatQuery {
    fn format(&self) -> Result<ReportFormat> {
        Ok(ReportFormat::parse_or(
            self.format.as_deref(),
            ReportFormat::Pdf,
        )?)
    }
}

/// Delivered orders with totals.
///
/// # Errors
///
/// Returns 400 for an unknown format, 500 if rendering fails.
pub async fn sales(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
) -> Result<Response> {
    let report = ReportService::new(state.pool())
        .sales(query.format()?)
        .await?;
    Ok(attachment(report))
}

/// Stock levels for every product.
///
/// # Errors
///
/// Returns 400 for an unknown format, 500 if rendering fails.
pub async fn products(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
) -> Result<Response> {
    let report = ReportService::new(state.pool())
        .product_stock(query.format()?)
        .await?;
    Ok(attachment(report))
}

/// # Errors
///
/// Returns 500 if rendering fails.
pub async fn orders(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Response> {
    Ok(attachment(ReportService::new(state.pool()).orders().await?))
}

/// Orders assigned to one staff member.
///
/// # Errors
///
/// Returns 500 if rendering fails.
pub async fn staff_activity(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(staff_id): Path<UserId>,
) -> Result<Response> {
    let report = ReportService::new(state.pool())
        .staff_activity(staff_id)
        .await?;
    Ok(attachment(report))
}

/// Orders assigned to the caller.
///
/// # Errors
///
/// Returns 500 if rendering fails.
pub async fn my_orders(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<Response> {
    let report = ReportService::new(state.pool())
        .my_orders(staff.id)
        .await?;
    Ok(attachment(report))
}

/// The caller's own order history.
///
/// # Errors
///
/// Returns 400 for an unknown format, 500 if rendering fails.
pub async fn order_history(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
) -> Result<Response> {
    let report = ReportService::new(state.pool())
        .order_history(customer.id, query.format()?)
        .await?;
    Ok(attachment(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_query_defaults_to_pdf() {
        assert!(matches!(
            FormatQuery::default().format(),
            Ok(ReportFormat::Pdf)
        ));
        let excel = FormatQuery {
            format: Some("EXCEL".to_owned()),
        };
        assert!(matches!(excel.format(), Ok(ReportFormat::Excel)));
        let bad = FormatQuery {
            format: Some("csv".to_owned()),
        };
        assert!(bad.format().is_err());
    }
}
