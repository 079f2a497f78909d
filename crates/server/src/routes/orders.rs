//! Order route handlers for customers, staff, and administrators.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Deserialize;

use stockroom_core::{OrderId, OrderStatus, Page, PageRequest, UserId};

use crate::db::orders::{CheckoutDetails, OrderFilter};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireAdmin, RequireCustomer, RequireStaff};
use crate::models::Order;
use crate::services::orders::OrderService;
use crate::state::AppState;

const ADMIN_PAGE_SIZE: u32 = 20;

pub fn router() -> Router<AppState> {
    Router::new()
        // Customer
        .route("/api/customer/orders/checkout", post(checkout))
        .route("/api/customer/orders", get(customer_orders))
        .route("/api/customer/orders/{id}", get(customer_order))
        .route("/api/customer/orders/{id}/cancel", put(cancel))
        // Staff
        .route("/api/staff/orders", get(staff_orders))
        .route("/api/staff/orders/{id}", get(staff_order))
        .route("/api/staff/orders/{id}/status", put(update_status))
        // Admin
        .route("/api/admin/orders", get(admin_orders))
        .route("/api/admin/orders/{id}", get(admin_order))
        .route("/api/admin/orders/{id}/assign", put(assign))
}

fn orders(state: &AppState) -> OrderService<'_> {
    OrderService::new(state.pool(), state.email())
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub shipping_address: String,
    pub phone_number: Option<String>,
    pub special_instructions: Option<String>,
    pub preferred_delivery_date: Option<String>,
}

impl CheckoutRequest {
    fn into_details(self) -> Result<CheckoutDetails> {
        let preferred_delivery_date = self
            .preferred_delivery_date
            .as_deref()
            .map(|value| parse_date_time(value, "preferredDeliveryDate", DayEdge::Start))
            .transpose()?;
        Ok(CheckoutDetails {
            shipping_address: self.shipping_address,
            phone_number: non_blank(self.phone_number),
            special_instructions: non_blank(self.special_instructions),
            preferred_delivery_date,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Place an order from the caller's cart.
///
/// # Errors
///
/// Returns 400 for an empty cart or missing address, 409 when a product no
/// longer has enough stock.
pub async fn checkout(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
    Json(body): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let details = body.into_details()?;
    let user_id = customer.id.to_string();
    add_breadcrumb("order", "Checkout started", Some(&[("user_id", &user_id)]));

    let order = orders(&state).checkout(&customer, details).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// # Errors
///
/// Returns 500 if the query fails.
pub async fn customer_orders(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(orders(&state).customer_orders(customer.id).await?))
}

/// # Errors
///
/// Returns 403 when the order belongs to someone else.
pub async fn customer_order(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(orders(&state).customer_order(customer.id, id).await?))
}

/// Cancel a pending or processing order and restock its items.
///
/// # Errors
///
/// Returns 403 for someone else's order, 400 once the order has shipped.
pub async fn cancel(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(orders(&state).cancel(customer.id, id).await?))
}

// =============================================================================
// Staff
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

/// Orders assigned to the caller.
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn staff_orders(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(orders(&state).staff_orders(staff.id).await?))
}

/// # Errors
///
/// Returns 403 unless the caller is the assignee or an administrator.
pub async fn staff_order(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(orders(&state).staff_order(&staff, id).await?))
}

/// # Errors
///
/// Returns 400 for an unknown status, 403 for another member's order, 409
/// once the order is delivered or cancelled.
pub async fn update_status(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<Order>> {
    let status: OrderStatus = body
        .status
        .parse()
        .map_err(|e: stockroom_core::ParseOrderStatusError| AppError::BadRequest(e.to_string()))?;
    Ok(Json(orders(&state).update_status(&staff, id, status).await?))
}

// =============================================================================
// Admin
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    pub user_id: Option<UserId>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl OrderQuery {
    fn filter(&self) -> Result<OrderFilter> {
        let status = self
            .status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<OrderStatus>)
            .transpose()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        Ok(OrderFilter {
            user_id: self.user_id,
            status,
            start: self
                .start_date
                .as_deref()
                .map(|v| parse_date_time(v, "startDate", DayEdge::Start))
                .transpose()?,
            end: self
                .end_date
                .as_deref()
                .map(|v| parse_date_time(v, "endDate", DayEdge::End))
                .transpose()?,
        })
    }
}

/// Which end of the day a bare date stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayEdge {
    Start,
    End,
}

/// Parse an ISO-8601 date-time. Values without an offset are taken as UTC.
/// A bare date means its first instant, or its last one for `DayEdge::End`,
/// so inclusive ranges cover the whole end day.
fn parse_date_time(value: &str, field: &str, edge: DayEdge) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    let invalid = || AppError::BadRequest(format!("Invalid {field}"));
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())?;
    match edge {
        DayEdge::Start => Ok(date.and_time(NaiveTime::MIN).and_utc()),
        DayEdge::End => date
            .and_hms_micro_opt(23, 59, 59, 999_999)
            .map(|end| end.and_utc())
            .ok_or_else(invalid),
    }
}

/// Search all orders, newest first.
///
/// # Errors
///
/// Returns 400 for an unknown status or unparseable dates.
pub async fn admin_orders(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Page<Order>>> {
    let filter = query.filter()?;
    let page = PageRequest::new(query.page, query.size, ADMIN_PAGE_SIZE);
    Ok(Json(orders(&state).search(&filter, page).await?))
}

/// # Errors
///
/// Returns 404 if the order doesn't exist.
pub async fn admin_order(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(orders(&state).get(id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub staff_id: UserId,
}

/// Make a staff member responsible for an order.
///
/// # Errors
///
/// Returns 400 when the assignee is not staff, 404 for unknown ids.
pub async fn assign(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(body): Json<AssignRequest>,
) -> Result<Json<Order>> {
    Ok(Json(orders(&state).assign(id, body.staff_id).await?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_date_time_formats() {
        let with_offset =
            parse_date_time("2026-03-01T10:30:00+02:00", "startDate", DayEdge::Start).unwrap();
        assert_eq!(with_offset.hour(), 8);

        let naive = parse_date_time("2026-03-01T10:30:00", "endDate", DayEdge::End).unwrap();
        assert_eq!(naive.hour(), 10);

        let date = parse_date_time("2026-03-01", "startDate", DayEdge::Start).unwrap();
        assert_eq!((date.day(), date.hour()), (1, 0));

        assert!(matches!(
            parse_date_time("yesterday", "endDate", DayEdge::End),
            Err(AppError::BadRequest(msg)) if msg == "Invalid endDate"
        ));
    }

    #[test]
    fn test_bare_end_date_covers_the_whole_day() {
        let query = OrderQuery {
            start_date: Some("2026-03-01".to_owned()),
            end_date: Some("2026-03-01".to_owned()),
            ..OrderQuery::default()
        };
        let filter = query.filter().unwrap();
        let (start, end) = (filter.start.unwrap(), filter.end.unwrap());

        let midday: DateTime<Utc> = "2026-03-01T12:00:00Z".parse().unwrap();
        let last_second: DateTime<Utc> = "2026-03-01T23:59:59.5Z".parse().unwrap();
        let next_day: DateTime<Utc> = "2026-03-02T00:00:00Z".parse().unwrap();
        assert!(start <= midday && midday <= end);
        assert!(last_second <= end);
        assert!(next_day > end);
    }

    #[test]
    fn test_order_query_status_is_case_insensitive() {
        let query = OrderQuery {
            status: Some("shipped".to_owned()),
            ..OrderQuery::default()
        };
        assert_eq!(query.filter().unwrap().status, Some(OrderStatus::Shipped));

        let bad = OrderQuery {
            status: Some("LOST".to_owned()),
            ..OrderQuery::default()
        };
        assert!(bad.filter().is_err());
    }

    #[test]
    fn test_checkout_request_drops_blank_optionals() {
        let details = CheckoutRequest {
            shipping_address: "1 Main St".to_owned(),
            phone_number: Some("  ".to_owned()),
            special_instructions: Some("Leave at door".to_owned()),
            preferred_delivery_date: None,
        }
        .into_details()
        .unwrap();
        assert_eq!(details.phone_number, None);
        assert_eq!(details.special_instructions.as_deref(), Some("Leave at door"));
    }
}
