//! Role dashboards: headline counts for customers, staff, and admins.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::ser::SerializeMap;
use sqlx::PgPool;

use stockroom_core::{OrderStatus, Role, UserId};

use crate::db::dashboard::MonthRevenue;
use crate::db::{
    CategoryRepository, DashboardRepository, OrderRepository, ProductRepository, RepositoryError,
    UserRepository, WishlistRepository,
};
use crate::models::{Order, Product, User};

const RECENT_ORDERS: i64 = 5;
const LOW_STOCK_LIMIT: i64 = 10;
const MOST_SOLD_LIMIT: i64 = 10;
const REVENUE_MONTHS: u32 = 12;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDashboard {
    pub total_orders: i64,
    pub recent_orders: Vec<Order>,
    pub wishlist_count: i64,
    pub profile: User,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffDashboard {
    pub pending_orders_count: i64,
    pub completed_orders_count: i64,
    pub today_orders: Vec<Order>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub total_products: i64,
    pub total_customers: i64,
    pub total_staff: i64,
    pub total_sales: Decimal,
    pub monthly_revenue: MonthlyRevenue,
    pub low_stock_products: Vec<Product>,
    pub most_sold_products: Vec<Product>,
    pub category_performance: BTreeMap<String, i64>,
}

/// Revenue per month, oldest first, serialized as an ordered JSON object
/// keyed like `"JANUARY 2026"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyRevenue(pub Vec<(String, Decimal)>);

impl Serialize for MonthlyRevenue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (month, revenue) in &self.0 {
            map.serialize_entry(month, revenue)?;
        }
        map.end()
    }
}

/// First day of each of the last `count` months up to and including `now`'s.
fn month_starts(now: DateTime<Utc>, count: u32) -> Vec<NaiveDate> {
    let Some(current) = NaiveDate::from_ymd_opt(now.year(), now.month(), 1) else {
        return Vec::new();
    };
    (0..count)
        .rev()
        .filter_map(|back| current.checked_sub_months(Months::new(back)))
        .collect()
}

fn month_key(date: NaiveDate) -> String {
    let name = chrono::Month::try_from(u8::try_from(date.month()).unwrap_or(1))
        .map_or("JANUARY", |m| m.name());
    format!("{} {}", name.to_uppercase(), date.year())
}

/// Fill every month in the window, using zero where no orders exist.
fn fill_months(now: DateTime<Utc>, rows: &[MonthRevenue]) -> MonthlyRevenue {
    let months = month_starts(now, REVENUE_MONTHS)
        .into_iter()
        .map(|start| {
            let revenue = rows
                .iter()
                .filter(|r| r.month_start.date_naive() == start)
                .map(|r| r.revenue)
                .sum();
            (month_key(start), revenue)
        })
        .collect();
    MonthlyRevenue(months)
}

pub struct DashboardService<'a> {
    dashboard: DashboardRepository<'a>,
    orders: OrderRepository<'a>,
    products: ProductRepository<'a>,
    categories: CategoryRepository<'a>,
    users: UserRepository<'a>,
    wishlist: WishlistRepository<'a>,
}

impl<'a> DashboardService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            dashboard: DashboardRepository::new(pool),
            orders: OrderRepository::new(pool),
            products: ProductRepository::new(pool),
            categories: CategoryRepository::new(pool),
            users: UserRepository::new(pool),
            wishlist: WishlistRepository::new(pool),
        }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user no longer exists.
    pub async fn customer(&self, user_id: UserId) -> Result<CustomerDashboard, RepositoryError> {
        let profile = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        Ok(CustomerDashboard {
            total_orders: self.dashboard.count_customer_orders(user_id).await?,
            recent_orders: self
                .orders
                .list_for_customer(user_id, Some(RECENT_ORDERS))
                .await?,
            wishlist_count: self.wishlist.count(user_id).await?,
            profile,
        })
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn staff(&self, staff_id: UserId) -> Result<StaffDashboard, RepositoryError> {
        Ok(StaffDashboard {
            pending_orders_count: self
                .dashboard
                .count_assigned(staff_id, OrderStatus::Pending)
                .await?,
            completed_orders_count: self
                .dashboard
                .count_assigned(staff_id, OrderStatus::Delivered)
                .await?,
            today_orders: self.orders.list_today_for_staff(staff_id).await?,
        })
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn admin(&self) -> Result<AdminDashboard, RepositoryError> {
        let now = Utc::now();
        let since = month_starts(now, REVENUE_MONTHS)
            .first()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map_or(now, |d| d.and_utc());
        let revenue_rows = self.dashboard.monthly_revenue(since).await?;

        Ok(AdminDashboard {
            total_products: self.products.count().await?,
            total_customers: self.dashboard.count_users(Role::Customer).await?,
            total_staff: self.dashboard.count_users(Role::Staff).await?,
            total_sales: self.dashboard.total_sales().await?,
            monthly_revenue: fill_months(now, &revenue_rows),
            low_stock_products: self.products.low_stock_details(LOW_STOCK_LIMIT).await?,
            most_sold_products: self.products.most_sold(MOST_SOLD_LIMIT).await?,
            category_performance: self.categories.product_counts().await?.into_iter().collect(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_month_starts_cross_year() {
        let now = Utc.with_ymd_and_hms(2026, 2, 14, 9, 30, 0).unwrap();
        let months = month_starts(now, 12);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0], NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(months[11], NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
    }

    #[test]
    fn test_month_key() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(month_key(date), "JANUARY 2026");
        let date = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        assert_eq!(month_key(date), "DECEMBER 2025");
    }

    #[test]
    fn test_fill_months_zero_fills_and_orders() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let rows = vec![MonthRevenue {
            month_start: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            revenue: Decimal::new(12_550, 2),
        }];

        let filled = fill_months(now, &rows);
        assert_eq!(filled.0.len(), 12);
        assert_eq!(filled.0[0].0, "APRIL 2025");
        assert_eq!(filled.0[10], ("JANUARY 2026".to_owned(), Decimal::new(12_550, 2)));
        assert_eq!(filled.0[11], ("MARCH 2026".to_owned(), Decimal::ZERO));
    }

    #[test]
    fn test_monthly_revenue_serializes_in_order() {
        let revenue = MonthlyRevenue(vec![
            ("NOVEMBER 2025".to_owned(), Decimal::new(5, 0)),
            ("DECEMBER 2025".to_owned(), Decimal::ZERO),
        ]);
        let json = serde_json::to_string(&revenue).unwrap();
        assert_eq!(json, r#"{"NOVEMBER 2025":"5","DECEMBER 2025":"0"}"#);
    }
}
