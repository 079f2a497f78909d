//! Downloadable PDF and Excel reports.
//!
//! Rendering lives in [`pdf`] and [`excel`] as pure functions over domain
//! types; [`ReportService`] loads the data and picks the file name and
//! content type.

pub mod excel;
pub mod pdf;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;

use stockroom_core::{OrderStatus, UserId};

use crate::db::{OrderRepository, ProductRepository, RepositoryError};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to render PDF: {0}")]
    Pdf(String),

    #[error("failed to render spreadsheet: {0}")]
    Excel(#[from] rust_xlsxwriter::XlsxError),

    #[error("unknown report format: {0} (expected pdf or excel)")]
    UnknownFormat(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<printpdf::Error> for ReportError {
    fn from(err: printpdf::Error) -> Self {
        Self::Pdf(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Pdf,
    Excel,
}

impl ReportFormat {
    /// Parse an optional `format` query value, falling back to `default`.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::UnknownFormat` for anything but pdf/excel.
    pub fn parse_or(value: Option<&str>, default: Self) -> Result<Self, ReportError> {
        value.map_or(Ok(default), str::parse)
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Excel => "xlsx",
        }
    }

    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Pdf => PDF_CONTENT_TYPE,
            Self::Excel => XLSX_CONTENT_TYPE,
        }
    }
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "excel" | "xlsx" => Ok(Self::Excel),
            other => Err(ReportError::UnknownFormat(other.to_owned())),
        }
    }
}

/// A rendered report ready to be sent as an attachment.
#[derive(Debug)]
pub struct Report {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Report {
    fn new(stem: &str, format: ReportFormat, bytes: Vec<u8>) -> Self {
        Self {
            filename: format!("{stem}.{}", format.extension()),
            content_type: format.content_type(),
            bytes,
        }
    }
}

/// `yyyy-MM-dd HH:mm:ss` in UTC.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub struct ReportService<'a> {
    orders: OrderRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> ReportService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            orders: OrderRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// Delivered orders and their combined total.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Repository` if loading fails, or a render error.
    pub async fn sales(&self, format: ReportFormat) -> Result<Report, ReportError> {
        let orders = self.orders.list_by_status(OrderStatus::Delivered).await?;
        let bytes = match format {
            ReportFormat::Pdf => pdf::sales(&orders)?,
            ReportFormat::Excel => excel::sales(&orders)?,
        };
        tracing::info!(orders = orders.len(), ?format, "Sales report generated");
        Ok(Report::new("sales_report", format, bytes))
    }

    /// # Errors
    ///
    /// Returns `ReportError::Repository` if loading fails, or a render error.
    pub async fn product_stock(&self, format: ReportFormat) -> Result<Report, ReportError> {
        let products = self.products.list_all().await?;
        let bytes = match format {
            ReportFormat::Pdf => pdf::product_stock(&products)?,
            ReportFormat::Excel => excel::product_stock(&products)?,
        };
        Ok(Report::new("product_stock_report", format, bytes))
    }

    /// The sales sheet as a standalone order workbook.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Repository` if loading fails, or a render error.
    pub async fn orders(&self) -> Result<Report, ReportError> {
        let orders = self.orders.list_by_status(OrderStatus::Delivered).await?;
        Ok(Report::new(
            "order_report",
            ReportFormat::Excel,
            excel::sales(&orders)?,
        ))
    }

    /// Orders assigned to a staff member, for administrators.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Repository` if loading fails, or a render error.
    pub async fn staff_activity(&self, staff_id: UserId) -> Result<Report, ReportError> {
        let orders = self.orders.list_for_staff(staff_id).await?;
        Ok(Report::new(
            "staff_activity_report",
            ReportFormat::Excel,
            excel::staff_orders(&orders)?,
        ))
    }

    /// The caller's own assigned orders.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Repository` if loading fails, or a render error.
    pub async fn my_orders(&self, staff_id: UserId) -> Result<Report, ReportError> {
        let orders = self.orders.list_for_staff(staff_id).await?;
        Ok(Report::new(
            "my_orders_report",
            ReportFormat::Excel,
            excel::staff_orders(&orders)?,
        ))
    }

    /// # Errors
    ///
    /// Returns `ReportError::Repository` if loading fails, or a render error.
    pub async fn order_history(
        &self,
        user_id: UserId,
        format: ReportFormat,
    ) -> Result<Report, ReportError> {
        let orders = self.orders.list_for_customer(user_id, None).await?;
        let bytes = match format {
            ReportFormat::Pdf => pdf::order_history(&orders)?,
            ReportFormat::Excel => excel::order_history(&orders)?,
        };
        Ok(Report::new("order_history", format, bytes))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_parsing() {
        assert_eq!("PDF".parse::<ReportFormat>().unwrap(), ReportFormat::Pdf);
        assert_eq!("Excel".parse::<ReportFormat>().unwrap(), ReportFormat::Excel);
        assert!(matches!(
            "csv".parse::<ReportFormat>(),
            Err(ReportError::UnknownFormat(f)) if f == "csv"
        ));
    }

    #[test]
    fn test_format_default() {
        assert_eq!(
            ReportFormat::parse_or(None, ReportFormat::Pdf).unwrap(),
            ReportFormat::Pdf
        );
        assert_eq!(
            ReportFormat::parse_or(Some("excel"), ReportFormat::Pdf).unwrap(),
            ReportFormat::Excel
        );
    }

    #[test]
    fn test_report_file_names() {
        let report = Report::new("sales_report", ReportFormat::Excel, Vec::new());
        assert_eq!(report.filename, "sales_report.xlsx");
        assert_eq!(report.content_type, XLSX_CONTENT_TYPE);

        let report = Report::new("order_history", ReportFormat::Pdf, Vec::new());
        assert_eq!(report.filename, "order_history.pdf");
        assert_eq!(report.content_type, "application/pdf");
    }

    #[test]
    fn test_format_timestamp() {
        let at = Utc.with_ymd_and_hms(2026, 1, 5, 7, 3, 9).unwrap();
        assert_eq!(format_timestamp(at), "2026-01-05 07:03:09");
    }
}
