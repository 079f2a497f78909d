//! HTTP route handlers for the REST API.
//!
//! # Route Structure
//!
//! ```text
//! /api/auth/*            - Login, registration, password reset (rate limited)
//! /api/products/*        - Public catalog reads and product reviews
//! /api/customer/*        - Cart, checkout, orders, reviews, wishlist (CUSTOMER)
//! /api/staff/*           - Assigned orders and status updates (STAFF or ADMIN)
//! /api/admin/*           - Catalog, users, orders, dashboard, reports (ADMIN)
//! /api/notifications/*   - In-app notifications (any signed-in user)
//! /api/profile/*         - Own profile, password, settings, avatar
//! /api/images/*          - Uploaded files (static)
//! /health, /health/ready - Probes
//! ```
//!
//! Each module exposes a `router()` with full paths; [`routes`] merges them.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod dashboard;
pub mod health;
pub mod notifications;
pub mod orders;
pub mod profile;
pub mod reports;
pub mod reviews;
pub mod users;
pub mod wishlist;

use std::collections::HashMap;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart},
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::{AppError, Result};
use crate::services::catalog::Upload;
use crate::services::reports::Report;
use crate::state::AppState;

/// Largest accepted request body (multipart image uploads included).
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(catalog::router())
        .merge(cart::router())
        .merge(orders::router())
        .merge(reviews::router())
        .merge(wishlist::router())
        .merge(dashboard::router())
        .merge(reports::router())
        .merge(users::router())
        .merge(notifications::router())
        .merge(profile::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

/// Text fields and files collected from a multipart body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: Vec<(String, Upload)>,
}

impl MultipartForm {
    /// Drain a multipart stream. Parts with a filename are files, the rest
    /// are text fields.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the body is malformed.
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_owned();
            let filename = field.file_name().map(str::to_owned);
            if filename.is_some() {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                form.files.push((
                    name,
                    Upload {
                        filename,
                        bytes: bytes.to_vec(),
                    },
                ));
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                form.fields.insert(name, text);
            }
        }
        Ok(form)
    }

    /// A text field, trimmed; blank values count as absent.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// A required text field parsed into `T`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` naming the field when it is missing or
    /// does not parse.
    pub fn required<T: std::str::FromStr>(&self, name: &str) -> Result<T> {
        let value = self
            .text(name)
            .ok_or_else(|| AppError::BadRequest(format!("{name} is required")))?;
        value
            .parse()
            .map_err(|_| AppError::BadRequest(format!("Invalid {name}")))
    }

    /// An optional text field parsed into `T`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` when the field is present but invalid.
    pub fn optional<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>> {
        self.text(name)
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| AppError::BadRequest(format!("Invalid {name}")))
            })
            .transpose()
    }

    /// Take every file uploaded under one of `names` (`images` and
    /// `images[]` are both common spellings).
    pub fn take_files(&mut self, names: &[&str]) -> Vec<Upload> {
        let (taken, rest) = std::mem::take(&mut self.files)
            .into_iter()
            .partition::<Vec<_>, _>(|(name, _)| names.contains(&name.as_str()));
        self.files = rest;
        taken.into_iter().map(|(_, upload)| upload).collect()
    }
}

/// Serve a generated report as a file download.
pub fn attachment(report: Report) -> Response {
    (
        [
            (header::CONTENT_TYPE, report.content_type.to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", report.filename),
            ),
        ],
        report.bytes,
    )
        .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)], files: &[&str]) -> MultipartForm {
        MultipartForm {
            fields: fields
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            files: files
                .iter()
                .map(|name| {
                    (
                        (*name).to_owned(),
                        Upload {
                            filename: Some("a.png".to_owned()),
                            bytes: vec![1],
                        },
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn test_text_treats_blank_as_missing() {
        let f = form(&[("name", "  Lamp "), ("description", "   ")], &[]);
        assert_eq!(f.text("name"), Some("Lamp"));
        assert_eq!(f.text("description"), None);
        assert_eq!(f.text("absent"), None);
    }

    #[test]
    fn test_required_and_optional_parsing() {
        let f = form(&[("stock", "12"), ("active", "yes")], &[]);
        assert_eq!(f.required::<i32>("stock").unwrap(), 12);
        assert!(matches!(
            f.required::<i32>("price"),
            Err(AppError::BadRequest(msg)) if msg == "price is required"
        ));
        assert!(f.optional::<bool>("active").is_err());
        assert_eq!(f.optional::<bool>("missing").unwrap(), None);
    }

    #[test]
    fn test_take_files_by_name() {
        let mut f = form(&[], &["images", "images[]", "file"]);
        assert_eq!(f.take_files(&["images", "images[]"]).len(), 2);
        assert_eq!(f.take_files(&["file"]).len(), 1);
        assert!(f.take_files(&["images"]).is_empty());
    }

    #[test]
    fn test_attachment_headers() {
        let response = attachment(Report {
            filename: "sales_report.pdf".to_owned(),
            content_type: "application/pdf",
            bytes: b"%PDF".to_vec(),
        });
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=sales_report.pdf"
        );
    }
}
