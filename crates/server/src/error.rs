//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Every error is rendered as a JSON body of the form `{"message": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::catalog::CatalogError;
use crate::services::notifications::NotificationError;
use crate::services::orders::OrderError;
use crate::services::reports::ReportError;
use crate::services::reviews::ReviewError;
use crate::services::storage::StorageError;
use crate::services::users::UserError;
use crate::services::wishlist::WishlistError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Review(#[from] ReviewError),

    #[error(transparent)]
    Wishlist(#[from] WishlistError),

    #[error(transparent)]
    User(#[from] UserError),

    #[error(transparent)]
    Notification(#[from] NotificationError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Session store read/write failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but the role doesn't allow this.
    #[error("{0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

const fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidEmail(_)
        | AuthError::WeakPassword(_)
        | AuthError::InvalidOtp
        | AuthError::InvalidOtpFormat(_) => StatusCode::BAD_REQUEST,
        AuthError::InvalidCredentials | AuthError::AccountDisabled => StatusCode::UNAUTHORIZED,
        AuthError::UserNotFound => StatusCode::NOT_FOUND,
        AuthError::UserAlreadyExists => StatusCode::CONFLICT,
        AuthError::Repository(e) => repository_status(e),
        AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

const fn cart_status(err: &CartError) -> StatusCode {
    match err {
        CartError::ProductInactive | CartError::InvalidQuantity => StatusCode::BAD_REQUEST,
        CartError::NotOwner => StatusCode::FORBIDDEN,
        CartError::ProductNotFound | CartError::ItemNotFound => StatusCode::NOT_FOUND,
        CartError::InsufficientStock { .. } => StatusCode::CONFLICT,
        CartError::Repository(e) => repository_status(e),
    }
}

const fn order_status(err: &OrderError) -> StatusCode {
    match err {
        OrderError::EmptyCart | OrderError::InvalidAssignee | OrderError::MissingShippingAddress => {
            StatusCode::BAD_REQUEST
        }
        OrderError::NotOwner | OrderError::NotAssigned => StatusCode::FORBIDDEN,
        OrderError::NotFound | OrderError::AssigneeNotFound => StatusCode::NOT_FOUND,
        OrderError::InsufficientStock { .. }
        | OrderError::ProductUnavailable(_)
        | OrderError::NotCancellable
        | OrderError::FinalStatus(_)
        | OrderError::StatusChanged => StatusCode::CONFLICT,
        OrderError::Repository(e) => repository_status(e),
    }
}

const fn storage_status(err: &StorageError) -> StatusCode {
    match err {
        StorageError::EmptyFile | StorageError::UnsupportedType => StatusCode::BAD_REQUEST,
        StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

const fn catalog_status(err: &CatalogError) -> StatusCode {
    match err {
        CatalogError::ProductNotFound
        | CatalogError::CategoryNotFound
        | CatalogError::ImageNotFound => StatusCode::NOT_FOUND,
        CatalogError::CategoryNameTaken
        | CatalogError::CategoryInUse
        | CatalogError::ProductHasOrders => StatusCode::CONFLICT,
        CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
        CatalogError::Storage(e) => storage_status(e),
        CatalogError::Repository(e) => repository_status(e),
    }
}

const fn review_status(err: &ReviewError) -> StatusCode {
    match err {
        ReviewError::ProductNotFound | ReviewError::NotFound => StatusCode::NOT_FOUND,
        ReviewError::NotPurchased | ReviewError::NotOwner => StatusCode::FORBIDDEN,
        ReviewError::AlreadyReviewed => StatusCode::CONFLICT,
        ReviewError::InvalidRating => StatusCode::BAD_REQUEST,
        ReviewError::Repository(e) => repository_status(e),
    }
}

const fn wishlist_status(err: &WishlistError) -> StatusCode {
    match err {
        WishlistError::ProductNotFound | WishlistError::NotFound => StatusCode::NOT_FOUND,
        WishlistError::AlreadyInWishlist => StatusCode::CONFLICT,
        WishlistError::NotOwner => StatusCode::FORBIDDEN,
        WishlistError::Repository(e) => repository_status(e),
    }
}

const fn user_status(err: &UserError) -> StatusCode {
    match err {
        UserError::NotFound => StatusCode::NOT_FOUND,
        UserError::EmailTaken | UserError::HasOrders => StatusCode::CONFLICT,
        UserError::InvalidEmail(_)
        | UserError::WeakPassword(_)
        | UserError::WrongPassword
        | UserError::SelfDeletion
        | UserError::Validation(_) => StatusCode::BAD_REQUEST,
        UserError::Storage(e) => storage_status(e),
        UserError::Repository(e) => repository_status(e),
        UserError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

const fn notification_status(err: &NotificationError) -> StatusCode {
    match err {
        NotificationError::NotFound => StatusCode::NOT_FOUND,
        NotificationError::NotOwner => StatusCode::FORBIDDEN,
        NotificationError::Repository(e) => repository_status(e),
    }
}

const fn report_status(err: &ReportError) -> StatusCode {
    match err {
        ReportError::UnknownFormat(_) => StatusCode::BAD_REQUEST,
        ReportError::Repository(e) => repository_status(e),
        ReportError::Pdf(_) | ReportError::Excel(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(e) => repository_status(e),
            Self::Auth(e) => auth_status(e),
            Self::Cart(e) => cart_status(e),
            Self::Order(e) => order_status(e),
            Self::Catalog(e) => catalog_status(e),
            Self::Review(e) => review_status(e),
            Self::Wishlist(e) => wishlist_status(e),
            Self::User(e) => user_status(e),
            Self::Notification(e) => notification_status(e),
            Self::Report(e) => report_status(e),
            Self::Storage(e) => storage_status(e),
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Client-facing message. Server errors never expose details.
    fn public_message(&self, status: StatusCode) -> String {
        if status.is_server_error() {
            return "Internal server error".to_owned();
        }
        match self {
            Self::Auth(AuthError::InvalidCredentials) => "Invalid email or password".to_owned(),
            Self::Auth(AuthError::UserAlreadyExists) => {
                "An account with this email already exists".to_owned()
            }
            Self::Auth(AuthError::WeakPassword(msg)) | Self::User(UserError::WeakPassword(msg)) => {
                msg.clone()
            }
            Self::Auth(AuthError::InvalidEmail(_)) | Self::User(UserError::InvalidEmail(_)) => {
                "Invalid email address".to_owned()
            }
            Self::Database(RepositoryError::NotFound) => "Resource not found".to_owned(),
            Self::Database(RepositoryError::Conflict(msg)) => msg.clone(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let message = self.public_message(status);
        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a business action.
///
/// ```rust,ignore
/// add_breadcrumb("order", "Checkout started", Some(&[("user_id", "42")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use stockroom_core::OrderStatus;

    fn get_status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    async fn body_message(err: AppError) -> String {
        let response = err.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["message"].as_str().unwrap().to_owned()
    }

    #[test]
    fn test_generic_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_status_codes() {
        assert_eq!(get_status(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(get_status(AuthError::AccountDisabled), StatusCode::UNAUTHORIZED);
        assert_eq!(get_status(AuthError::UserNotFound), StatusCode::NOT_FOUND);
        assert_eq!(get_status(AuthError::UserAlreadyExists), StatusCode::CONFLICT);
        assert_eq!(get_status(AuthError::InvalidOtp), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_order_status_codes() {
        assert_eq!(get_status(OrderError::EmptyCart), StatusCode::BAD_REQUEST);
        assert_eq!(get_status(OrderError::NotOwner), StatusCode::FORBIDDEN);
        assert_eq!(get_status(OrderError::NotAssigned), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(OrderError::InsufficientStock {
                product: "Mug".to_owned()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(OrderError::FinalStatus(OrderStatus::Cancelled)),
            StatusCode::CONFLICT
        );
        assert_eq!(get_status(OrderError::InvalidAssignee), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_ownership_errors_are_forbidden() {
        assert_eq!(get_status(CartError::NotOwner), StatusCode::FORBIDDEN);
        assert_eq!(get_status(WishlistError::NotOwner), StatusCode::FORBIDDEN);
        assert_eq!(get_status(ReviewError::NotOwner), StatusCode::FORBIDDEN);
        assert_eq!(get_status(NotificationError::NotOwner), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_conflicts() {
        assert_eq!(get_status(CatalogError::CategoryInUse), StatusCode::CONFLICT);
        assert_eq!(get_status(CatalogError::ProductHasOrders), StatusCode::CONFLICT);
        assert_eq!(get_status(ReviewError::AlreadyReviewed), StatusCode::CONFLICT);
        assert_eq!(get_status(WishlistError::AlreadyInWishlist), StatusCode::CONFLICT);
        assert_eq!(get_status(UserError::HasOrders), StatusCode::CONFLICT);
    }

    #[test]
    fn test_nested_storage_errors() {
        assert_eq!(
            get_status(CatalogError::Storage(StorageError::UnsupportedType)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(UserError::Storage(StorageError::Io(std::io::Error::other("disk")))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_body_is_json_message() {
        assert_eq!(
            body_message(OrderError::EmptyCart.into()).await,
            "cart is empty"
        );
        assert_eq!(
            body_message(AuthError::InvalidCredentials.into()).await,
            "Invalid email or password"
        );
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        assert_eq!(
            body_message(AppError::Internal("connection refused at 10.0.0.3".into())).await,
            "Internal server error"
        );
    }
}
