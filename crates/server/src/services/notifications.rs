//! In-app notifications and the low-stock alert.

use sqlx::PgPool;
use thiserror::Error;

use stockroom_core::{NotificationId, NotificationType, ProductId, Role, UserId, needs_low_stock_alert};

use crate::db::products::LowStockProduct;
use crate::db::{NotificationRepository, ProductRepository, RepositoryError, UserRepository};
use crate::models::{Notification, User};
use crate::services::email::{EmailService, Notice};

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification not found")]
    NotFound,

    #[error("notification belongs to another user")]
    NotOwner,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Text of the low-stock notification.
#[must_use]
pub fn low_stock_message(product_name: &str, stock: i32) -> String {
    format!("Low stock alert: {product_name} has only {stock} units left")
}

pub struct NotificationService<'a> {
    notifications: NotificationRepository<'a>,
    users: UserRepository<'a>,
    products: ProductRepository<'a>,
    email: &'a EmailService,
}

impl<'a> NotificationService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, email: &'a EmailService) -> Self {
        Self {
            notifications: NotificationRepository::new(pool),
            users: UserRepository::new(pool),
            products: ProductRepository::new(pool),
            email,
        }
    }

    /// # Errors
    ///
    /// Returns `NotificationError::Repository` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Notification>, NotificationError> {
        Ok(self.notifications.list(user_id).await?)
    }

    /// # Errors
    ///
    /// Returns `NotificationError::Repository` if the query fails.
    pub async fn unread_count(&self, user_id: UserId) -> Result<i64, NotificationError> {
        Ok(self.notifications.unread_count(user_id).await?)
    }

    /// Mark one of the caller's notifications as read.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::NotFound` or `NotOwner`.
    pub async fn mark_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> Result<(), NotificationError> {
        let notification = self
            .notifications
            .get(id)
            .await?
            .ok_or(NotificationError::NotFound)?;
        if notification.user_id != user_id {
            return Err(NotificationError::NotOwner);
        }
        self.notifications.mark_read(id).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `NotificationError::Repository` if the update fails.
    pub async fn mark_all_read(&self, user_id: UserId) -> Result<u64, NotificationError> {
        Ok(self.notifications.mark_all_read(user_id).await?)
    }

    /// Create a notification for one user.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::Repository` if the insert fails.
    pub async fn notify(
        &self,
        user_id: UserId,
        message: &str,
        kind: NotificationType,
    ) -> Result<Notification, NotificationError> {
        let notification = self.notifications.create(user_id, message, kind).await?;
        tracing::debug!(user_id = %user_id, kind = ?kind, "Notification created");
        Ok(notification)
    }

    /// Create the same notification for several users.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::Repository` on the first failed insert.
    pub async fn notify_all(
        &self,
        recipients: &[User],
        message: &str,
        kind: NotificationType,
    ) -> Result<(), NotificationError> {
        for user in recipients {
            self.notify(user.id, message, kind).await?;
        }
        Ok(())
    }

    /// Alert administrators if a product's stock is under the threshold.
    ///
    /// Returns how many alerts were created. Administrators who still have an
    /// unread alert for the product are skipped.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::Repository` if a query fails.
    pub async fn check_low_stock(&self, product_id: ProductId) -> Result<usize, NotificationError> {
        match self.products.stock_level(product_id).await? {
            Some(product) => self.alert_low_stock(&product).await,
            None => Ok(0),
        }
    }

    /// Run the low-stock check for every product under the threshold.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::Repository` if a query fails.
    pub async fn sweep_low_stock(&self) -> Result<usize, NotificationError> {
        let mut created = 0;
        for product in self.products.list_low_stock().await? {
            created += self.alert_low_stock(&product).await?;
        }
        Ok(created)
    }

    async fn alert_low_stock(&self, product: &LowStockProduct) -> Result<usize, NotificationError> {
        if !needs_low_stock_alert(product.stock) {
            return Ok(0);
        }

        let message = low_stock_message(&product.name, product.stock);
        let mut created = 0;
        for admin in self.users.list_by_role(Role::Admin).await? {
            if self
                .notifications
                .has_unread_low_stock(admin.id, &product.name)
                .await?
            {
                continue;
            }

            self.notify(admin.id, &message, NotificationType::LowStock)
                .await?;
            if admin.email_notifications {
                self.email.dispatch(
                    &admin.email,
                    &Notice::LowStock {
                        product_id: product.id,
                        product_name: &product.name,
                        stock: product.stock,
                    },
                );
            }
            created += 1;
        }

        if created > 0 {
            tracing::info!(
                product_id = %product.id,
                product = %product.name,
                stock = product.stock,
                alerts = created,
                "Low stock alert"
            );
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_stock_message() {
        assert_eq!(
            low_stock_message("Blue Mug", 3),
            "Low stock alert: Blue Mug has only 3 units left"
        );
    }
}
