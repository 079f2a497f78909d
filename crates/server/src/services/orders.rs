//! Checkout and the order status workflow.
//!
//! Stock changes happen inside the repository transactions. Everything that
//! follows a committed change (notifications, emails, the low-stock check)
//! is best effort: a failure there is logged and never rolls back or fails
//! the order operation itself.

use std::collections::BTreeSet;

use sqlx::PgPool;
use thiserror::Error;

use stockroom_core::{NotificationType, OrderId, OrderStatus, Page, PageRequest, Role, UserId};

use crate::db::orders::{CheckoutDetails, CheckoutError, OrderFilter};
use crate::db::{OrderRepository, RepositoryError, UserRepository};
use crate::models::{CurrentUser, Order};
use crate::services::email::{EmailService, Notice};
use crate::services::notifications::{NotificationError, NotificationService};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("insufficient stock for product: {product}")]
    InsufficientStock { product: String },

    #[error("product is no longer available: {0}")]
    ProductUnavailable(String),

    #[error("order not found")]
    NotFound,

    #[error("order belongs to another customer")]
    NotOwner,

    #[error("order is not assigned to you")]
    NotAssigned,

    #[error("only pending or processing orders can be cancelled")]
    NotCancellable,

    #[error("order is already {0} and cannot change status")]
    FinalStatus(OrderStatus),

    #[error("order status changed, please reload and try again")]
    StatusChanged,

    #[error("user is not a staff member")]
    InvalidAssignee,

    #[error("staff member not found")]
    AssigneeNotFound,

    #[error("shipping address is required")]
    MissingShippingAddress,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<CheckoutError> for OrderError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::EmptyCart => Self::EmptyCart,
            CheckoutError::InsufficientStock { product, .. } => Self::InsufficientStock { product },
            CheckoutError::ProductUnavailable(name) => Self::ProductUnavailable(name),
            CheckoutError::Repository(e) => Self::Repository(e),
        }
    }
}

fn transition_error(err: RepositoryError) -> OrderError {
    match err {
        RepositoryError::Conflict(_) => OrderError::StatusChanged,
        other => OrderError::Repository(other),
    }
}

pub struct OrderService<'a> {
    orders: OrderRepository<'a>,
    users: UserRepository<'a>,
    notifications: NotificationService<'a>,
    email: &'a EmailService,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, email: &'a EmailService) -> Self {
        Self {
            orders: OrderRepository::new(pool),
            users: UserRepository::new(pool),
            notifications: NotificationService::new(pool, email),
            email,
        }
    }

    // =========================================================================
    // Customer
    // =========================================================================

    /// Turn the customer's cart into a `PENDING` order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::MissingShippingAddress`, `EmptyCart`,
    /// `InsufficientStock`, or `ProductUnavailable`. No stock or cart changes
    /// survive a failed checkout.
    pub async fn checkout(
        &self,
        customer: &CurrentUser,
        details: CheckoutDetails,
    ) -> Result<Order, OrderError> {
        if details.shipping_address.trim().is_empty() {
            return Err(OrderError::MissingShippingAddress);
        }

        let order = self.orders.checkout(customer.id, &details).await?;
        tracing::info!(
            order_id = %order.id,
            user_id = %customer.id,
            total = %order.total_amount,
            items = order.order_items.len(),
            "Order placed"
        );

        if let Err(e) = self.after_checkout(&order).await {
            tracing::error!(error = %e, order_id = %order.id, "Post-checkout notifications failed");
        }
        Ok(order)
    }

    async fn after_checkout(&self, order: &Order) -> Result<(), NotificationError> {
        let products: BTreeSet<_> = order.order_items.iter().map(|i| i.product_id).collect();
        for product_id in products {
            self.notifications.check_low_stock(product_id).await?;
        }

        if let Some(customer) = self.users.get_by_id(order.user_id).await?
            && customer.email_notifications
        {
            self.email
                .dispatch(&customer.email, &Notice::OrderConfirmation { order });
        }

        let message = format!("New order #{} placed by {}", order.id, order.user_name);
        let handlers = self.users.list_order_handlers().await?;
        self.notifications
            .notify_all(&handlers, &message, NotificationType::OrderPlaced)
            .await?;
        for handler in handlers.iter().filter(|u| u.email_notifications) {
            self.email.dispatch(&handler.email, &Notice::NewOrder { order });
        }
        Ok(())
    }

    /// The customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn customer_orders(&self, user_id: UserId) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.list_for_customer(user_id, None).await?)
    }

    /// # Errors
    ///
    /// Returns `OrderError::NotFound` or `NotOwner`.
    pub async fn customer_order(&self, user_id: UserId, id: OrderId) -> Result<Order, OrderError> {
        let order = self.get(id).await?;
        if order.user_id != user_id {
            return Err(OrderError::NotOwner);
        }
        Ok(order)
    }

    /// Cancel one of the customer's own orders and restock its items.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound`, `NotOwner`, or `NotCancellable` once
    /// the order has shipped.
    pub async fn cancel(&self, user_id: UserId, id: OrderId) -> Result<Order, OrderError> {
        let order = self.customer_order(user_id, id).await?;
        if !order.status.is_cancellable() {
            return Err(OrderError::NotCancellable);
        }

        self.orders
            .transition(id, order.status, OrderStatus::Cancelled)
            .await
            .map_err(transition_error)?;
        let order = self.get(id).await?;
        tracing::info!(order_id = %id, user_id = %user_id, "Order cancelled by customer");

        if let Err(e) = self.after_customer_cancel(&order).await {
            tracing::error!(error = %e, order_id = %id, "Cancellation notifications failed");
        }
        Ok(order)
    }

    async fn after_customer_cancel(&self, order: &Order) -> Result<(), NotificationError> {
        let message = format!("Order #{} was cancelled by customer", order.id);
        match order.staff_id {
            Some(staff_id) => {
                self.notifications
                    .notify(staff_id, &message, NotificationType::OrderUpdated)
                    .await?;
            }
            None => {
                let admins = self.users.list_by_role(Role::Admin).await?;
                self.notifications
                    .notify_all(&admins, &message, NotificationType::OrderUpdated)
                    .await?;
            }
        }

        self.email_customer_status(order).await
    }

    // =========================================================================
    // Staff
    // =========================================================================

    /// Orders assigned to the staff member, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn staff_orders(&self, staff_id: UserId) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.list_for_staff(staff_id).await?)
    }

    /// An order visible to the caller: assigned to them, or any order for admins.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` or `NotAssigned`.
    pub async fn staff_order(&self, actor: &CurrentUser, id: OrderId) -> Result<Order, OrderError> {
        let order = self.get(id).await?;
        if !actor.role.is_admin() && order.staff_id != Some(actor.id) {
            return Err(OrderError::NotAssigned);
        }
        Ok(order)
    }

    /// Move an order to a new status. Cancelling restocks every item.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotAssigned` when another staff member owns the
    /// order and the caller is not an admin, and `OrderError::FinalStatus`
    /// once the order is delivered or cancelled.
    pub async fn update_status(
        &self,
        actor: &CurrentUser,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, OrderError> {
        let order = self.get(id).await?;
        if let Some(staff_id) = order.staff_id
            && staff_id != actor.id
            && !actor.role.is_admin()
        {
            return Err(OrderError::NotAssigned);
        }
        if order.status.is_final() {
            return Err(OrderError::FinalStatus(order.status));
        }

        self.orders
            .transition(id, order.status, status)
            .await
            .map_err(transition_error)?;
        let updated = self.get(id).await?;
        tracing::info!(
            order_id = %id,
            from = %order.status,
            to = %status,
            actor_id = %actor.id,
            "Order status changed"
        );

        if let Err(e) = self.after_status_change(&updated).await {
            tracing::error!(error = %e, order_id = %id, "Status change notifications failed");
        }
        Ok(updated)
    }

    async fn after_status_change(&self, order: &Order) -> Result<(), NotificationError> {
        let message = format!("Your order #{} status updated to {}", order.id, order.status);
        self.notifications
            .notify(order.user_id, &message, NotificationType::OrderUpdated)
            .await?;

        self.email_customer_status(order).await
    }

    async fn email_customer_status(&self, order: &Order) -> Result<(), NotificationError> {
        if let Some(customer) = self.users.get_by_id(order.user_id).await?
            && customer.email_notifications
        {
            self.email
                .dispatch(&customer.email, &Notice::OrderStatus { order });
        }
        Ok(())
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn search(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<Page<Order>, OrderError> {
        let (orders, total) = self.orders.search(filter, page).await?;
        Ok(Page::new(orders, page, total))
    }

    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order doesn't exist.
    pub async fn get(&self, id: OrderId) -> Result<Order, OrderError> {
        self.orders.get(id).await?.ok_or(OrderError::NotFound)
    }

    /// Assign an order to a staff member or administrator.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound`, `AssigneeNotFound`, or
    /// `InvalidAssignee` when the target is a customer.
    pub async fn assign(&self, id: OrderId, staff_id: UserId) -> Result<Order, OrderError> {
        self.get(id).await?;
        let staff = self
            .users
            .get_by_id(staff_id)
            .await?
            .ok_or(OrderError::AssigneeNotFound)?;
        if !staff.role.is_staff() {
            return Err(OrderError::InvalidAssignee);
        }

        self.orders.assign(id, staff_id).await.map_err(|e| match e {
            RepositoryError::NotFound => OrderError::NotFound,
            other => other.into(),
        })?;
        tracing::info!(order_id = %id, staff_id = %staff_id, "Order assigned");

        let message = format!("Order #{id} has been assigned to you");
        if let Err(e) = self
            .notifications
            .notify(staff_id, &message, NotificationType::OrderPlaced)
            .await
        {
            tracing::error!(error = %e, order_id = %id, "Assignment notification failed");
        }

        self.get(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_error_mapping() {
        let err: OrderError = CheckoutError::InsufficientStock {
            product: "Mug".to_owned(),
            requested: 3,
            available: 1,
        }
        .into();
        assert_eq!(err.to_string(), "insufficient stock for product: Mug");

        assert!(matches!(
            OrderError::from(CheckoutError::EmptyCart),
            OrderError::EmptyCart
        ));
    }

    #[test]
    fn test_transition_conflict_is_status_changed() {
        assert!(matches!(
            transition_error(RepositoryError::Conflict("order 1 is no longer PENDING".into())),
            OrderError::StatusChanged
        ));
        assert!(matches!(
            transition_error(RepositoryError::NotFound),
            OrderError::Repository(RepositoryError::NotFound)
        ));
    }

    #[test]
    fn test_final_status_message() {
        assert_eq!(
            OrderError::FinalStatus(OrderStatus::Delivered).to_string(),
            "order is already DELIVERED and cannot change status"
        );
    }
}
