//! Transactional email.
//!
//! Uses SMTP via lettre for delivery with Askama text and HTML templates.
//! Without SMTP configuration the service still renders every message but
//! only logs it, which keeps local development and tests free of a mail
//! server.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use thiserror::Error;

use stockroom_core::{Email, OTP_TTL_MINUTES, OrderId, OrderStatus, OtpCode, ProductId};

use crate::config::EmailConfig;
use crate::models::Order;

#[derive(Template)]
#[template(path = "email/otp.html")]
struct OtpHtml<'a> {
    code: &'a str,
    ttl_minutes: i64,
}

#[derive(Template)]
#[template(path = "email/otp.txt")]
struct OtpText<'a> {
    code: &'a str,
    ttl_minutes: i64,
}

struct OrderLine<'a> {
    name: &'a str,
    quantity: i32,
    subtotal: Decimal,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    customer_name: &'a str,
    order_id: OrderId,
    lines: &'a [OrderLine<'a>],
    total: Decimal,
    shipping_address: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    customer_name: &'a str,
    order_id: OrderId,
    lines: &'a [OrderLine<'a>],
    total: Decimal,
    shipping_address: &'a str,
}

#[derive(Template)]
#[template(path = "email/new_order.html")]
struct NewOrderHtml<'a> {
    customer_name: &'a str,
    order_id: OrderId,
    total: Decimal,
    base_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/new_order.txt")]
struct NewOrderText<'a> {
    customer_name: &'a str,
    order_id: OrderId,
    total: Decimal,
    base_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/low_stock.html")]
struct LowStockHtml<'a> {
    product_id: ProductId,
    product_name: &'a str,
    stock: i32,
    base_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/low_stock.txt")]
struct LowStockText<'a> {
    product_id: ProductId,
    product_name: &'a str,
    stock: i32,
    base_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_status.html")]
struct OrderStatusHtml<'a> {
    customer_name: &'a str,
    order_id: OrderId,
    status: OrderStatus,
}

#[derive(Template)]
#[template(path = "email/order_status.txt")]
struct OrderStatusText<'a> {
    customer_name: &'a str,
    order_id: OrderId,
    status: OrderStatus,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A message the service knows how to render.
#[derive(Debug, Clone, Copy)]
pub enum Notice<'a> {
    /// Password reset code.
    Otp { code: &'a OtpCode },
    /// Receipt sent to the customer after checkout.
    OrderConfirmation { order: &'a Order },
    /// Heads-up to staff and administrators about a new order.
    NewOrder { order: &'a Order },
    /// Stock for a product fell under the alert threshold.
    LowStock {
        product_id: ProductId,
        product_name: &'a str,
        stock: i32,
    },
    /// The customer's order changed status.
    OrderStatus { order: &'a Order },
}

impl Notice<'_> {
    /// Short label used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Otp { .. } => "otp",
            Self::OrderConfirmation { .. } => "order_confirmation",
            Self::NewOrder { .. } => "new_order",
            Self::LowStock { .. } => "low_stock",
            Self::OrderStatus { .. } => "order_status",
        }
    }
}

/// A rendered message ready to hand to the transport.
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: String,
    base_url: String,
}

impl EmailService {
    /// Create an email service. `None` config logs messages instead of
    /// sending them.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: Option<&EmailConfig>, base_url: &str) -> Result<Self, SmtpError> {
        let Some(config) = config else {
            return Ok(Self::log_only(base_url));
        };

        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer: Some(mailer),
            from_address: config.from_address.clone(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// A service that renders and logs messages without an SMTP relay.
    #[must_use]
    pub fn log_only(base_url: &str) -> Self {
        Self {
            mailer: None,
            from_address: "stockroom@localhost".to_owned(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Whether messages are actually delivered.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.mailer.is_some()
    }

    /// Render subject and bodies for a notice.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Template` if a template fails to render.
    pub fn render(&self, notice: &Notice<'_>) -> Result<RenderedEmail, EmailError> {
        let base_url = self.base_url.as_str();
        let rendered = match *notice {
            Notice::Otp { code } => RenderedEmail {
                subject: "Your Stockroom password reset code".to_owned(),
                text: OtpText {
                    code: code.as_str(),
                    ttl_minutes: OTP_TTL_MINUTES,
                }
                .render()?,
                html: OtpHtml {
                    code: code.as_str(),
                    ttl_minutes: OTP_TTL_MINUTES,
                }
                .render()?,
            },
            Notice::OrderConfirmation { order } => {
                let lines: Vec<OrderLine<'_>> = order
                    .order_items
                    .iter()
                    .map(|item| OrderLine {
                        name: &item.product_name,
                        quantity: item.quantity,
                        subtotal: item.subtotal(),
                    })
                    .collect();
                RenderedEmail {
                    subject: format!("Order #{} confirmed", order.id),
                    text: OrderConfirmationText {
                        customer_name: &order.user_name,
                        order_id: order.id,
                        lines: &lines,
                        total: order.total_amount,
                        shipping_address: &order.shipping_address,
                    }
                    .render()?,
                    html: OrderConfirmationHtml {
                        customer_name: &order.user_name,
                        order_id: order.id,
                        lines: &lines,
                        total: order.total_amount,
                        shipping_address: &order.shipping_address,
                    }
                    .render()?,
                }
            }
            Notice::NewOrder { order } => RenderedEmail {
                subject: format!("New order #{}", order.id),
                text: NewOrderText {
                    customer_name: &order.user_name,
                    order_id: order.id,
                    total: order.total_amount,
                    base_url,
                }
                .render()?,
                html: NewOrderHtml {
                    customer_name: &order.user_name,
                    order_id: order.id,
                    total: order.total_amount,
                    base_url,
                }
                .render()?,
            },
            Notice::LowStock {
                product_id,
                product_name,
                stock,
            } => RenderedEmail {
                subject: format!("Low stock alert: {product_name}"),
                text: LowStockText {
                    product_id,
                    product_name,
                    stock,
                    base_url,
                }
                .render()?,
                html: LowStockHtml {
                    product_id,
                    product_name,
                    stock,
                    base_url,
                }
                .render()?,
            },
            Notice::OrderStatus { order } => RenderedEmail {
                subject: format!("Order #{} is now {}", order.id, order.status),
                text: OrderStatusText {
                    customer_name: &order.user_name,
                    order_id: order.id,
                    status: order.status,
                }
                .render()?,
                html: OrderStatusHtml {
                    customer_name: &order.user_name,
                    order_id: order.id,
                    status: order.status,
                }
                .render()?,
            },
        };
        Ok(rendered)
    }

    /// Render and send a notice, waiting for the relay.
    ///
    /// # Errors
    ///
    /// Returns error if rendering, message building, or delivery fails.
    pub async fn send(&self, to: &Email, notice: &Notice<'_>) -> Result<(), EmailError> {
        let rendered = self.render(notice)?;
        self.deliver(to.as_str(), &rendered).await
    }

    /// Render a notice now and deliver it on a background task.
    ///
    /// Failures are logged; callers never wait on or see delivery errors.
    pub fn dispatch(&self, to: &Email, notice: &Notice<'_>) {
        let kind = notice.kind();
        let rendered = match self.render(notice) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::error!(error = %e, kind, "Failed to render email");
                return;
            }
        };

        let service = self.clone();
        let to = to.as_str().to_owned();
        tokio::spawn(async move {
            if let Err(e) = service.deliver(&to, &rendered).await {
                tracing::warn!(error = %e, to = %to, kind, "Failed to send email");
            }
        });
    }

    async fn deliver(&self, to: &str, rendered: &RenderedEmail) -> Result<(), EmailError> {
        let Some(mailer) = &self.mailer else {
            tracing::info!(
                to = %to,
                subject = %rendered.subject,
                body = %rendered.text,
                "SMTP not configured, logging email instead of sending"
            );
            return Ok(());
        };

        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(rendered.subject.as_str())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(rendered.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(rendered.html.clone()),
                    ),
            )?;

        mailer.send(email).await?;

        tracing::info!(to = %to, subject = %rendered.subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use stockroom_core::{OrderItemId, UserId};

    use super::*;
    use crate::models::OrderItem;

    fn order() -> Order {
        Order {
            id: OrderId::new(42),
            user_id: UserId::new(7),
            user_name: "Dana <Buyer>".to_owned(),
            staff_id: None,
            staff_name: None,
            status: OrderStatus::Shipped,
            total_amount: Decimal::new(3000, 2),
            shipping_address: "1 Main St".to_owned(),
            phone_number: None,
            special_instructions: None,
            preferred_delivery_date: None,
            order_items: vec![OrderItem {
                id: OrderItemId::new(1),
                product_id: ProductId::new(3),
                product_name: "Mug".to_owned(),
                quantity: 2,
                price: Decimal::new(1500, 2),
            }],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_otp_email_contains_code() {
        let service = EmailService::log_only("https://shop.example.com/");
        let code = OtpCode::from_number(4217);
        let rendered = service.render(&Notice::Otp { code: &code }).unwrap();
        assert!(rendered.text.contains("004217"));
        assert!(rendered.html.contains("004217"));
        assert!(rendered.text.contains("5 minutes"));
    }

    #[test]
    fn test_order_confirmation_lists_items() {
        let service = EmailService::log_only("https://shop.example.com");
        let order = order();
        let rendered = service
            .render(&Notice::OrderConfirmation { order: &order })
            .unwrap();
        assert_eq!(rendered.subject, "Order #42 confirmed");
        assert!(rendered.text.contains("Mug x 2: $30.00"));
        assert!(rendered.text.contains("Total: $30.00"));
    }

    #[test]
    fn test_html_bodies_escape_names() {
        let service = EmailService::log_only("https://shop.example.com");
        let order = order();
        let rendered = service.render(&Notice::NewOrder { order: &order }).unwrap();
        assert!(rendered.html.contains("Dana &#60;Buyer&#62;") || rendered.html.contains("Dana &lt;Buyer&gt;"));
        assert!(rendered.text.contains("Dana <Buyer>"));
        assert!(rendered.text.contains("https://shop.example.com/staff/orders/42"));
    }

    #[test]
    fn test_low_stock_and_status_subjects() {
        let service = EmailService::log_only("https://shop.example.com");
        let low = service
            .render(&Notice::LowStock {
                product_id: ProductId::new(9),
                product_name: "Kettle",
                stock: 3,
            })
            .unwrap();
        assert_eq!(low.subject, "Low stock alert: Kettle");
        assert!(low.text.contains("has only 3 units left"));

        let order = order();
        let status = service.render(&Notice::OrderStatus { order: &order }).unwrap();
        assert_eq!(status.subject, "Order #42 is now SHIPPED");
    }

    #[test]
    fn test_log_only_is_disabled() {
        assert!(!EmailService::log_only("http://localhost").is_enabled());
        assert!(
            !EmailService::new(None, "http://localhost")
                .unwrap()
                .is_enabled()
        );
    }

    #[tokio::test]
    async fn test_send_without_smtp_succeeds() {
        let service = EmailService::log_only("http://localhost");
        let code = OtpCode::from_number(1);
        let to = Email::parse("someone@example.com").unwrap();
        service.send(&to, &Notice::Otp { code: &code }).await.unwrap();
    }
}
