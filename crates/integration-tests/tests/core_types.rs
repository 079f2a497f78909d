//! Public API of `stockroom-core`: wire names, parsing, and paging rules
//! that clients depend on.

#![allow(clippy::unwrap_used)]

use serde_json::json;
use stockroom_core::{
    Email, NotificationType, OrderStatus, OtpCode, Page, PageRequest, ProductId, Role,
    StockStatus, ThemePreference, needs_low_stock_alert,
};

#[test]
fn test_enum_wire_names() {
    assert_eq!(serde_json::to_value(Role::Staff).unwrap(), json!("STAFF"));
    assert_eq!(
        serde_json::to_value(OrderStatus::Processing).unwrap(),
        json!("PROCESSING")
    );
    assert_eq!(
        serde_json::to_value(NotificationType::LowStock).unwrap(),
        json!("LOW_STOCK")
    );
    assert_eq!(
        serde_json::to_value(StockStatus::OutOfStock).unwrap(),
        json!("OUT_OF_STOCK")
    );
    assert_eq!(
        serde_json::to_value(ThemePreference::Dark).unwrap(),
        json!("dark")
    );
}

#[test]
fn test_role_parsing_is_lenient() {
    for (input, expected) in [
        ("admin", Role::Admin),
        ("ROLE_STAFF", Role::Staff),
        (" Customer ", Role::Customer),
    ] {
        assert_eq!(input.parse::<Role>().unwrap(), expected, "{input}");
    }
    assert!("manager".parse::<Role>().is_err());
}

#[test]
fn test_status_workflow_rules() {
    let cancellable: Vec<_> = OrderStatus::ALL
        .into_iter()
        .filter(|s| s.is_cancellable())
        .collect();
    assert_eq!(
        cancellable,
        vec![OrderStatus::Pending, OrderStatus::Processing]
    );

    let final_states: Vec<_> = OrderStatus::ALL
        .into_iter()
        .filter(|s| s.is_final())
        .collect();
    assert_eq!(
        final_states,
        vec![OrderStatus::Delivered, OrderStatus::Cancelled]
    );

    assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
}

#[test]
fn test_stock_thresholds() {
    assert_eq!(StockStatus::from_stock(0), StockStatus::OutOfStock);
    assert_eq!(StockStatus::from_stock(10), StockStatus::LowStock);
    assert_eq!(StockStatus::from_stock(11), StockStatus::InStock);

    // Ten units show as low stock but do not raise an alert
    assert!(!needs_low_stock_alert(10));
    assert!(needs_low_stock_alert(9));
}

#[test]
fn test_otp_codes_are_zero_padded() {
    assert_eq!(OtpCode::from_number(42).as_str(), "000042");
    assert_eq!(OtpCode::parse(" 000042 ").unwrap(), OtpCode::from_number(42));
    assert!(OtpCode::parse("12345").is_err());
    assert!(OtpCode::parse("12a456").is_err());
}

#[test]
fn test_page_json_shape() {
    let request = PageRequest::new(Some(1), Some(2), 20);
    let page = Page::new(vec![ProductId::new(3)], request, 5);
    assert_eq!(
        serde_json::to_value(&page).unwrap(),
        json!({
            "content": [3],
            "page": 1,
            "size": 2,
            "totalElements": 5,
            "totalPages": 3,
            "first": false,
            "last": false,
        })
    );
}

#[test]
fn test_page_size_is_capped() {
    let request = PageRequest::new(None, Some(10_000), 20);
    assert_eq!(request.size, PageRequest::MAX_SIZE);
    assert_eq!(request.offset(), 0);
}

#[test]
fn test_email_normalization() {
    let email = Email::parse("  Shopper@Example.COM ").unwrap();
    assert_eq!(email.domain(), "example.com");
    assert!(Email::parse("not-an-email").is_err());
}
