//! End-to-end customer journey against a running server.
//!
//! Needs a migrated database with at least one active, in-stock product.
//! Run with `STOCKROOM_TEST_URL=... cargo test -p stockroom-integration-tests -- --ignored`.

#![allow(clippy::unwrap_used)]

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use stockroom_integration_tests::server_base_url;

fn client() -> Client {
    Client::builder().cookie_store(true).build().unwrap()
}

fn unique_email() -> String {
    format!("shopper-{}@example.com", uuid::Uuid::new_v4().simple())
}

async fn register(client: &Client, base: &str, email: &str) -> Value {
    let response = client
        .post(format!("{base}/api/auth/register"))
        .json(&json!({ "name": "Test Shopper", "email": email, "password": "correct-horse-9" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.unwrap()
}

/// Register, then sign in so the client carries a session cookie.
async fn sign_up(client: &Client, base: &str, email: &str) -> Value {
    register(client, base, email).await;
    let response = client
        .post(format!("{base}/api/auth/login"))
        .json(&json!({ "email": email, "password": "correct-horse-9" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response.json().await.unwrap()
}

/// Money is serialized as a decimal string.
fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}

async fn in_stock_product(client: &Client, base: &str, min_stock: i64) -> Value {
    let catalog: Value = client
        .get(format!("{base}/api/products?size=50"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    catalog["content"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["stock"].as_i64().unwrap_or(0) >= min_stock)
        .cloned()
        .expect("an in-stock product in the catalog")
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_sign_up_then_me_then_logout() {
    let base = server_base_url();
    let client = client();
    let email = unique_email();

    let user = sign_up(&client, &base, &email).await;
    assert_eq!(user["role"], "CUSTOMER");
    assert_eq!(user["email"], email.as_str());

    let me: Value = client
        .get(format!("{base}/api/auth/me"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["email"], email.as_str());

    let status = client
        .post(format!("{base}/api/auth/logout"))
        .send()
        .await
        .unwrap()
        .status();
    assert!(status.is_success());

    let status = client
        .get(format!("{base}/api/auth/me"))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_duplicate_registration_conflicts() {
    let base = server_base_url();
    let email = unique_email();
    register(&client(), &base, &email).await;

    let status = client()
        .post(format!("{base}/api/auth/register"))
        .json(&json!({ "name": "Again", "email": email.to_uppercase(), "password": "correct-horse-9" }))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_wrong_password_is_unauthorized() {
    let base = server_base_url();
    let email = unique_email();
    register(&client(), &base, &email).await;

    let status = client()
        .post(format!("{base}/api/auth/login"))
        .json(&json!({ "email": email, "password": "not-the-password" }))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_cart_checkout_and_cancel() {
    let base = server_base_url();
    let client = client();
    sign_up(&client, &base, &unique_email()).await;

    let product = in_stock_product(&client, &base, 2).await;
    let stock_before = product["stock"].as_i64().unwrap();

    let line: Value = client
        .post(format!("{base}/api/customer/cart/add"))
        .json(&json!({ "productId": product["id"], "quantity": 2 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(line["quantity"], 2);

    let response = client
        .post(format!("{base}/api/customer/orders/checkout"))
        .json(&json!({ "shippingAddress": "1 Test Street", "phoneNumber": "555-0100" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let order: Value = response.json().await.unwrap();
    assert_eq!(order["status"], "PENDING");
    let items = order["orderItems"].as_array().unwrap();
    assert_eq!(items.len(), 1);

    let items_total: Decimal = items
        .iter()
        .map(|item| decimal(&item["price"]) * Decimal::from(item["quantity"].as_i64().unwrap()))
        .sum();
    assert_eq!(decimal(&order["totalAmount"]), items_total);
    assert_eq!(decimal(&order["totalAmount"]), decimal(&line["subtotal"]));
    assert_eq!(decimal(&items[0]["price"]), decimal(&product["price"]));

    let cart: Value = client
        .get(format!("{base}/api/customer/cart"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(cart.as_array().unwrap().is_empty());

    let after: Value = client
        .get(format!("{base}/api/products/{}", product["id"]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(after["stock"].as_i64().unwrap(), stock_before - 2);

    let cancelled: Value = client
        .put(format!("{base}/api/customer/orders/{}/cancel", order["id"]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cancelled["status"], "CANCELLED");

    let restocked: Value = client
        .get(format!("{base}/api/products/{}", product["id"]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(restocked["stock"].as_i64().unwrap(), stock_before);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_empty_cart_checkout_is_rejected() {
    let base = server_base_url();
    let client = client();
    sign_up(&client, &base, &unique_email()).await;

    let status = client
        .post(format!("{base}/api/customer/orders/checkout"))
        .json(&json!({ "shippingAddress": "1 Test Street" }))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_customer_cannot_reach_admin_area() {
    let base = server_base_url();
    let client = client();
    sign_up(&client, &base, &unique_email()).await;

    let status = client
        .get(format!("{base}/api/admin/dashboard"))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_customers_cannot_touch_each_others_cart_or_orders() {
    let base = server_base_url();
    let owner = client();
    let intruder = client();
    sign_up(&owner, &base, &unique_email()).await;
    sign_up(&intruder, &base, &unique_email()).await;

    let product = in_stock_product(&owner, &base, 2).await;
    let line: Value = owner
        .post(format!("{base}/api/customer/cart/add"))
        .json(&json!({ "productId": product["id"], "quantity": 1 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let line_url = format!("{base}/api/customer/cart/{}", line["id"]);

    let status = intruder
        .put(&line_url)
        .json(&json!({ "quantity": 2 }))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, StatusCode::FORBIDDEN);

    let status = intruder.delete(&line_url).send().await.unwrap().status();
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The owner's line is untouched
    let cart: Value = owner
        .get(format!("{base}/api/customer/cart"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let lines = cart.as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["quantity"], 1);

    let order: Value = owner
        .post(format!("{base}/api/customer/orders/checkout"))
        .json(&json!({ "shippingAddress": "2 Owner Road" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let order_url = format!("{base}/api/customer/orders/{}", order["id"]);

    let status = intruder.get(&order_url).send().await.unwrap().status();
    assert_eq!(status, StatusCode::FORBIDDEN);

    let status = intruder
        .put(format!("{order_url}/cancel"))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Clean up so the product's stock is restored
    let status = owner
        .put(format!("{order_url}/cancel"))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, StatusCode::OK);
}
