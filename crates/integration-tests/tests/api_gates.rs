//! Router-level tests through `tower::ServiceExt::oneshot`.
//!
//! The pool never connects, so these cover everything decided before the
//! first query: role gates, request validation, rate limiting, and the
//! middleware stack.

#![allow(clippy::unwrap_used)]

use axum::{
    Json, Router,
    body::Body,
    extract::Path,
    http::{Method, Request, StatusCode, header},
    routing::get,
};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, Session, SessionManagerLayer};

use stockroom_core::{Email, Role, UserId};
use stockroom_integration_tests::{UNREACHABLE_DATABASE_URL, lazy_state, test_config};
use stockroom_server::app;
use stockroom_server::middleware::{
    RequireAdmin, RequireAuth, RequireCustomer, RequireStaff, set_current_user,
};
use stockroom_server::models::CurrentUser;
use stockroom_server::state::AppState;

async fn send(router: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body.to_vec())
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ============================================================================
// Middleware stack
// ============================================================================

#[tokio::test]
async fn test_health_is_ok_with_security_headers() {
    let (status, headers, body) = send(app(lazy_state()), get_request("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_request_id_is_echoed_when_well_formed() {
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "edge-1234")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(app(lazy_state()), request).await;
    assert_eq!(headers["x-request-id"], "edge-1234");

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "has spaces")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(app(lazy_state()), request).await;
    assert_ne!(headers["x-request-id"], "has spaces");
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let (status, _, _) = send(app(lazy_state()), get_request("/health/ready")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_cors_preflight_for_configured_origin() {
    let mut config = test_config();
    config.cors_origins = vec!["https://shop.example.com".to_owned()];
    let pool = PgPoolOptions::new()
        .connect_lazy(UNREACHABLE_DATABASE_URL)
        .unwrap();
    let state = AppState::new(config, pool).unwrap();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/products")
        .header(header::ORIGIN, "https://shop.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(app(state), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://shop.example.com"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

// ============================================================================
// Authentication gates
// ============================================================================

#[tokio::test]
async fn test_protected_routes_require_a_session() {
    for uri in [
        "/api/auth/me",
        "/api/customer/cart",
        "/api/customer/orders",
        "/api/customer/wishlist",
        "/api/customer/dashboard",
        "/api/customer/reports/order-history",
        "/api/staff/orders",
        "/api/staff/dashboard",
        "/api/admin/dashboard",
        "/api/admin/users",
        "/api/admin/reports/sales",
        "/api/notifications",
        "/api/notifications/unread-count",
        "/api/profile",
    ] {
        let (status, _, body) = send(app(lazy_state()), get_request(uri)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");

        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Authentication required", "{uri}");
    }
}

#[tokio::test]
async fn test_mutations_require_a_session() {
    for (method, uri) in [
        (Method::POST, "/api/customer/orders/checkout"),
        (Method::PUT, "/api/staff/orders/1/status"),
        (Method::DELETE, "/api/admin/products/1"),
        (Method::PUT, "/api/notifications/read-all"),
    ] {
        let request = Request::builder()
            .method(method.clone())
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, _, _) = send(app(lazy_state()), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
}

// ============================================================================
// Role gates
// ============================================================================

/// A router with the real extractors over an in-memory session store, plus a
/// route that signs in as any role.
fn role_router() -> Router {
    async fn sign_in(session: Session, Path(role): Path<String>) -> StatusCode {
        let user = CurrentUser {
            id: UserId::new(7),
            email: Email::parse("someone@example.com").unwrap(),
            name: "Someone".to_owned(),
            role: role.parse::<Role>().unwrap(),
        };
        set_current_user(&session, &user).await.unwrap();
        StatusCode::NO_CONTENT
    }

    Router::new()
        .route("/sign-in/{role}", get(sign_in))
        .route(
            "/any",
            get(|RequireAuth(user): RequireAuth| async move { Json(user) }),
        )
        .route(
            "/customer",
            get(|RequireCustomer(_): RequireCustomer| async { StatusCode::OK }),
        )
        .route(
            "/staff",
            get(|RequireStaff(_): RequireStaff| async { StatusCode::OK }),
        )
        .route(
            "/admin",
            get(|RequireAdmin(_): RequireAdmin| async { StatusCode::OK }),
        )
        .layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false))
}

async fn session_cookie(router: &Router, role: &str) -> String {
    let response = router
        .clone()
        .oneshot(get_request(&format!("/sign-in/{role}")))
        .await
        .unwrap();
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    cookie.split(';').next().unwrap().to_owned()
}

async fn status_as(router: &Router, cookie: &str, uri: &str) -> StatusCode {
    let request = Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    router.clone().oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn test_role_matrix() {
    let router = role_router();
    let customer = session_cookie(&router, "customer").await;
    let staff = session_cookie(&router, "staff").await;
    let admin = session_cookie(&router, "admin").await;

    let expectations = [
        (&customer, "/customer", StatusCode::OK),
        (&customer, "/staff", StatusCode::FORBIDDEN),
        (&customer, "/admin", StatusCode::FORBIDDEN),
        (&staff, "/customer", StatusCode::FORBIDDEN),
        (&staff, "/staff", StatusCode::OK),
        (&staff, "/admin", StatusCode::FORBIDDEN),
        (&admin, "/customer", StatusCode::FORBIDDEN),
        (&admin, "/staff", StatusCode::OK),
        (&admin, "/admin", StatusCode::OK),
    ];
    for (cookie, uri, expected) in expectations {
        assert_eq!(status_as(&router, cookie, uri).await, expected, "{cookie} {uri}");
    }
}

#[tokio::test]
async fn test_forbidden_body_names_the_required_role() {
    let router = role_router();
    let customer = session_cookie(&router, "customer").await;

    let request = Request::builder()
        .uri("/admin")
        .header(header::COOKIE, &customer)
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(router, request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["message"], "Admin access required");
}

#[tokio::test]
async fn test_session_identity_round_trips() {
    let router = role_router();
    let staff = session_cookie(&router, "ROLE_STAFF").await;

    let request = Request::builder()
        .uri("/any")
        .header(header::COOKIE, &staff)
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(router, request).await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["role"], "STAFF");
    assert_eq!(json["email"], "someone@example.com");
}

// ============================================================================
// Request validation
// ============================================================================

#[tokio::test]
async fn test_malformed_query_and_path_are_rejected() {
    for uri in [
        "/api/products?minPrice=cheap",
        "/api/products/not-a-number",
        "/api/products/category/abc",
        "/api/products/1/reviews/extra",
    ] {
        let (status, _, _) = send(app(lazy_state()), get_request(uri)).await;
        assert!(
            status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND,
            "{uri}: {status}"
        );
    }
}

#[tokio::test]
async fn test_auth_routes_are_rate_limited_per_client() {
    let router = app(lazy_state());

    let login = || {
        Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "203.0.113.50")
            .body(Body::from("{not json"))
            .unwrap()
    };

    // Burst of five malformed requests gets through to the JSON extractor
    for _ in 0..5 {
        let status = router.clone().oneshot(login()).await.unwrap().status();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    let status = router.clone().oneshot(login()).await.unwrap().status();
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // A different client still has its own budget
    let other = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "198.51.100.9")
        .body(Body::from("{not json"))
        .unwrap();
    let status = router.oneshot(other).await.unwrap().status();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
