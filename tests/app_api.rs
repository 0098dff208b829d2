//! Application-level Tests
//!
//! Behavior shared by every route: error rendering per environment, request
//! hygiene (body limit, malformed JSON, rate limiting) and the bundled seed
//! data served end to end.

mod common;

use std::path::Path;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;

use common::{data, names, request_from, test_config, TestApp, TEST_PEER};
use tourbook::cli::import_seed;
use tourbook::config::{AppConfig, Environment};

#[tokio::test]
async fn test_greeting() {
    let app = TestApp::new();

    let response = app.get("/").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Hello from the server side");
}

// =============================================================================
// Error Rendering
// =============================================================================

#[tokio::test]
async fn test_unknown_route_in_development() {
    let app = TestApp::new();

    let response = app.get("/api/v1/bookings").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["status"], "fail");
    assert_eq!(
        response.body["message"],
        "Can't find /api/v1/bookings on this server!"
    );
    assert!(response.body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_production_hides_error_details() {
    let app = TestApp::with_config(AppConfig {
        environment: Environment::Production,
        ..test_config()
    });

    let response = app.get("/api/v1/bookings").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(
        response.body,
        json!({"status": "fail", "message": "Can't find /api/v1/bookings on this server!"})
    );
}

#[tokio::test]
async fn test_malformed_json_body() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/users/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\": "))
        .unwrap();

    let response = app.send_request(request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["status"], "fail");
}

#[tokio::test]
async fn test_json_array_body_is_rejected() {
    let app = TestApp::new();

    let response = app
        .send(Method::POST, "/api/v1/users/login", None, Some(json!(["a", "b"])))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_body() {
    let app = TestApp::with_config(AppConfig {
        body_limit_bytes: 64,
        ..test_config()
    });
    let body = json!({"email": "ann@example.io", "password": "x".repeat(200)});

    let response = app.send(Method::POST, "/api/v1/users/login", None, Some(body)).await;

    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
}

// =============================================================================
// Rate Limiting
// =============================================================================

#[tokio::test]
async fn test_rate_limit_per_client() {
    let app = TestApp::with_config(AppConfig {
        rate_limit_max: 2,
        ..test_config()
    });

    let first = app.get("/api/v1/tours").await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.headers["x-ratelimit-limit"], "2");
    assert_eq!(first.headers["x-ratelimit-remaining"], "1");

    app.get("/api/v1/tours").await;
    let third = app.get("/api/v1/tours").await;
    assert_eq!(third.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(third.body["status"], "fail");
    assert_eq!(
        third.body["message"],
        "Too many requests from this IP, please try again in an hour!"
    );
    assert!(third.headers.contains_key("x-ratelimit-after"));

    let other_peer = app.send_request(request_from("/api/v1/tours", "198.51.100.4:5000")).await;
    assert_eq!(other_peer.status, StatusCode::OK);

    let greeting = app.get("/").await;
    assert_eq!(greeting.status, StatusCode::OK);
}

#[tokio::test]
async fn test_forwarded_for_does_not_reset_budget() {
    let app = TestApp::with_config(AppConfig {
        rate_limit_max: 1,
        ..test_config()
    });

    assert_eq!(app.get("/api/v1/tours").await.status, StatusCode::OK);

    for forwarded in ["203.0.113.7", "203.0.113.8"] {
        let spoofed = Request::builder()
            .uri("/api/v1/tours")
            .header("x-forwarded-for", forwarded)
            .body(Body::empty())
            .unwrap();
        let response = app.send_request(spoofed).await;
        assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    }
}

#[tokio::test]
async fn test_trusted_proxy_keys_on_forwarded_for() {
    let app = TestApp::with_config(AppConfig {
        rate_limit_max: 1,
        trust_proxy: true,
        ..test_config()
    });
    let proxied = |client: &str| {
        let mut request = request_from("/api/v1/tours", TEST_PEER);
        request
            .headers_mut()
            .insert("x-forwarded-for", client.parse().unwrap());
        request
    };

    assert_eq!(app.send_request(proxied("203.0.113.7")).await.status, StatusCode::OK);
    assert_eq!(
        app.send_request(proxied("203.0.113.7")).await.status,
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(app.send_request(proxied("203.0.113.8")).await.status, StatusCode::OK);
}

// =============================================================================
// Seed Data
// =============================================================================

#[tokio::test]
async fn test_bundled_seed_data() {
    let app = TestApp::new();
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");

    let counts = import_seed(app.db(), &dir).unwrap();
    assert_eq!((counts.tours, counts.users, counts.reviews), (3, 5, 4));

    let top = app.get("/api/v1/tours/top-5-cheap").await;
    assert_eq!(
        names(data(&top, "tours")),
        vec!["The Forest Hiker", "The Sea Explorer", "The Snow Adventurer"]
    );
    let explorer = &data(&top, "tours")[1];
    assert_eq!(explorer["ratingsQuantity"], 2);
    assert_eq!(explorer["ratingsAverage"], 4.5);

    let token = app.token_for("admin@tourbook.io");
    let users = app.send(Method::GET, "/api/v1/users", Some(&token), None).await;
    assert_eq!(users.status, StatusCode::OK);
    assert_eq!(users.body["results"], 5);
}
