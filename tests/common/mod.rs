//! Shared fixtures for the HTTP integration tests
//!
//! Each test builds its own [`TestApp`]: a fresh store, a logging mail sender
//! and the full router, driven in-process with `oneshot`. Requests arrive from
//! [`TEST_PEER`] unless they carry their own `ConnectInfo`.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use tourbook::auth::{JwtConfig, LogEmailSender};
use tourbook::config::AppConfig;
use tourbook::models::Database;
use tourbook::rest_api::{build_router, AppState};
use tourbook::store::Validation;

pub const PASSWORD: &str = "test1234";

pub const TEST_PEER: &str = "127.0.0.1:40000";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub mail: Arc<LogEmailSender>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt: JwtConfig {
            secret: "integration-secret".to_string(),
            ..JwtConfig::default()
        },
        ..AppConfig::default()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let mail = Arc::new(LogEmailSender::new());
        let state = AppState::with_email_sender(&config, Database::open(), mail.clone()).unwrap();
        let router = build_router(&config, state.clone());
        Self { router, state, mail }
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send_request(request).await
    }

    pub async fn send_request(&self, mut request: Request<Body>) -> TestResponse {
        if request.extensions().get::<ConnectInfo<SocketAddr>>().is_none() {
            request
                .extensions_mut()
                .insert(ConnectInfo(TEST_PEER.parse::<SocketAddr>().unwrap()));
        }
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None, None).await
    }

    /// Insert a valid tour and return its id
    pub fn add_tour(&self, name: &str, price: u32, difficulty: &str) -> String {
        self.add_tour_with(name, price, difficulty, json!({}))
    }

    pub fn add_tour_with(&self, name: &str, price: u32, difficulty: &str, extra: Value) -> String {
        let mut doc = tour_doc(name, price, difficulty);
        if let (Some(doc), Value::Object(extra)) = (doc.as_object_mut(), extra) {
            doc.extend(extra);
        }
        let tour = self.db().tours.insert(doc, Validation::Run).unwrap();
        tour["_id"].as_str().unwrap().to_string()
    }

    /// Insert a user with `role` and password [`PASSWORD`], return its id
    pub fn add_user(&self, email: &str, role: &str) -> String {
        let user = self
            .db()
            .users
            .insert(
                json!({
                    "name": email.split('@').next().unwrap_or("user"),
                    "email": email,
                    "role": role,
                    "password": PASSWORD,
                    "passwordConfirm": PASSWORD,
                }),
                Validation::Run,
            )
            .unwrap();
        user["_id"].as_str().unwrap().to_string()
    }

    pub fn token_for(&self, email: &str) -> String {
        self.state.auth.login(Some(email), Some(PASSWORD)).unwrap()
    }

    /// Insert a user with `role` and log them in
    pub fn login_as(&self, email: &str, role: &str) -> (String, String) {
        let id = self.add_user(email, role);
        (id, self.token_for(email))
    }
}

/// A GET request arriving from `peer`
pub fn request_from(uri: &str, peer: &str) -> Request<Body> {
    let mut request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
    request
}

pub fn tour_doc(name: &str, price: u32, difficulty: &str) -> Value {
    json!({
        "name": name,
        "duration": 7,
        "maxGroupSize": 10,
        "difficulty": difficulty,
        "price": price,
        "summary": "A tour used by the integration tests",
        "imageCover": "cover.jpg",
    })
}

/// `data.<key>` of a success envelope
pub fn data<'a>(response: &'a TestResponse, key: &str) -> &'a Value {
    &response.body["data"][key]
}

pub fn names(list: &Value) -> Vec<String> {
    list.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
