//! # Response Formatting
//!
//! The `{status: "success", results?, token?, message?, data?}` envelope
//! every successful response uses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};

/// Success envelope
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    #[serde(skip)]
    code: StatusCode,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl ApiResponse {
    /// 200 with `data: {key: value}`
    pub fn ok(key: &str, value: impl Serialize) -> Self {
        Self::empty().data(key, value)
    }

    /// 201 with `data: {key: value}`
    pub fn created(key: &str, value: impl Serialize) -> Self {
        Self::ok(key, value).with_code(StatusCode::CREATED)
    }

    /// 200 with `data: {key: [...]}` and `results`
    pub fn list(key: &str, values: Vec<Value>) -> Self {
        let results = values.len();
        let mut response = Self::ok(key, values);
        response.results = Some(results);
        response
    }

    /// 200 with only `status`
    pub fn empty() -> Self {
        Self {
            code: StatusCode::OK,
            status: "success",
            results: None,
            token: None,
            message: None,
            data: None,
        }
    }

    /// Add `key` to `data`
    pub fn data(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        let mut data = match self.data.take() {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        data.insert(key.to_string(), value);
        self.data = Some(Value::Object(data));
        self
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_code(mut self, code: StatusCode) -> Self {
        self.code = code;
        self
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.code, Json(self)).into_response()
    }
}

/// 204 with no body
pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
