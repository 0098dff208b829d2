//! # Request Sanitization
//!
//! Request bodies and query strings are cleaned before any handler sees
//! them:
//!
//! - keys starting with `$` or containing `.` are dropped, so a client
//!   cannot smuggle operators into a filter or an update
//! - `<` and `>` in string values are HTML-escaped
//! - a repeated query key keeps its last value, unless the key is
//!   whitelisted for multi-value filtering

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::{async_trait, Json};
use serde_json::{Map, Value};

use super::errors::AppError;
use crate::query::{ParamValue, RequestParams};

/// Query keys that may repeat; every other repeated key keeps its last value
pub const MULTI_VALUE_KEYS: [&str; 6] = [
    "duration",
    "ratingsQuantity",
    "ratingsAverage",
    "maxGroupSize",
    "difficulty",
    "price",
];

fn is_unsafe_key(key: &str) -> bool {
    key.starts_with('$') || key.contains('.')
}

/// Escape the characters that open and close markup
pub fn escape_markup(raw: &str) -> String {
    if !raw.contains(|c: char| c == '<' || c == '>') {
        return raw.to_string();
    }
    raw.replace('<', "&lt;").replace('>', "&gt;")
}

/// Clean a JSON value recursively
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(sanitize_map(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::String(s) => Value::String(escape_markup(&s)),
        other => other,
    }
}

/// Clean a JSON object recursively
pub fn sanitize_map(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .filter(|(key, _)| !is_unsafe_key(key))
        .map(|(key, value)| (key, sanitize_value(value)))
        .collect()
}

fn sanitize_param(value: ParamValue) -> ParamValue {
    match value {
        ParamValue::Single(s) => ParamValue::Single(escape_markup(&s)),
        ParamValue::Many(values) => ParamValue::Many(values.iter().map(|v| escape_markup(v)).collect()),
        ParamValue::Nested(map) => ParamValue::Nested(
            map.into_iter()
                .filter(|(key, _)| !is_unsafe_key(key))
                .map(|(key, value)| (key, sanitize_param(value)))
                .collect(),
        ),
    }
}

/// Clean a parsed query and collapse repeated keys that are not whitelisted
pub fn sanitize_params(params: RequestParams) -> RequestParams {
    params.map_entries(|key, value| {
        if is_unsafe_key(&key) {
            return None;
        }
        let value = match value {
            ParamValue::Many(mut values) if !MULTI_VALUE_KEYS.contains(&key.as_str()) => {
                ParamValue::Single(values.pop().unwrap_or_default())
            }
            other => other,
        };
        Some((key, sanitize_param(value)))
    })
}

/// Sanitized query parameters of a list request
#[derive(Debug, Clone, Default)]
pub struct QueryParams(pub RequestParams);

#[async_trait]
impl<S> FromRequestParts<S> for QueryParams
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts.uri.query().unwrap_or_default();
        Ok(Self(sanitize_params(RequestParams::from_query(raw))))
    }
}

/// A sanitized JSON object body
#[derive(Debug, Clone, Default)]
pub struct JsonBody(pub Map<String, Value>);

impl JsonBody {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

#[async_trait]
impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(reject)?;

        match sanitize_value(value) {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(AppError::InvalidBody("expected a JSON object".to_string())),
        }
    }
}

fn reject(rejection: JsonRejection) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::InvalidBody(rejection.body_text())
    }
}
