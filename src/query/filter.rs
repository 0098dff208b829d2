//! # Filter Predicate
//!
//! A filter is kept in the document store's native form: a map from field
//! name to either a literal (equality) or an operator object such as
//! `{"$gte": "500"}`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::params::{ParamValue, RequestParams};

/// Request parameter keys consumed by the shaper itself
pub const RESERVED_KEYS: [&str; 5] = ["page", "sort", "limit", "field", "fields"];

/// Comparison operators accepted in bracket syntax (`price[gte]=500`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Gte,
    Gt,
    Lte,
    Lt,
}

impl CmpOp {
    /// Recognize a bare operator token
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "gte" => Some(CmpOp::Gte),
            "gt" => Some(CmpOp::Gt),
            "lte" => Some(CmpOp::Lte),
            "lt" => Some(CmpOp::Lt),
            _ => None,
        }
    }

    /// The store-native operator key
    pub fn native(&self) -> &'static str {
        match self {
            CmpOp::Gte => "$gte",
            CmpOp::Gt => "$gt",
            CmpOp::Lte => "$lte",
            CmpOp::Lt => "$lt",
        }
    }
}

/// A filter predicate in native form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(Map<String, Value>);

impl Filter {
    /// The empty filter (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Equality filter on one field
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().with(field, value)
    }

    /// Add or replace the condition for a field
    pub fn with(mut self, field: impl Into<String>, condition: impl Into<Value>) -> Self {
        self.0.insert(field.into(), condition.into());
        self
    }

    /// Combine two filters. Conditions in `other` replace conditions on the
    /// same field, so merging a re-derived filter is idempotent.
    pub fn merge(mut self, other: Filter) -> Self {
        for (field, condition) in other.0 {
            self.0.insert(field, condition);
        }
        self
    }

    /// Build the filter for a parameter map: drop reserved keys and rewrite
    /// bare comparison tokens into native operators.
    pub fn from_params(params: &RequestParams) -> Self {
        let mut map = Map::new();

        for (key, value) in params.iter() {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            map.insert(key.clone(), condition_from_param(value));
        }

        Self(map)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Filter {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Translate one parameter value into a native condition.
///
/// Operands are kept as strings; casting to the field's type happens in the
/// store, which also reports non-numeric operands.
fn condition_from_param(value: &ParamValue) -> Value {
    match value {
        ParamValue::Single(s) => Value::String(s.clone()),
        ParamValue::Many(values) => {
            let items = values.iter().cloned().map(Value::String).collect();
            let mut op = Map::new();
            op.insert("$in".to_string(), Value::Array(items));
            Value::Object(op)
        }
        ParamValue::Nested(map) => {
            let mut out = Map::new();
            for (token, inner) in map {
                let key = match CmpOp::from_token(token) {
                    Some(op) => op.native().to_string(),
                    None => token.clone(),
                };
                out.insert(key, condition_from_param(inner));
            }
            Value::Object(out)
        }
    }
}
