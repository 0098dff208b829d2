//! # Collection Schema
//!
//! Field declarations for a collection. A schema casts incoming values to
//! their declared kind, fills defaults, hides sensitive fields from reads and
//! names the unique indexes the collection enforces.
//!
//! Dates are stored as RFC 3339 strings with millisecond precision in UTC, so
//! string order is time order.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};

/// Document primary key field
pub const ID_FIELD: &str = "_id";

/// Document revision field
pub const VERSION_FIELD: &str = "__v";

/// Value kinds a field can be declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Number,
    Text,
    Boolean,
    Date,
    /// Reference to another document's `_id`
    Id,
}

impl FieldKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Number => "number",
            FieldKind::Text => "text",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::Id => "id",
        }
    }
}

/// Value filled in when a new document omits the field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    Value(Value),
    /// The insert time
    Now,
}

/// Field definition
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub kind: FieldKind,
    /// Field holds an array of `kind`
    pub list: bool,
    pub default: Option<FieldDefault>,
    /// Left out of reads unless projected with `+field`
    pub hidden: bool,
    pub trim: bool,
    pub lowercase: bool,
}

impl FieldDef {
    fn of(kind: FieldKind) -> Self {
        Self {
            kind,
            list: false,
            default: None,
            hidden: false,
            trim: false,
            lowercase: false,
        }
    }

    pub fn number() -> Self {
        Self::of(FieldKind::Number)
    }

    pub fn text() -> Self {
        Self::of(FieldKind::Text)
    }

    pub fn boolean() -> Self {
        Self::of(FieldKind::Boolean)
    }

    pub fn date() -> Self {
        Self::of(FieldKind::Date)
    }

    pub fn id() -> Self {
        Self::of(FieldKind::Id)
    }

    pub fn list(mut self) -> Self {
        self.list = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(FieldDefault::Value(value.into()));
        self
    }

    pub fn default_now(mut self) -> Self {
        self.default = Some(FieldDefault::Now);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    pub fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }
}

/// Document-level validator: returns one message per violated rule
pub type Validator = fn(&Map<String, Value>) -> Vec<String>;

/// Schema of one collection
#[derive(Debug, Clone)]
pub struct CollectionSchema {
    name: String,
    fields: BTreeMap<String, FieldDef>,
    unique: Vec<Vec<String>>,
    validator: Option<Validator>,
}

impl CollectionSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
            unique: Vec::new(),
            validator: None,
        }
    }

    /// Declare a field
    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    /// Declare a unique index over one or more fields
    pub fn unique<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique.push(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of a field. `_id` and `__v` are implicit on every collection.
    pub fn kind_of(&self, path: &str) -> Option<FieldKind> {
        match path {
            ID_FIELD => Some(FieldKind::Id),
            VERSION_FIELD => Some(FieldKind::Number),
            _ => self.fields.get(path).map(|def| def.kind),
        }
    }

    pub fn field_def(&self, path: &str) -> Option<&FieldDef> {
        self.fields.get(path)
    }

    pub fn is_hidden(&self, path: &str) -> bool {
        self.fields.get(path).is_some_and(|def| def.hidden)
    }

    pub fn hidden_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, def)| def.hidden)
            .map(|(name, _)| name.as_str())
    }

    pub fn unique_indexes(&self) -> &[Vec<String>] {
        &self.unique
    }

    /// Cast a single operand for `path`. Fields the schema does not declare
    /// keep the value as given.
    pub fn cast_value(&self, path: &str, value: &Value) -> StoreResult<Value> {
        match self.kind_of(path) {
            Some(kind) => cast_scalar(kind, path, value),
            None => Ok(value.clone()),
        }
    }

    /// Cast every declared field of an incoming document. Undeclared fields
    /// are dropped; `_id` and `__v` are kept when valid.
    pub fn cast_document(&self, mut doc: Map<String, Value>) -> StoreResult<Map<String, Value>> {
        let mut out = Map::new();

        for reserved in [ID_FIELD, VERSION_FIELD] {
            if let Some(value) = doc.remove(reserved) {
                if !value.is_null() {
                    out.insert(reserved.to_string(), self.cast_value(reserved, &value)?);
                }
            }
        }

        for (name, value) in doc {
            let Some(def) = self.fields.get(&name) else {
                continue;
            };
            let cast = cast_field(def, &name, &value)?;
            out.insert(name, cast);
        }

        Ok(out)
    }

    /// Fill in declared defaults for absent fields
    pub fn apply_defaults(&self, doc: &mut Map<String, Value>) {
        for (name, def) in &self.fields {
            if doc.contains_key(name) {
                continue;
            }
            match &def.default {
                Some(FieldDefault::Value(value)) => {
                    doc.insert(name.clone(), value.clone());
                }
                Some(FieldDefault::Now) => {
                    doc.insert(name.clone(), Value::String(format_date(Utc::now())));
                }
                None => {}
            }
        }
    }

    /// Run the document validator, if any
    pub fn validate(&self, doc: &Map<String, Value>) -> StoreResult<()> {
        let Some(validator) = self.validator else {
            return Ok(());
        };
        let messages = validator(doc);
        if messages.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Validation { messages })
        }
    }
}

fn cast_field(def: &FieldDef, path: &str, value: &Value) -> StoreResult<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    if def.list {
        let items = match value {
            Value::Array(items) => items.iter().collect::<Vec<_>>(),
            single => vec![single],
        };
        let cast = items
            .into_iter()
            .map(|item| cast_field_scalar(def, path, item))
            .collect::<StoreResult<Vec<_>>>()?;
        return Ok(Value::Array(cast));
    }

    cast_field_scalar(def, path, value)
}

fn cast_field_scalar(def: &FieldDef, path: &str, value: &Value) -> StoreResult<Value> {
    let mut cast = cast_scalar(def.kind, path, value)?;
    if let Value::String(s) = &mut cast {
        if def.trim {
            *s = s.trim().to_string();
        }
        if def.lowercase {
            *s = s.to_lowercase();
        }
    }
    Ok(cast)
}

/// Cast one value to `kind`
pub fn cast_scalar(kind: FieldKind, path: &str, value: &Value) -> StoreResult<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let cast = match (kind, value) {
        (FieldKind::Number, Value::Number(_)) => Some(value.clone()),
        (FieldKind::Number, Value::String(s)) => parse_number(s),

        (FieldKind::Text, Value::String(_)) => Some(value.clone()),
        (FieldKind::Text, Value::Number(n)) => Some(Value::String(n.to_string())),
        (FieldKind::Text, Value::Bool(b)) => Some(Value::String(b.to_string())),

        (FieldKind::Boolean, Value::Bool(_)) => Some(value.clone()),
        (FieldKind::Boolean, Value::String(s)) => match s.trim() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        (FieldKind::Boolean, Value::Number(n)) => match n.as_i64() {
            Some(1) => Some(Value::Bool(true)),
            Some(0) => Some(Value::Bool(false)),
            _ => None,
        },

        (FieldKind::Date, Value::String(s)) => parse_date(s).map(|d| Value::String(format_date(d))),
        (FieldKind::Date, Value::Number(n)) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .map(|d| Value::String(format_date(d))),

        (FieldKind::Id, Value::String(s)) if is_valid_id(s) => Some(value.clone()),

        _ => None,
    };

    cast.ok_or_else(|| StoreError::cast(path, value))
}

fn parse_number(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Value::from(i));
    }
    let f = trimmed.parse::<f64>().ok()?;
    Number::from_f64(f).map(Value::Number)
}

/// Parse the date formats clients and seed files use
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(raw) {
        return Some(d.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d,%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Canonical stored date form
pub fn format_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Document ids are UUIDs; 24-digit hex ids from imported data are accepted too
pub fn is_valid_id(raw: &str) -> bool {
    Uuid::parse_str(raw).is_ok() || (raw.len() == 24 && raw.chars().all(|c| c.is_ascii_hexdigit()))
}
