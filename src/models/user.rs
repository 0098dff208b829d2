//! # User Model
//!
//! Passwords are validated in plaintext and hashed by the [`HashPassword`]
//! decorator right before the write. A stored password that is already a hash
//! is left alone, which is how the validator and the decorator tell a password
//! change from any other update.

use std::sync::OnceLock;

use chrono::{Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::is_present;
use crate::auth::crypto::{hash_password, is_password_hash};
use crate::store::schema::{format_date, parse_date};
use crate::store::{
    Collection, CollectionSchema, Decorator, ExcludeInactive, FieldDef, StoreError, StoreResult, WriteKind,
};

pub const COLLECTION: &str = "users";

pub const PASSWORD_MIN_LEN: usize = 8;

/// Fields a user may change through `updateMe`
pub const SELF_EDITABLE: [&str; 2] = ["name", "email"];

/// Access roles, lowest to highest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    #[default]
    User,
    Guide,
    LeadGuide,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::User, Role::Guide, Role::LeadGuide, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Guide => "guide",
            Role::LeadGuide => "lead-guide",
            Role::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.as_str() == raw)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed view of a stored user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub role: Role,
    /// Only present when read with `+password`
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_changed_at: Option<String>,
}

impl User {
    pub fn from_document(doc: Value) -> StoreResult<Self> {
        serde_json::from_value(doc).map_err(|e| StoreError::decode(COLLECTION, e))
    }

    /// Whether the password changed after a token issued at `issued_at`
    /// (Unix seconds)
    pub fn changed_password_after(&self, issued_at: i64) -> bool {
        self.password_changed_at
            .as_deref()
            .and_then(parse_date)
            .is_some_and(|changed| issued_at < changed.timestamp())
    }

    pub fn has_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}

pub fn schema() -> CollectionSchema {
    CollectionSchema::new(COLLECTION)
        .field("name", FieldDef::text().trim())
        .field("email", FieldDef::text().trim().lowercase())
        .field("photo", FieldDef::text())
        .field("role", FieldDef::text().default_value(Role::User.as_str()))
        .field("password", FieldDef::text().hidden())
        .field("passwordConfirm", FieldDef::text().hidden())
        .field("passwordChangedAt", FieldDef::date())
        .field("passwordResetToken", FieldDef::text().hidden())
        .field("passwordResetExpiresAt", FieldDef::date().hidden())
        .field("active", FieldDef::boolean().default_value(true).hidden())
        .unique(["email"])
        .validator(validate)
}

/// The users collection with its decorators attached
pub fn collection() -> Collection {
    Collection::new(schema())
        .decorate(ExcludeInactive)
        .decorate(HashPassword)
}

static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();

pub fn is_valid_email(raw: &str) -> bool {
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(raw))
}

/// Validation rules for a user document
pub fn validate(doc: &Map<String, Value>) -> Vec<String> {
    let mut errors = Vec::new();

    if !is_present(doc, "name") {
        errors.push("A user must have a name".to_string());
    }

    match doc.get("email").and_then(Value::as_str) {
        None => errors.push("A user must have an email".to_string()),
        Some(email) if !is_valid_email(email) => {
            errors.push("Please provide a valid email".to_string())
        }
        Some(_) => {}
    }

    if let Some(role) = doc.get("role").and_then(Value::as_str) {
        if Role::parse(role).is_none() {
            errors.push("Role is either: user, guide, lead-guide, admin".to_string());
        }
    }

    match doc.get("password").and_then(Value::as_str) {
        None => errors.push("A user must have a password".to_string()),
        Some(hash) if is_password_hash(hash) => {}
        Some(password) => {
            if password.chars().count() < PASSWORD_MIN_LEN {
                errors.push(format!(
                    "A password must have at least {PASSWORD_MIN_LEN} characters"
                ));
            }
            match doc.get("passwordConfirm").and_then(Value::as_str) {
                None => errors.push("Please confirm your password".to_string()),
                Some(confirm) if confirm != password => {
                    errors.push("Passwords are not the same!".to_string())
                }
                Some(_) => {}
            }
        }
    }

    errors
}

/// Hashes a plaintext password before it is stored and never stores the
/// confirmation. A password set by an update also stamps `passwordChangedAt`
/// one second in the past, so a token signed right after the change stays
/// valid.
pub struct HashPassword;

impl Decorator for HashPassword {
    fn name(&self) -> &'static str {
        "hash-password"
    }

    fn before_save(&self, doc: &mut Map<String, Value>, kind: WriteKind) -> StoreResult<()> {
        doc.remove("passwordConfirm");

        let Some(plain) = doc
            .get("password")
            .and_then(Value::as_str)
            .filter(|p| !is_password_hash(p))
            .map(str::to_string)
        else {
            return Ok(());
        };

        let hash = hash_password(&plain).map_err(|e| StoreError::Hook {
            decorator: self.name(),
            message: e.to_string(),
        })?;
        doc.insert("password".to_string(), Value::String(hash));

        if kind == WriteKind::Update {
            let changed_at = Utc::now() - Duration::seconds(1);
            doc.insert(
                "passwordChangedAt".to_string(),
                Value::String(format_date(changed_at)),
            );
        }
        Ok(())
    }
}

/// Keep only the keys in `allowed`
pub fn filter_fields(body: &Map<String, Value>, allowed: &[&str]) -> Map<String, Value> {
    body.iter()
        .filter(|(key, _)| allowed.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
