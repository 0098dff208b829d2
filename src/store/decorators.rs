//! # Collection Decorators
//!
//! Per-collection hooks the store runs around reads and writes:
//!
//! | Decorator         | Collection | Hook          | Effect                                  |
//! |-------------------|------------|---------------|-----------------------------------------|
//! | [`ExcludeInactive`] | users    | `scope`       | every find skips `active: false`        |
//! | [`Slugify`]       | tours      | `before_save` | `slug` derived from `name`              |
//! | `HashPassword`    | users      | `before_save` | plaintext password hashed               |
//! | [`DurationWeeks`] | tours      | `after_load`  | virtual `durationWeeks = duration / 7`  |
//! | [`PopulateUser`]  | reviews    | `after_load`  | `user` id replaced by `{_id, name, photo}` |
//!
//! Decorators never see raw reads (`Collection::all_raw`), so aggregation and
//! rating recalculation work on stored values.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::{json, Map, Value};

use super::collection::Collection;
use super::errors::StoreResult;
use crate::query::{Filter, Projection};

/// Kind of write a `before_save` hook runs for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Insert,
    Update,
}

/// A hook set attached to one collection
pub trait Decorator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Narrow the filter of every find-family read
    fn scope(&self, filter: Filter) -> Filter {
        filter
    }

    /// Adjust a validated document right before it is written
    fn before_save(&self, _doc: &mut Map<String, Value>, _kind: WriteKind) -> StoreResult<()> {
        Ok(())
    }

    /// Adjust a document after projection, on its way to the caller
    fn after_load(&self, _doc: &mut Map<String, Value>) -> StoreResult<()> {
        Ok(())
    }
}

// ==================
// Users
// ==================

/// Soft-deleted users are invisible to every find
pub struct ExcludeInactive;

impl Decorator for ExcludeInactive {
    fn name(&self) -> &'static str {
        "exclude-inactive"
    }

    fn scope(&self, filter: Filter) -> Filter {
        filter.merge(Filter::eq("active", json!({"$ne": false})))
    }
}

// ==================
// Tours
// ==================

static NON_SLUG: OnceLock<Option<Regex>> = OnceLock::new();

/// Lowercase, with every run of non-alphanumerics collapsed to `-`
pub fn slugify(input: &str) -> String {
    let lower = input.trim().to_lowercase();
    match NON_SLUG.get_or_init(|| Regex::new(r"[^a-z0-9]+").ok()) {
        Some(re) => re.replace_all(&lower, "-").trim_matches('-').to_string(),
        None => lower,
    }
}

/// Keeps `slug` in step with `name`
pub struct Slugify;

impl Decorator for Slugify {
    fn name(&self) -> &'static str {
        "slugify"
    }

    fn before_save(&self, doc: &mut Map<String, Value>, _kind: WriteKind) -> StoreResult<()> {
        if let Some(name) = doc.get("name").and_then(Value::as_str) {
            let slug = slugify(name);
            doc.insert("slug".to_string(), Value::String(slug));
        }
        Ok(())
    }
}

/// Adds the `durationWeeks` virtual field
pub struct DurationWeeks;

impl Decorator for DurationWeeks {
    fn name(&self) -> &'static str {
        "duration-weeks"
    }

    fn after_load(&self, doc: &mut Map<String, Value>) -> StoreResult<()> {
        let weeks = doc
            .get("duration")
            .and_then(Value::as_f64)
            .and_then(|days| serde_json::Number::from_f64(days / 7.0));
        if let Some(weeks) = weeks {
            doc.insert("durationWeeks".to_string(), Value::Number(weeks));
        }
        Ok(())
    }
}

// ==================
// Reviews
// ==================

/// Fields of the author embedded in a review
pub const POPULATED_USER_FIELDS: &str = "name,photo";

/// Replaces a review's `user` id with a summary of the author
pub struct PopulateUser {
    users: Arc<Collection>,
    projection: Projection,
}

impl PopulateUser {
    pub fn new(users: Arc<Collection>) -> Self {
        Self {
            users,
            projection: Projection::parse(POPULATED_USER_FIELDS),
        }
    }
}

impl Decorator for PopulateUser {
    fn name(&self) -> &'static str {
        "populate-user"
    }

    fn after_load(&self, doc: &mut Map<String, Value>) -> StoreResult<()> {
        let Some(user_id) = doc.get("user").and_then(Value::as_str).map(str::to_string) else {
            return Ok(());
        };

        let author = self
            .users
            .find_by_id_with(&user_id, Some(&self.projection))?
            .unwrap_or(Value::Null);
        doc.insert("user".to_string(), author);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("The Forest Hiker"), "the-forest-hiker");
        assert_eq!(slugify("  The Sea  Explorer! "), "the-sea-explorer");
        assert_eq!(slugify("Wine & Dine 2"), "wine-dine-2");
    }

    #[test]
    fn test_exclude_inactive_scope() {
        let filter = ExcludeInactive.scope(Filter::eq("email", "a@b.io"));
        assert_eq!(
            filter.into_value(),
            json!({"email": "a@b.io", "active": {"$ne": false}})
        );
    }

    #[test]
    fn test_slugify_before_save() {
        let mut doc = Map::new();
        doc.insert("name".into(), json!("The Park Camper"));
        Slugify.before_save(&mut doc, WriteKind::Insert).unwrap();
        assert_eq!(doc["slug"], json!("the-park-camper"));
    }

    #[test]
    fn test_duration_weeks() {
        let mut doc = Map::new();
        doc.insert("duration".into(), json!(14));
        DurationWeeks.after_load(&mut doc).unwrap();
        assert_eq!(doc["durationWeeks"].as_f64(), Some(2.0));

        let mut without = Map::new();
        DurationWeeks.after_load(&mut without).unwrap();
        assert!(without.get("durationWeeks").is_none());
    }
}
