//! # Collection Handlers
//!
//! The CRUD operations every resource route is built from. Each takes the
//! collection it works on, so tours, users and reviews share one
//! implementation.

use std::sync::Arc;

use serde_json::Value;

use super::errors::{AppError, AppResult};
use crate::query::{Executable, Filter, QueryShaper, Queryable, RequestParams};
use crate::store::{Collection, Validation};

/// Shaped list of the documents matching `base` and the request parameters.
///
/// `base` is applied after the request filter, so a parameter naming the
/// same field cannot replace it. When the request names a `page`, a page
/// starting past the matching documents is reported as not found.
pub async fn list(collection: &Arc<Collection>, base: Filter, params: &RequestParams) -> AppResult<Vec<Value>> {
    let shaper = QueryShaper::new(collection.query(), params).shape()?;
    let window = shaper.window();
    let query = shaper.into_query().find(base);

    if params.get_str("page").is_some() {
        if let Some(window) = window {
            window.ensure_exists(query.count()?)?;
        }
    }

    Ok(query.execute().await?)
}

/// A single document
pub fn get_one(collection: &Collection, id: &str, resource: &'static str) -> AppResult<Value> {
    collection
        .find_by_id(id)?
        .ok_or(AppError::NotFound(resource))
}

/// Insert a validated document
pub fn create_one(collection: &Collection, document: Value) -> AppResult<Value> {
    Ok(collection.insert(document, Validation::Run)?)
}

/// Patch a document, validating the result
pub fn update_one(collection: &Collection, id: &str, patch: Value, resource: &'static str) -> AppResult<Value> {
    collection
        .update_by_id(id, patch, Validation::Run)?
        .ok_or(AppError::NotFound(resource))
}

/// Remove a document, returning it as stored
pub fn delete_one(collection: &Collection, id: &str, resource: &'static str) -> AppResult<Value> {
    collection.delete_by_id(id)?.ok_or(AppError::NotFound(resource))
}
