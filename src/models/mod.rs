//! # Domain Models
//!
//! Schemas, validators and typed views for tours, users and reviews, plus the
//! [`Database`] that wires the three collections into one store.

pub mod aggregate;
pub mod review;
pub mod tour;
pub mod user;

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::store::{Collection, DocumentStore, PopulateUser};

pub use review::RatingSummary;
pub use tour::Tour;
pub use user::{Role, User};

/// The application's collections
#[derive(Debug, Clone)]
pub struct Database {
    store: DocumentStore,
    pub tours: Arc<Collection>,
    pub users: Arc<Collection>,
    pub reviews: Arc<Collection>,
}

impl Database {
    /// Fresh, empty collections
    pub fn open() -> Self {
        let mut store = DocumentStore::new();
        let tours = store.register(tour::collection());
        let users = store.register(user::collection());
        let reviews = store.register(
            Collection::new(review::schema()).decorate(PopulateUser::new(Arc::clone(&users))),
        );

        Self {
            store,
            tours,
            users,
            reviews,
        }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::open()
    }
}

/// A required field counts as present when it is non-null and, for text,
/// non-blank
pub(crate) fn is_present(doc: &Map<String, Value>, field: &str) -> bool {
    match doc.get(field) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

/// Character count of a present text field
pub(crate) fn text_len(doc: &Map<String, Value>, field: &str) -> Option<usize> {
    is_present(doc, field)
        .then(|| doc.get(field).and_then(Value::as_str).map(|s| s.chars().count()))
        .flatten()
}
