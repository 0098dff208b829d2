//! # Document Store
//!
//! In-memory collections of JSON documents with schema casting, unique
//! indexes and per-collection decorators. Each collection sits behind its own
//! read/write lock, so the store is `Send + Sync` and shared by reference.

pub mod collection;
pub mod decorators;
pub mod document_query;
pub mod document_store;
pub mod errors;
pub mod matcher;
pub mod projector;
pub mod schema;
pub mod sorter;

pub use collection::{Collection, Validation};
pub use decorators::{Decorator, DurationWeeks, ExcludeInactive, PopulateUser, Slugify, WriteKind};
pub use document_query::DocumentQuery;
pub use document_store::DocumentStore;
pub use errors::{StoreError, StoreResult};
pub use schema::{CollectionSchema, FieldDef, FieldKind, ID_FIELD, VERSION_FIELD};
