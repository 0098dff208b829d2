//! Registry of named collections

use std::collections::BTreeMap;
use std::sync::Arc;

use super::collection::Collection;
use super::errors::{StoreError, StoreResult};

/// The shared document store. Cloning is cheap; collections are shared.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    collections: BTreeMap<String, Arc<Collection>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collection under its schema name and return the shared handle
    pub fn register(&mut self, collection: Collection) -> Arc<Collection> {
        let collection = Arc::new(collection);
        self.collections
            .insert(collection.name().to_string(), Arc::clone(&collection));
        collection
    }

    pub fn collection(&self, name: &str) -> StoreResult<Arc<Collection>> {
        self.collections
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Document counts per collection
    pub fn stats(&self) -> StoreResult<Vec<(String, usize)>> {
        self.collections
            .iter()
            .map(|(name, collection)| Ok((name.clone(), collection.all_raw()?.len())))
            .collect()
    }
}
