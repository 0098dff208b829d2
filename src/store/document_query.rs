//! A not-yet-executed query against one collection

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use super::collection::Collection;
use super::errors::{StoreError, StoreResult};
use crate::query::{Executable, Filter, Projection, QuerySpec, Queryable, SortSpec};

/// Query handle: a collection plus the descriptor built so far
#[derive(Debug, Clone)]
pub struct DocumentQuery {
    collection: Arc<Collection>,
    spec: QuerySpec,
}

impl DocumentQuery {
    pub fn new(collection: Arc<Collection>) -> Self {
        Self {
            collection,
            spec: QuerySpec::new(),
        }
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn collection(&self) -> &Arc<Collection> {
        &self.collection
    }

    /// Number of documents matching the filter, ignoring skip and limit
    pub fn count(&self) -> StoreResult<u64> {
        self.collection.count_documents(&self.spec.filter)
    }
}

impl Queryable for DocumentQuery {
    fn find(mut self, filter: Filter) -> Self {
        self.spec = self.spec.find(filter);
        self
    }

    fn sort(mut self, spec: SortSpec) -> Self {
        self.spec = self.spec.sort(spec);
        self
    }

    fn select(mut self, projection: Projection) -> Self {
        self.spec = self.spec.select(projection);
        self
    }

    fn skip(mut self, n: u64) -> Self {
        self.spec = self.spec.skip(n);
        self
    }

    fn limit(mut self, n: u64) -> Self {
        self.spec = self.spec.limit(n);
        self
    }
}

impl Executable for DocumentQuery {
    type Document = Value;
    type Error = StoreError;

    fn execute(self) -> impl Future<Output = Result<Vec<Value>, StoreError>> + Send {
        async move { self.collection.run(&self.spec) }
    }
}
