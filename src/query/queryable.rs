//! # Queryable Collections
//!
//! The contract the shaping layer needs from the persistence layer, plus the
//! plain query descriptor every store-backed query carries.

use std::future::Future;

use super::filter::Filter;
use super::projection::Projection;
use super::sort::SortSpec;

/// A not-yet-executed query. Every builder step consumes the query and
/// returns the configured one, so no two requests share a handle.
pub trait Queryable: Sized {
    /// Narrow the query with a filter predicate
    fn find(self, filter: Filter) -> Self;

    /// Order the results
    fn sort(self, spec: SortSpec) -> Self;

    /// Choose the fields of each result document
    fn select(self, projection: Projection) -> Self;

    /// Skip the first `n` matches
    fn skip(self, n: u64) -> Self;

    /// Return at most `n` matches
    fn limit(self, n: u64) -> Self;
}

/// A query that can be run against its data source
pub trait Executable {
    type Document;
    type Error;

    /// Run the query. This is the only point that touches the data source.
    fn execute(self) -> impl Future<Output = Result<Vec<Self::Document>, Self::Error>> + Send;
}

/// Everything a query has been told, as a plain value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    pub filter: Filter,
    pub sort: Option<SortSpec>,
    pub projection: Option<Projection>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Queryable for QuerySpec {
    fn find(mut self, filter: Filter) -> Self {
        self.filter = std::mem::take(&mut self.filter).merge(filter);
        self
    }

    fn sort(mut self, spec: SortSpec) -> Self {
        self.sort = Some(spec);
        self
    }

    fn select(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    fn skip(mut self, n: u64) -> Self {
        self.skip = Some(n);
        self
    }

    fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_find_merges_conditions() {
        let spec = QuerySpec::new()
            .find(Filter::eq("active", json!({"$ne": false})))
            .find(Filter::eq("role", "guide"));

        assert_eq!(
            spec.filter.into_value(),
            json!({"active": {"$ne": false}, "role": "guide"})
        );
    }

    #[test]
    fn test_later_steps_replace() {
        let spec = QuerySpec::new().skip(10).limit(5).skip(0);
        assert_eq!(spec.skip, Some(0));
        assert_eq!(spec.limit, Some(5));
    }
}
