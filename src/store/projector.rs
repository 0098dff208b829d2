//! Field projection for query results
//!
//! Hidden schema fields are dropped from every read unless the projection
//! names them with `+field`. Naming a hidden field in an inclusive projection
//! is not enough.

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::errors::{StoreError, StoreResult};
use super::schema::{CollectionSchema, ID_FIELD};
use crate::query::{FieldMode, Projection};

/// Applies projections to result documents
pub struct Projector<'a> {
    schema: &'a CollectionSchema,
    projection: Option<&'a Projection>,
    revealed: HashSet<&'a str>,
}

impl<'a> Projector<'a> {
    /// Reject projections the store cannot apply
    pub fn new(schema: &'a CollectionSchema, projection: Option<&'a Projection>) -> StoreResult<Self> {
        if projection.is_some_and(Projection::is_mixed) {
            return Err(StoreError::MixedProjection);
        }

        let revealed = projection
            .map(|p| p.names(FieldMode::Reveal).collect())
            .unwrap_or_default();

        Ok(Self {
            schema,
            projection,
            revealed,
        })
    }

    pub fn apply(&self, document: Value) -> Value {
        let Value::Object(mut map) = document else {
            return document;
        };

        let mut out = match self.projection {
            Some(p) if p.is_inclusive() => {
                let mut out = Map::new();
                if !p.names(FieldMode::Exclude).any(|name| name == ID_FIELD) {
                    if let Some(id) = map.remove(ID_FIELD) {
                        out.insert(ID_FIELD.to_string(), id);
                    }
                }
                for name in p.names(FieldMode::Include).chain(p.names(FieldMode::Reveal)) {
                    if let Some(value) = map.remove(name) {
                        out.insert(name.to_string(), value);
                    }
                }
                out
            }
            Some(p) => {
                for name in p.names(FieldMode::Exclude) {
                    map.remove(name);
                }
                map
            }
            None => map,
        };

        for hidden in self.schema.hidden_fields() {
            if !self.revealed.contains(hidden) {
                out.remove(hidden);
            }
        }

        Value::Object(out)
    }
}
