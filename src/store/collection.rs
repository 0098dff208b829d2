//! # Collection
//!
//! One named set of JSON documents behind a read/write lock, together with
//! its schema and decorators.
//!
//! ## Read path
//! scope (decorators) → compile filter → match → sort → skip/limit →
//! project → `after_load` (decorators)
//!
//! ## Write path
//! cast → defaults → validate → `before_save` (decorators) → unique check →
//! store
//!
//! Locks are never held while decorators run, so a decorator may read other
//! collections.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{Map, Value};
use uuid::Uuid;

use super::decorators::{Decorator, WriteKind};
use super::document_query::DocumentQuery;
use super::errors::{StoreError, StoreResult};
use super::matcher::CompiledFilter;
use super::projector::Projector;
use super::schema::{CollectionSchema, ID_FIELD, VERSION_FIELD};
use super::sorter::ResultSorter;
use crate::query::{Filter, Projection, QuerySpec, Queryable};

/// Whether schema validators run on a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Run,
    /// Imports of trusted data
    Skip,
}

/// A document collection
pub struct Collection {
    schema: CollectionSchema,
    documents: RwLock<Vec<Value>>,
    decorators: Vec<Arc<dyn Decorator>>,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.schema.name())
            .field("decorators", &self.decorators.iter().map(|d| d.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl Collection {
    pub fn new(schema: CollectionSchema) -> Self {
        Self {
            schema,
            documents: RwLock::new(Vec::new()),
            decorators: Vec::new(),
        }
    }

    /// Attach a decorator. Decorators run in attachment order.
    pub fn decorate(mut self, decorator: impl Decorator + 'static) -> Self {
        self.decorators.push(Arc::new(decorator));
        self
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Vec<Value>>> {
        self.documents
            .read()
            .map_err(|_| StoreError::Poisoned(self.name().to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Vec<Value>>> {
        self.documents
            .write()
            .map_err(|_| StoreError::Poisoned(self.name().to_string()))
    }

    // ==================
    // Reads
    // ==================

    /// A query over the whole collection. Nothing runs until it is executed.
    pub fn query(self: &Arc<Self>) -> DocumentQuery {
        DocumentQuery::new(Arc::clone(self))
    }

    /// A query narrowed by `filter`
    pub fn find(self: &Arc<Self>, filter: Filter) -> DocumentQuery {
        self.query().find(filter)
    }

    /// Run a query descriptor against this collection
    pub fn run(&self, spec: &QuerySpec) -> StoreResult<Vec<Value>> {
        let compiled = self.compile_scoped(spec.filter.clone())?;
        let projector = Projector::new(&self.schema, spec.projection.as_ref())?;

        let mut matched: Vec<Value> = {
            let documents = self.read()?;
            documents
                .iter()
                .filter(|doc| compiled.matches(doc))
                .cloned()
                .collect()
        };

        if let Some(sort) = &spec.sort {
            ResultSorter::sort(&mut matched, sort);
        }

        let skip = spec.skip.map_or(0, to_usize);
        let limit = match spec.limit {
            Some(0) | None => usize::MAX,
            Some(n) => to_usize(n),
        };

        matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| self.present(projector.apply(doc)))
            .collect()
    }

    /// First document matching `filter`
    pub fn find_one(&self, filter: Filter, projection: Option<&Projection>) -> StoreResult<Option<Value>> {
        let mut spec = QuerySpec::new().find(filter).limit(1);
        if let Some(projection) = projection {
            spec = spec.select(projection.clone());
        }
        Ok(self.run(&spec)?.into_iter().next())
    }

    pub fn find_by_id(&self, id: &str) -> StoreResult<Option<Value>> {
        self.find_by_id_with(id, None)
    }

    /// Lookup by `_id`. A malformed id is a cast error, not a miss.
    pub fn find_by_id_with(&self, id: &str, projection: Option<&Projection>) -> StoreResult<Option<Value>> {
        self.find_one(Filter::eq(ID_FIELD, id), projection)
    }

    /// Number of documents a find with `filter` would match
    pub fn count_documents(&self, filter: &Filter) -> StoreResult<u64> {
        let compiled = self.compile_scoped(filter.clone())?;
        let documents = self.read()?;
        Ok(documents.iter().filter(|doc| compiled.matches(doc)).count() as u64)
    }

    /// Every stored document as written, without scope, projection or
    /// decorators
    pub fn all_raw(&self) -> StoreResult<Vec<Value>> {
        Ok(self.read()?.clone())
    }

    fn compile_scoped(&self, filter: Filter) -> StoreResult<CompiledFilter> {
        let filter = self
            .decorators
            .iter()
            .fold(filter, |filter, decorator| decorator.scope(filter));
        CompiledFilter::compile(&filter, &self.schema)
    }

    /// Outgoing form of a stored document
    fn present(&self, document: Value) -> StoreResult<Value> {
        let Value::Object(mut map) = document else {
            return Ok(document);
        };
        for decorator in &self.decorators {
            decorator.after_load(&mut map)?;
        }
        Ok(Value::Object(map))
    }

    fn present_stored(&self, stored: Map<String, Value>) -> StoreResult<Value> {
        let projector = Projector::new(&self.schema, None)?;
        self.present(projector.apply(Value::Object(stored)))
    }

    // ==================
    // Writes
    // ==================

    /// Insert a new document and return its outgoing form
    pub fn insert(&self, document: Value, validation: Validation) -> StoreResult<Value> {
        let mut doc = self.schema.cast_document(into_object(document)?)?;

        doc.entry(ID_FIELD)
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        doc.entry(VERSION_FIELD).or_insert_with(|| Value::from(0));
        self.schema.apply_defaults(&mut doc);
        self.prepare(&mut doc, validation, WriteKind::Insert)?;

        {
            let mut documents = self.write()?;
            if documents.iter().any(|d| d.get(ID_FIELD) == doc.get(ID_FIELD)) {
                return Err(StoreError::Duplicate {
                    value: render_values(&doc, &[ID_FIELD.to_string()]),
                });
            }
            self.check_unique(&documents, &doc, None)?;
            documents.push(Value::Object(doc.clone()));
        }

        self.present_stored(doc)
    }

    /// Apply `patch` to the document with `id`. Only fields named in the patch
    /// change; `_id` and `__v` are kept.
    pub fn update_by_id(&self, id: &str, patch: Value, validation: Validation) -> StoreResult<Option<Value>> {
        let mut patch = into_object(patch)?;
        patch.remove(ID_FIELD);
        patch.remove(VERSION_FIELD);
        let patch = self.schema.cast_document(patch)?;

        self.write_existing(id, validation, move |current| {
            let mut merged = current;
            merged.extend(patch);
            merged
        })
    }

    /// Replace the document with `id` wholesale, keeping `_id` and `__v`
    pub fn replace_by_id(&self, id: &str, document: Value, validation: Validation) -> StoreResult<Option<Value>> {
        let mut replacement = into_object(document)?;
        replacement.remove(ID_FIELD);
        replacement.remove(VERSION_FIELD);
        let mut replacement = self.schema.cast_document(replacement)?;
        self.schema.apply_defaults(&mut replacement);

        self.write_existing(id, validation, move |current| {
            let mut next = replacement;
            for reserved in [ID_FIELD, VERSION_FIELD] {
                if let Some(value) = current.get(reserved) {
                    next.insert(reserved.to_string(), value.clone());
                }
            }
            next
        })
    }

    fn write_existing<F>(&self, id: &str, validation: Validation, change: F) -> StoreResult<Option<Value>>
    where
        F: FnOnce(Map<String, Value>) -> Map<String, Value>,
    {
        let compiled = self.compile_scoped(Filter::eq(ID_FIELD, id))?;

        let stored = {
            let mut documents = self.write()?;
            let Some(position) = documents.iter().position(|doc| compiled.matches(doc)) else {
                return Ok(None);
            };

            let current = documents[position].as_object().cloned().unwrap_or_default();
            let mut next = change(current);
            self.prepare(&mut next, validation, WriteKind::Update)?;
            self.check_unique(&documents, &next, Some(position))?;

            documents[position] = Value::Object(next.clone());
            next
        };

        self.present_stored(stored).map(Some)
    }

    /// Remove the document with `id`, returning it as stored
    pub fn delete_by_id(&self, id: &str) -> StoreResult<Option<Value>> {
        let compiled = self.compile_scoped(Filter::eq(ID_FIELD, id))?;
        let mut documents = self.write()?;
        Ok(documents
            .iter()
            .position(|doc| compiled.matches(doc))
            .map(|position| documents.remove(position)))
    }

    /// Remove every document matching `filter`; decorator scopes do not apply
    pub fn delete_many(&self, filter: &Filter) -> StoreResult<u64> {
        let compiled = CompiledFilter::compile(filter, &self.schema)?;
        let mut documents = self.write()?;
        let before = documents.len();
        documents.retain(|doc| !compiled.matches(doc));
        Ok((before - documents.len()) as u64)
    }

    fn prepare(&self, doc: &mut Map<String, Value>, validation: Validation, kind: WriteKind) -> StoreResult<()> {
        if validation == Validation::Run {
            self.schema.validate(doc)?;
        }
        for decorator in &self.decorators {
            decorator.before_save(doc, kind)?;
        }
        Ok(())
    }

    fn check_unique(&self, documents: &[Value], candidate: &Map<String, Value>, skip: Option<usize>) -> StoreResult<()> {
        for index in self.schema.unique_indexes() {
            let complete = index
                .iter()
                .all(|field| candidate.get(field).is_some_and(|v| !v.is_null()));
            if !complete {
                continue;
            }

            let clash = documents.iter().enumerate().any(|(position, existing)| {
                Some(position) != skip
                    && index.iter().all(|field| existing.get(field) == candidate.get(field))
            });
            if clash {
                return Err(StoreError::Duplicate {
                    value: render_values(candidate, index),
                });
            }
        }
        Ok(())
    }
}

fn into_object(document: Value) -> StoreResult<Map<String, Value>> {
    match document {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::Validation {
            messages: vec!["Document must be a JSON object".to_string()],
        }),
    }
}

fn render_values(doc: &Map<String, Value>, fields: &[String]) -> String {
    fields
        .iter()
        .filter_map(|field| doc.get(field))
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}
