//! Predicate matching for document queries
//!
//! A [`Filter`] is compiled against the collection schema once per query:
//! operands are cast to the field kind, operator keys are checked. Matching
//! then runs without further allocation.
//!
//! Array fields match when any element matches, except for `$ne` and `$nin`
//! which require that no element matches.

use std::cmp::Ordering;

use serde_json::Value;

use super::errors::{StoreError, StoreResult};
use super::schema::CollectionSchema;
use crate::query::Filter;

/// One comparison against a field
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
}

/// All conditions on one field (AND semantics)
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPredicate {
    pub field: String,
    pub conditions: Vec<Condition>,
}

impl FieldPredicate {
    pub fn matches(&self, document: &Value) -> bool {
        let actual = document.get(&self.field);
        self.conditions.iter().all(|c| condition_matches(c, actual))
    }
}

/// A compiled filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledFilter {
    predicates: Vec<FieldPredicate>,
}

impl CompiledFilter {
    /// Cast and check every condition of `filter`
    pub fn compile(filter: &Filter, schema: &CollectionSchema) -> StoreResult<Self> {
        let predicates = filter
            .iter()
            .map(|(field, condition)| compile_field(field, condition, schema))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Self { predicates })
    }

    /// Checks if a document matches all predicates
    pub fn matches(&self, document: &Value) -> bool {
        self.predicates.iter().all(|p| p.matches(document))
    }

    pub fn predicates(&self) -> &[FieldPredicate] {
        &self.predicates
    }
}

fn compile_field(field: &str, condition: &Value, schema: &CollectionSchema) -> StoreResult<FieldPredicate> {
    let cast = |value: &Value| schema.cast_value(field, value);

    let conditions = match condition {
        Value::Object(ops) if ops.keys().any(|k| k.starts_with('$')) => {
            let mut conditions = Vec::with_capacity(ops.len());
            for (op, operand) in ops {
                let compiled = match op.as_str() {
                    "$eq" => Condition::Eq(cast(operand)?),
                    "$ne" => Condition::Ne(cast(operand)?),
                    "$gt" => Condition::Gt(cast(operand)?),
                    "$gte" => Condition::Gte(cast(operand)?),
                    "$lt" => Condition::Lt(cast(operand)?),
                    "$lte" => Condition::Lte(cast(operand)?),
                    "$in" => Condition::In(cast_list(operand, &cast)?),
                    "$nin" => Condition::Nin(cast_list(operand, &cast)?),
                    other => {
                        return Err(StoreError::UnknownOperator {
                            operator: other.to_string(),
                        })
                    }
                };
                conditions.push(compiled);
            }
            conditions
        }
        literal => vec![Condition::Eq(cast(literal)?)],
    };

    Ok(FieldPredicate {
        field: field.to_string(),
        conditions,
    })
}

fn cast_list<F>(operand: &Value, cast: &F) -> StoreResult<Vec<Value>>
where
    F: Fn(&Value) -> StoreResult<Value>,
{
    match operand {
        Value::Array(items) => items.iter().map(cast).collect(),
        single => Ok(vec![cast(single)?]),
    }
}

fn condition_matches(condition: &Condition, actual: Option<&Value>) -> bool {
    match condition {
        Condition::Eq(expected) => any_element(actual, |v| values_equal(v, expected)),
        Condition::Ne(expected) => !any_element(actual, |v| values_equal(v, expected)),
        Condition::Gt(bound) => any_element(actual, |v| compare(v, bound) == Some(Ordering::Greater)),
        Condition::Gte(bound) => any_element(actual, |v| {
            matches!(compare(v, bound), Some(Ordering::Greater | Ordering::Equal))
        }),
        Condition::Lt(bound) => any_element(actual, |v| compare(v, bound) == Some(Ordering::Less)),
        Condition::Lte(bound) => any_element(actual, |v| {
            matches!(compare(v, bound), Some(Ordering::Less | Ordering::Equal))
        }),
        Condition::In(list) => any_element(actual, |v| list.iter().any(|e| values_equal(v, e))),
        Condition::Nin(list) => !any_element(actual, |v| list.iter().any(|e| values_equal(v, e))),
    }
}

/// Apply `pred` to the field value, or to each element of an array value.
/// A missing field behaves like `null`.
fn any_element<F>(actual: Option<&Value>, pred: F) -> bool
where
    F: Fn(&Value) -> bool,
{
    match actual {
        None => pred(&Value::Null),
        Some(whole @ Value::Array(items)) => pred(whole) || items.iter().any(&pred),
        Some(value) => pred(value),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Ordering between values of the same type; `None` across types
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
