//! Result sorting for query execution
//!
//! Multi-key, stable and deterministic: documents that compare equal on every
//! key keep their insertion order.

use std::cmp::Ordering;

use serde_json::Value;

use crate::query::{SortDirection, SortSpec};

/// Sorts result documents
pub struct ResultSorter;

impl ResultSorter {
    /// Sorts documents according to sort specification.
    pub fn sort(documents: &mut [Value], spec: &SortSpec) {
        if spec.is_empty() {
            return;
        }

        documents.sort_by(|a, b| {
            for key in spec.keys() {
                let ordering = Self::compare_values(a.get(&key.field), b.get(&key.field));
                let ordering = match key.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    /// Compares two JSON values for sorting.
    ///
    /// Ordering rules:
    /// - missing < null < bool < number < string < array < object
    /// - For same types, natural ordering
    pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a_val), Some(b_val)) => {
                let a_type = type_order(a_val);
                let b_type = type_order(b_val);

                if a_type != b_type {
                    return a_type.cmp(&b_type);
                }

                match (a_val, b_val) {
                    (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
                    (Value::Number(x), Value::Number(y)) => {
                        let x = x.as_f64().unwrap_or(0.0);
                        let y = y.as_f64().unwrap_or(0.0);
                        x.partial_cmp(&y).unwrap_or(Ordering::Equal)
                    }
                    (Value::String(x), Value::String(y)) => x.cmp(y),
                    // Arrays order by their first element
                    (Value::Array(x), Value::Array(y)) => Self::compare_values(x.first(), y.first()),
                    _ => Ordering::Equal,
                }
            }
        }
    }
}

fn type_order(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
