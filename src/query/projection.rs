//! # Projection Specification
//!
//! Which fields a result document carries. Tokens follow the store's select
//! syntax: `name` includes, `-name` excludes, `+name` adds a field the
//! collection hides by default.

use std::fmt;

use serde_json::{Map, Value};

/// Fields hidden from list results when the request names no projection
pub const DEFAULT_EXCLUDED: [&str; 2] = ["__v", "createdAt"];

/// How a single field is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMode {
    Include,
    Exclude,
    /// Opt a hidden field back in without switching to inclusive mode
    Reveal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedField {
    pub name: String,
    pub mode: FieldMode,
}

/// A projection specification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<ProjectedField>,
}

impl Projection {
    /// Parse a comma (or space) separated field list
    pub fn parse(raw: &str) -> Self {
        let fields = raw
            .split([',', ' '])
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .filter_map(|token| {
                let (mode, name) = if let Some(name) = token.strip_prefix('-') {
                    (FieldMode::Exclude, name)
                } else if let Some(name) = token.strip_prefix('+') {
                    (FieldMode::Reveal, name)
                } else {
                    (FieldMode::Include, token)
                };
                (!name.is_empty()).then(|| ProjectedField {
                    name: name.to_string(),
                    mode,
                })
            })
            .collect();

        Self { fields }
    }

    /// Exactly these fields
    pub fn include<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_mode(names, FieldMode::Include)
    }

    /// Everything except these fields
    pub fn exclude<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_mode(names, FieldMode::Exclude)
    }

    /// The projection applied when a request names none
    pub fn default_hidden() -> Self {
        Self::exclude(DEFAULT_EXCLUDED)
    }

    fn with_mode<I, S>(names: I, mode: FieldMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: names
                .into_iter()
                .map(|name| ProjectedField {
                    name: name.into(),
                    mode,
                })
                .collect(),
        }
    }

    pub fn fields(&self) -> &[ProjectedField] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Names carrying the given mode
    pub fn names(&self, mode: FieldMode) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(move |f| f.mode == mode)
            .map(|f| f.name.as_str())
    }

    /// Inclusive projections list the fields to keep
    pub fn is_inclusive(&self) -> bool {
        self.names(FieldMode::Include).next().is_some()
    }

    /// Mixing inclusion with exclusion is only allowed for `_id`
    pub fn is_mixed(&self) -> bool {
        self.is_inclusive() && self.names(FieldMode::Exclude).any(|name| name != "_id")
    }

    /// Native `{field: 1|0}` form. Reveal tokens have no native counterpart.
    pub fn to_native(&self) -> Value {
        let mut map = Map::new();
        for field in &self.fields {
            match field.mode {
                FieldMode::Include => {
                    map.insert(field.name.clone(), Value::from(1));
                }
                FieldMode::Exclude => {
                    map.insert(field.name.clone(), Value::from(0));
                }
                FieldMode::Reveal => {}
            }
        }
        Value::Object(map)
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match field.mode {
                FieldMode::Include => {}
                FieldMode::Exclude => f.write_str("-")?,
                FieldMode::Reveal => f.write_str("+")?,
            }
            f.write_str(&field.name)?;
        }
        Ok(())
    }
}
