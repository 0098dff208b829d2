//! # Sort Specification
//!
//! Multi-field ordering, written the way clients send it: `-price,name`
//! sorts by price descending, then name ascending.

use std::fmt;

/// Field used when a request does not ask for an order
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One (field, direction) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        match token.strip_prefix('-') {
            Some(field) if !field.trim().is_empty() => Some(Self::desc(field.trim())),
            Some(_) => None,
            None if !token.is_empty() => Some(Self::asc(token)),
            None => None,
        }
    }
}

/// Ordered list of sort keys; earlier keys take precedence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<SortKey>,
}

impl SortSpec {
    /// Parse a comma-separated field list. Empty tokens are skipped.
    pub fn parse(raw: &str) -> Self {
        Self {
            keys: raw.split(',').filter_map(SortKey::parse).collect(),
        }
    }

    /// Most recent first
    pub fn newest_first() -> Self {
        Self {
            keys: vec![SortKey::desc(DEFAULT_SORT_FIELD)],
        }
    }

    pub fn then(mut self, key: SortKey) -> Self {
        self.keys.push(key);
        self
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Native multi-field syntax: space separated, `-` for descending
impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if key.direction == SortDirection::Desc {
                f.write_str("-")?;
            }
            f.write_str(&key.field)?;
        }
        Ok(())
    }
}
