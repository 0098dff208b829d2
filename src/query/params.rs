//! # Request Parameters
//!
//! The untrusted key/value map a list endpoint receives in its query string.
//!
//! Bracket syntax is folded into nested maps, so `price[gte]=500` becomes
//! `price -> {gte -> "500"}`. A key that repeats becomes a list.

use std::collections::BTreeMap;

use url::form_urlencoded;

/// A single request parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// `key=value`
    Single(String),

    /// `key=a&key=b`
    Many(Vec<String>),

    /// `key[sub]=value`
    Nested(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// Scalar view of the value. For lists the last occurrence wins.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Single(s) => Some(s),
            ParamValue::Many(values) => values.last().map(String::as_str),
            ParamValue::Nested(_) => None,
        }
    }

    /// Whether the value carries nothing usable (`key=` or `key=&key=`)
    pub fn is_blank(&self) -> bool {
        match self {
            ParamValue::Single(s) => s.trim().is_empty(),
            ParamValue::Many(values) => values.iter().all(|v| v.trim().is_empty()),
            ParamValue::Nested(map) => map.is_empty(),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            ParamValue::Single(existing) => {
                let first = std::mem::take(existing);
                *self = ParamValue::Many(vec![first, value]);
            }
            ParamValue::Many(values) => values.push(value),
            ParamValue::Nested(_) => *self = ParamValue::Single(value),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Single(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::Many(values)
    }
}

/// The parsed request parameter map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    entries: BTreeMap<String, ParamValue>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw (still percent-encoded) query string
    pub fn from_query(raw: &str) -> Self {
        let mut params = Self::new();

        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            if key.is_empty() {
                continue;
            }
            params.insert_raw(&key, value.into_owned());
        }

        params
    }

    /// Insert one `key=value` pair, honouring bracket syntax and repeats
    fn insert_raw(&mut self, key: &str, value: String) {
        let (base, path) = split_bracket_key(key);

        if path.is_empty() {
            match self.entries.get_mut(base) {
                Some(existing) => existing.push(value),
                None => {
                    self.entries
                        .insert(base.to_string(), ParamValue::Single(value));
                }
            }
            return;
        }

        let slot = self
            .entries
            .entry(base.to_string())
            .or_insert_with(|| ParamValue::Nested(BTreeMap::new()));
        insert_nested(slot, &path, value);
    }

    /// Set a parameter, replacing any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder form of [`RequestParams::insert`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    /// Scalar value of a parameter, treating blank values as absent
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .filter(|v| !v.is_blank())
            .and_then(ParamValue::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rebuild the map entry by entry; `None` drops the entry
    pub fn map_entries<F>(self, mut f: F) -> Self
    where
        F: FnMut(String, ParamValue) -> Option<(String, ParamValue)>,
    {
        Self {
            entries: self
                .entries
                .into_iter()
                .filter_map(|(k, v)| f(k, v))
                .collect(),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for RequestParams
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Split `price[gte]` into (`price`, [`gte`]). Malformed brackets keep the
/// whole key literal.
fn split_bracket_key(key: &str) -> (&str, Vec<&str>) {
    let Some(open) = key.find('[') else {
        return (key, Vec::new());
    };
    if open == 0 || !key.ends_with(']') {
        return (key, Vec::new());
    }

    let base = &key[..open];
    let mut path = Vec::new();
    let mut rest = &key[open..];

    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else {
            return (key, Vec::new());
        };
        let segment = &stripped[..close];
        if segment.is_empty() || segment.contains('[') {
            return (key, Vec::new());
        }
        path.push(segment);
        rest = &stripped[close + 1..];
    }

    if !rest.is_empty() {
        return (key, Vec::new());
    }

    (base, path)
}

fn insert_nested(slot: &mut ParamValue, path: &[&str], value: String) {
    if !matches!(slot, ParamValue::Nested(_)) {
        *slot = ParamValue::Nested(BTreeMap::new());
    }
    let ParamValue::Nested(map) = slot else {
        return;
    };

    let (head, tail) = match path.split_first() {
        Some(parts) => parts,
        None => return,
    };

    if tail.is_empty() {
        match map.get_mut(*head) {
            Some(existing) => existing.push(value),
            None => {
                map.insert(head.to_string(), ParamValue::Single(value));
            }
        }
    } else {
        let child = map
            .entry(head.to_string())
            .or_insert_with(|| ParamValue::Nested(BTreeMap::new()));
        insert_nested(child, tail, value);
    }
}
