//! Normalized entity graph and reference resolution.
//!
//! The embedded client cache is a flat `key -> record` map. Records point at each
//! other through reference markers or through keys derived from a type tag and an
//! id. All knowledge of those key formats lives in this module.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::{DanglingReference, ExtractError};

pub type Record = Map<String, Value>;

pub const ROOT_KEY: &str = "ROOT_QUERY";

/// Marker key used by the current cache layout: `{"__ref": "Menu:1"}`.
const REF_FIELD: &str = "__ref";

/// A graph key built from a type tag and an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphKey<'a> {
    /// `Type:id`
    Entity { type_tag: &'a str, id: &'a str },
    /// `Type:id.path`, where `path` may itself be dotted (`businessHours.0`).
    Field {
        type_tag: &'a str,
        id: &'a str,
        path: &'a str,
    },
    /// `$Type:id.path`, keys the cache generates for id-less nested objects.
    Generated {
        type_tag: &'a str,
        id: &'a str,
        path: &'a str,
    },
    /// `Type:id_index`
    Indexed {
        type_tag: &'a str,
        id: &'a str,
        index: usize,
    },
}

impl fmt::Display for GraphKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphKey::Entity { type_tag, id } => write!(f, "{}:{}", type_tag, id),
            GraphKey::Field { type_tag, id, path } => write!(f, "{}:{}.{}", type_tag, id, path),
            GraphKey::Generated { type_tag, id, path } => {
                write!(f, "${}:{}.{}", type_tag, id, path)
            }
            GraphKey::Indexed { type_tag, id, index } => {
                write!(f, "{}:{}_{}", type_tag, id, index)
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedGraph {
    records: Record,
}

impl NormalizedGraph {
    /// Parse a state blob. Any valid JSON succeeds; a non-object top level gives an
    /// empty graph.
    pub fn parse(blob: &str) -> Result<Self, ExtractError> {
        let value: Value = serde_json::from_str(blob)?;
        let records = match value {
            Value::Object(map) => map,
            _ => Record::new(),
        };
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Direct key lookup. Entries that are not objects count as absent.
    pub fn get(&self, key: &str) -> Result<&Record, DanglingReference> {
        self.records
            .get(key)
            .and_then(Value::as_object)
            .ok_or_else(|| DanglingReference::new(key))
    }

    pub fn resolve(&self, key: &GraphKey<'_>) -> Result<&Record, DanglingReference> {
        self.get(&key.to_string())
    }

    /// Follow a reference marker.
    pub fn follow(&self, marker: &Value) -> Result<&Record, DanglingReference> {
        match marker_key(marker) {
            Some(key) => self.get(key),
            None => Err(DanglingReference::new(marker.to_string())),
        }
    }

    /// Resolve a field value that may be a marker, a bare key string, or an inline
    /// record.
    pub fn resolve_value<'g>(&'g self, value: &'g Value) -> Result<&'g Record, DanglingReference> {
        if let Some(key) = marker_key(value) {
            return self.get(key);
        }
        match value {
            Value::String(key) => self.get(key),
            Value::Object(inline) => Ok(inline),
            other => Err(DanglingReference::new(other.to_string())),
        }
    }

    /// Like [`resolve_value`](Self::resolve_value), but values that carry no usable
    /// link fall back to a derived key.
    pub fn resolve_or_derive<'g>(
        &'g self,
        value: &'g Value,
        derived: &GraphKey<'_>,
    ) -> Result<&'g Record, DanglingReference> {
        match value {
            Value::Object(_) | Value::String(_) => self.resolve_value(value),
            _ => self.resolve(derived),
        }
    }

    pub fn root(&self) -> Option<&Record> {
        self.get(ROOT_KEY).ok()
    }

    /// Root query fields whose (dynamic) name starts with `prefix`, in document order.
    pub fn root_fields<'g>(&'g self, prefix: &'g str) -> impl Iterator<Item = (&'g str, &'g Value)> + 'g {
        self.root()
            .into_iter()
            .flat_map(|root| root.iter())
            .filter(move |(name, _)| name.starts_with(prefix))
            .map(|(name, value)| (name.as_str(), value))
    }
}

/// Key named by a reference marker, if `value` is one.
///
/// Accepts `{"__ref": key}`, the older `{"type": "id", "id": key, ...}` and a bare
/// `{"id": key}` stub.
pub fn marker_key(value: &Value) -> Option<&str> {
    let obj = value.as_object()?;
    if let Some(key) = obj.get(REF_FIELD).and_then(Value::as_str) {
        return Some(key);
    }
    let id = obj.get("id").and_then(Value::as_str)?;
    let legacy = obj.get("type").and_then(Value::as_str) == Some("id");
    let stub = obj.len() == 1;
    (legacy || stub).then_some(id)
}
