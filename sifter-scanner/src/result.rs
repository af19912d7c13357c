use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;

/// Marker written in place of a field that was requested but not found
pub const UNAVAILABLE: &str = "N/A";

/// An extracted value, or the marker for "requested but not found".
///
/// `Unavailable` is distinct from an empty string. It serializes to JSON
/// `null` and displays as [`UNAVAILABLE`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldValue {
    Text(String),
    Unavailable,
}

impl FieldValue {
    pub fn is_available(&self) -> bool {
        matches!(self, FieldValue::Text(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Unavailable => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Unavailable => f.write_str(UNAVAILABLE),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Unavailable => serializer.serialize_none(),
        }
    }
}

/// Ordered field -> value pairs.
///
/// Shared representation of [`RawRecord`] and [`UniformRecord`]; serializes
/// as a map that keeps insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Fields(Vec<(String, FieldValue)>);

impl Fields {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &FieldValue> {
        self.0.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for Fields {
    /// Later duplicates of a key are ignored
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        let mut fields: Vec<(String, FieldValue)> = Vec::new();
        for (key, value) in iter {
            if !fields.iter().any(|(k, _)| *k == key) {
                fields.push((key, value));
            }
        }
        Fields(fields)
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Fields pulled from one record-bearing node, before reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RawRecord {
    pub fields: Fields,
}

impl RawRecord {
    pub fn new(fields: impl IntoIterator<Item = (String, FieldValue)>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// True when at least one field resolved to a value
    pub fn has_data(&self) -> bool {
        self.fields.values().any(FieldValue::is_available)
    }
}

/// Records in page-then-DOM order
pub type RecordSet = Vec<RawRecord>;

/// A record carrying exactly the reconciled column set, in column order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UniformRecord {
    pub fields: Fields,
}

impl UniformRecord {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &FieldValue> {
        self.fields.values()
    }
}

/// Per-page progress reported while traversing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageProgress {
    /// 1-based page index
    pub page: usize,
    pub url: String,
    pub extracted: usize,
    pub skipped: usize,
    pub total: usize,
}
