//! Obslog records and frame identifiers.

use super::criteria::{Field, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque identifier of one obslog record / raw data file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(String);

impl FrameId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FrameId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One metadata record of the observing log.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRecord {
    /// Identifier of the raw file this record describes.
    pub id: FrameId,

    /// Field values; absent fields are unknown and never match a predicate.
    fields: BTreeMap<Field, Value>,
}

impl FrameRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: FrameId::new(id),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style setter.
    pub fn with(mut self, field: Field, value: Value) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: Field, value: Value) {
        self.fields.insert(field, value);
    }

    pub fn get(&self, field: Field) -> Option<&Value> {
        self.fields.get(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (Field, &Value)> {
        self.fields.iter().map(|(field, value)| (*field, value))
    }
}
