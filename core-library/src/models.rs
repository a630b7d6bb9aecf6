//! Domain models for the metadata query core.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Unique identifier for a track: the stable row id in the track table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct TrackId(pub i64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TrackId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// An in-memory track record: a row identity plus a mapping from field name
/// to an ordered sequence of values.
///
/// Fields may be multi-valued (a track with several genres, several
/// artists). Music files are messy, so absence of a field means
/// missing/unknown, never an error. The same field-name conventions are
/// used by the tag reader that populates tracks from files, so records from
/// either source interoperate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Row identity in the track table.
    pub id: TrackId,
    fields: HashMap<String, Vec<String>>,
}

impl Track {
    /// Create an empty track record for the given identity.
    pub fn new(id: TrackId) -> Self {
        Self {
            id,
            fields: HashMap::new(),
        }
    }

    /// Fixture-style construction: append one value and return self.
    pub fn with_value(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.append_unique(field, value);
        self
    }

    /// All values of a field, in insertion order. Empty when absent.
    pub fn values(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First value of a field, if any.
    pub fn first_value(&self, field: &str) -> Option<&str> {
        self.values(field).first().map(String::as_str)
    }

    /// Whether the field carries at least one value.
    pub fn has_field(&self, field: &str) -> bool {
        !self.values(field).is_empty()
    }

    /// Names of all populated fields (unordered).
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of populated fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Write a single-valued field exactly once.
    ///
    /// Later writes to an already-populated field are ignored, so repeated
    /// result rows cannot duplicate a fixed column's value.
    pub fn set_once(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let entry = self.fields.entry(field.into()).or_default();
        if entry.is_empty() {
            entry.push(value.into());
        }
    }

    /// Append a value to a multi-valued field, suppressing duplicates.
    ///
    /// Join results repeat every combination of joined values, so the same
    /// genre or metadata value recurs across rows; each distinct value is
    /// kept once, in first-seen order.
    pub fn append_unique(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let entry = self.fields.entry(field.into()).or_default();
        let value = value.into();
        if !entry.contains(&value) {
            entry.push(value);
        }
    }

    /// Drop all field values, keeping the identity.
    pub fn clear_fields(&mut self) {
        self.fields.clear();
    }
}
