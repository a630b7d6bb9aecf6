//! Static classification of queryable metadata field names.
//!
//! The catalog is the single source of truth for what is queryable: a name
//! it does not know produces no column and no join. Field names match the
//! lower-case conventions of the tag readers that populate track records.

use std::collections::HashMap;

/// How a field is stored in the library schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// A dedicated column on the track table.
    Fixed {
        /// Column name on `tracks`.
        column: &'static str,
    },
    /// A normalized value in a lookup table, reached through a per-track
    /// mapping table. Potentially multi-valued.
    Category {
        /// Lookup table holding the values (e.g. `genres`).
        lookup_table: &'static str,
        /// Per-track mapping table (e.g. `track_genres`).
        mapping_table: &'static str,
        /// Column on the mapping table pointing at the lookup row.
        mapping_key: &'static str,
    },
    /// A free-form key in the shared key/value metadata table.
    Generic,
}

/// One catalog entry: a queryable field name and where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    const fn fixed(name: &'static str, column: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Fixed { column },
        }
    }

    const fn category(
        name: &'static str,
        lookup_table: &'static str,
        mapping_table: &'static str,
        mapping_key: &'static str,
    ) -> Self {
        Self {
            name,
            kind: FieldKind::Category {
                lookup_table,
                mapping_table,
                mapping_key,
            },
        }
    }

    const fn generic(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Generic,
        }
    }
}

/// Every field the library knows how to query, in stable catalog order.
const KNOWN_FIELDS: &[FieldDescriptor] = &[
    // Fixed columns on the track table
    FieldDescriptor::fixed("title", "title"),
    FieldDescriptor::fixed("track", "track"),
    FieldDescriptor::fixed("bpm", "bpm"),
    FieldDescriptor::fixed("duration", "duration"),
    FieldDescriptor::fixed("filesize", "filesize"),
    FieldDescriptor::fixed("year", "year"),
    FieldDescriptor::fixed("filename", "filename"),
    FieldDescriptor::fixed("filetime", "filetime"),
    // Normalized categories
    FieldDescriptor::category("genre", "genres", "track_genres", "genre_id"),
    FieldDescriptor::category("artist", "artists", "track_artists", "artist_id"),
    FieldDescriptor::category("album", "albums", "track_albums", "album_id"),
    // Free-form keys written by the tag readers
    FieldDescriptor::generic("album_artist"),
    FieldDescriptor::generic("comment"),
    FieldDescriptor::generic("composer"),
    FieldDescriptor::generic("conductor"),
    FieldDescriptor::generic("copyright"),
    FieldDescriptor::generic("encoder"),
    FieldDescriptor::generic("language"),
    FieldDescriptor::generic("lyrics"),
    FieldDescriptor::generic("mood"),
    FieldDescriptor::generic("publisher"),
    FieldDescriptor::generic("textrating"),
    FieldDescriptor::generic("totaltracks"),
    FieldDescriptor::generic("writer"),
];

/// Immutable lookup from field name to storage kind.
///
/// Built once at construction; classification afterwards is a map lookup.
#[derive(Debug, Clone)]
pub struct FieldCatalog {
    by_name: HashMap<&'static str, &'static FieldDescriptor>,
}

impl FieldCatalog {
    pub fn new() -> Self {
        let by_name = KNOWN_FIELDS.iter().map(|d| (d.name, d)).collect();
        Self { by_name }
    }

    /// Classify a field name. `None` means the name is not queryable and
    /// callers must skip it silently.
    pub fn classify(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.by_name.get(name).copied()
    }

    /// Every known field, in stable catalog order.
    pub fn all_fields(&self) -> impl Iterator<Item = &'static FieldDescriptor> {
        KNOWN_FIELDS.iter()
    }

    /// Number of known fields.
    pub fn len(&self) -> usize {
        KNOWN_FIELDS.len()
    }

    pub fn is_empty(&self) -> bool {
        KNOWN_FIELDS.is_empty()
    }
}

impl Default for FieldCatalog {
    fn default() -> Self {
        Self::new()
    }
}
