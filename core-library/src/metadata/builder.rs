//! Renders an effective field list plus a batch of track identities into
//! one SQL query.
//!
//! The query is assembled from typed fragments (select list, join list,
//! predicate) and only flattened to text at the very end, right before it
//! crosses the adapter boundary. Values never enter the text: every
//! variable travels as a positional bind.
//!
//! Shape of a full query:
//!
//! ```sql
//! SELECT t.id AS track_id, t.title AS title, cat_genre.name AS genre,
//!        meta.key AS meta_key, meta.value AS meta_value
//! FROM tracks t
//! LEFT JOIN track_genres map_genre ON map_genre.track_id = t.id
//! LEFT JOIN genres cat_genre ON cat_genre.id = map_genre.genre_id
//! LEFT JOIN track_meta meta ON meta.track_id = t.id AND meta.key IN (?)
//! WHERE t.id IN (?, ?)
//! ```
//!
//! Every join is a left join: a track with no value for a category or key
//! must still come back. Generic fields share a single join on the
//! key/value table restricted to the requested keys; the mapper folds the
//! resulting narrow rows. The whole batch is restricted with one
//! `id IN (...)` predicate, never one query per track.

use bridge_traits::database::QueryValue;

use crate::error::{LibraryError, Result};
use crate::metadata::catalog::{FieldDescriptor, FieldKind};
use crate::models::TrackId;

/// Alias of the track identity column in every rendered query.
pub const IDENTITY_COLUMN: &str = "track_id";

/// Alias of the metadata key column when generic fields are joined.
pub const META_KEY_COLUMN: &str = "meta_key";

/// Alias of the metadata value column when generic fields are joined.
pub const META_VALUE_COLUMN: &str = "meta_value";

/// What a result column carries, so the mapper can interpret rows without
/// re-parsing query text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRole {
    /// The track identity.
    Identity,
    /// A fixed field; the payload is the field name.
    Fixed(String),
    /// A category field; the payload is the field name.
    Category(String),
    /// The key half of a generic key/value pair.
    MetaKey,
    /// The value half of a generic key/value pair.
    MetaValue,
}

/// One result column: its alias in the row and what it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnBinding {
    pub column: String,
    pub role: ColumnRole,
}

/// A rendered query: opaque text, positional binds, and the column map the
/// mapper needs to interpret rows.
#[derive(Debug, Clone)]
pub struct RenderedQuery {
    pub sql: String,
    pub binds: Vec<QueryValue>,
    pub columns: Vec<ColumnBinding>,
}

/// One entry of the typed select list.
struct SelectItem {
    expr: String,
    binding: ColumnBinding,
}

impl SelectItem {
    fn new(expr: impl Into<String>, column: impl Into<String>, role: ColumnRole) -> Self {
        let column = column.into();
        Self {
            expr: expr.into(),
            binding: ColumnBinding { column, role },
        }
    }
}

/// Render the metadata query for `fields` over `track_ids`.
///
/// The field list is the *effective* selection: already deduplicated and
/// already filtered to catalog-known fields, so every field contributes
/// exactly one column (and at most one join chain).
///
/// # Errors
///
/// Returns `InvalidInput` when `track_ids` is empty: there is no identity
/// to select and no well-formed `IN ()` predicate to render. Callers
/// short-circuit empty batches before rendering.
pub fn render_metadata_query(
    fields: &[&FieldDescriptor],
    track_ids: &[TrackId],
) -> Result<RenderedQuery> {
    if track_ids.is_empty() {
        return Err(LibraryError::InvalidInput {
            field: "track_ids".to_string(),
            message: "cannot render a query over an empty track batch".to_string(),
        });
    }

    let mut select = vec![SelectItem::new(
        "t.id",
        IDENTITY_COLUMN,
        ColumnRole::Identity,
    )];
    let mut joins: Vec<String> = Vec::new();
    let mut binds: Vec<QueryValue> = Vec::new();
    let mut generic_keys: Vec<&str> = Vec::new();

    for descriptor in fields {
        match &descriptor.kind {
            FieldKind::Fixed { column } => {
                select.push(SelectItem::new(
                    format!("t.{}", column),
                    descriptor.name,
                    ColumnRole::Fixed(descriptor.name.to_string()),
                ));
            }
            FieldKind::Category {
                lookup_table,
                mapping_table,
                mapping_key,
            } => {
                // Aliased per category so genre and artist joins never collide.
                let map_alias = format!("map_{}", descriptor.name);
                let cat_alias = format!("cat_{}", descriptor.name);
                joins.push(format!(
                    "LEFT JOIN {} {} ON {}.track_id = t.id",
                    mapping_table, map_alias, map_alias
                ));
                joins.push(format!(
                    "LEFT JOIN {} {} ON {}.id = {}.{}",
                    lookup_table, cat_alias, cat_alias, map_alias, mapping_key
                ));
                select.push(SelectItem::new(
                    format!("{}.name", cat_alias),
                    descriptor.name,
                    ColumnRole::Category(descriptor.name.to_string()),
                ));
            }
            FieldKind::Generic => generic_keys.push(descriptor.name),
        }
    }

    // A caller that asked for nothing still gets a well-formed track with
    // its identity and title.
    if fields.is_empty() {
        select.push(SelectItem::new(
            "t.title",
            "title",
            ColumnRole::Fixed("title".to_string()),
        ));
    }

    if !generic_keys.is_empty() {
        joins.push(format!(
            "LEFT JOIN track_meta meta ON meta.track_id = t.id AND meta.key IN ({})",
            placeholders(generic_keys.len())
        ));
        binds.extend(
            generic_keys
                .iter()
                .map(|key| QueryValue::Text((*key).to_string())),
        );
        select.push(SelectItem::new(
            "meta.key",
            META_KEY_COLUMN,
            ColumnRole::MetaKey,
        ));
        select.push(SelectItem::new(
            "meta.value",
            META_VALUE_COLUMN,
            ColumnRole::MetaValue,
        ));
    }

    binds.extend(track_ids.iter().map(|id| QueryValue::Integer(id.0)));

    let select_list = select
        .iter()
        .map(|item| format!("{} AS {}", item.expr, item.binding.column))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!("SELECT {} FROM tracks t", select_list);
    for join in &joins {
        sql.push(' ');
        sql.push_str(join);
    }
    sql.push_str(&format!(
        " WHERE t.id IN ({})",
        placeholders(track_ids.len())
    ));

    let columns = select.into_iter().map(|item| item.binding).collect();

    Ok(RenderedQuery {
        sql,
        binds,
        columns,
    })
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
