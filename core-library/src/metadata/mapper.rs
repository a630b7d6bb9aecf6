//! Folds raw result rows back into the pending track records.
//!
//! The join graph yields one row per combination of joined values, so a
//! track with two genres and three metadata pairs comes back as several
//! rows that all describe the same track. Folding is driven entirely by
//! the column bindings the builder produced; query text is never
//! re-parsed.

use std::collections::HashMap;

use bridge_traits::database::{QueryRow, QueryValue};
use tracing::debug;

use crate::error::{LibraryError, Result};
use crate::metadata::builder::{ColumnBinding, ColumnRole};
use crate::models::Track;

/// Apply `rows` to `tracks` in place.
///
/// Rows resolve to tracks by identity, not position; batches are not
/// assumed to come back in submission order. Fixed columns are written
/// once; category and generic values append with duplicate suppression;
/// null values mean "no such category/key for this track" and are skipped.
/// A row whose identity matches no pending track is dropped (logged at
/// debug) without failing the batch. When the same identity appears more
/// than once in `tracks`, every occurrence is populated.
pub fn fold_rows(
    rows: &[QueryRow],
    columns: &[ColumnBinding],
    tracks: &mut [Track],
) -> Result<()> {
    let identity_column = columns
        .iter()
        .find(|binding| binding.role == ColumnRole::Identity)
        .map(|binding| binding.column.as_str())
        .ok_or_else(|| LibraryError::InvalidInput {
            field: "columns".to_string(),
            message: "rendered query has no identity column".to_string(),
        })?;

    let mut by_id: HashMap<i64, Vec<usize>> = HashMap::new();
    for (index, track) in tracks.iter().enumerate() {
        by_id.entry(track.id.0).or_default().push(index);
    }

    for row in rows {
        let identity = row
            .get(identity_column)
            .ok_or_else(|| LibraryError::InvalidInput {
                field: identity_column.to_string(),
                message: "identity column missing from result row".to_string(),
            })?;

        let Some(id) = identity.as_i64() else {
            debug!("dropping result row with non-integer identity");
            continue;
        };

        let Some(targets) = by_id.get(&id) else {
            // Identity not in the pending batch; one malformed row must not
            // invalidate the rest.
            debug!(track_id = id, "dropping result row for unknown track");
            continue;
        };

        let mut meta_key: Option<&str> = None;
        let mut meta_value: Option<String> = None;

        for binding in columns {
            let Some(value) = row.get(&binding.column) else {
                continue;
            };

            match &binding.role {
                ColumnRole::Identity => {}
                ColumnRole::Fixed(field) => {
                    if let Some(text) = value_to_string(value) {
                        for &target in targets {
                            tracks[target].set_once(field.clone(), text.clone());
                        }
                    }
                }
                ColumnRole::Category(field) => {
                    if let Some(text) = value_to_string(value) {
                        for &target in targets {
                            tracks[target].append_unique(field.clone(), text.clone());
                        }
                    }
                }
                ColumnRole::MetaKey => meta_key = value.as_str(),
                ColumnRole::MetaValue => meta_value = value_to_string(value),
            }
        }

        if let (Some(key), Some(value)) = (meta_key, meta_value) {
            for &target in targets {
                tracks[target].append_unique(key, value.clone());
            }
        }
    }

    Ok(())
}

/// Stringify a non-null value for the track field map.
///
/// Fixed columns carry integers and reals (year, duration, bpm); the field
/// map is uniformly string-valued, matching what the tag readers produce.
fn value_to_string(value: &QueryValue) -> Option<String> {
    match value {
        QueryValue::Text(s) => Some(s.clone()),
        QueryValue::Integer(i) => Some(i.to_string()),
        QueryValue::Real(r) => Some(r.to_string()),
        QueryValue::Null | QueryValue::Blob(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::builder::{IDENTITY_COLUMN, META_KEY_COLUMN, META_VALUE_COLUMN};
    use crate::models::TrackId;

    fn binding(column: &str, role: ColumnRole) -> ColumnBinding {
        ColumnBinding {
            column: column.to_string(),
            role,
        }
    }

    fn title_genre_columns() -> Vec<ColumnBinding> {
        vec![
            binding(IDENTITY_COLUMN, ColumnRole::Identity),
            binding("title", ColumnRole::Fixed("title".to_string())),
            binding("genre", ColumnRole::Category("genre".to_string())),
        ]
    }

    fn row(entries: &[(&str, QueryValue)]) -> QueryRow {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn repeated_rows_fold_into_multi_valued_fields() {
        let mut tracks = vec![Track::new(TrackId(1))];
        let rows = vec![
            row(&[
                (IDENTITY_COLUMN, QueryValue::Integer(1)),
                ("title", QueryValue::Text("Song".into())),
                ("genre", QueryValue::Text("Rock".into())),
            ]),
            row(&[
                (IDENTITY_COLUMN, QueryValue::Integer(1)),
                ("title", QueryValue::Text("Song".into())),
                ("genre", QueryValue::Text("Pop".into())),
            ]),
            // Cartesian repetition of an already-seen genre
            row(&[
                (IDENTITY_COLUMN, QueryValue::Integer(1)),
                ("title", QueryValue::Text("Song".into())),
                ("genre", QueryValue::Text("Rock".into())),
            ]),
        ];

        fold_rows(&rows, &title_genre_columns(), &mut tracks).unwrap();

        assert_eq!(tracks[0].values("title"), ["Song"]);
        assert_eq!(tracks[0].values("genre"), ["Rock", "Pop"]);
    }

    #[test]
    fn null_category_is_skipped_not_an_error() {
        let mut tracks = vec![Track::new(TrackId(2))];
        let rows = vec![row(&[
            (IDENTITY_COLUMN, QueryValue::Integer(2)),
            ("title", QueryValue::Text("Quiet".into())),
            ("genre", QueryValue::Null),
        ])];

        fold_rows(&rows, &title_genre_columns(), &mut tracks).unwrap();

        assert_eq!(tracks[0].values("title"), ["Quiet"]);
        assert!(tracks[0].values("genre").is_empty());
    }

    #[test]
    fn orphan_rows_are_dropped_without_failing_the_batch() {
        let mut tracks = vec![Track::new(TrackId(1))];
        let rows = vec![
            row(&[
                (IDENTITY_COLUMN, QueryValue::Integer(99)),
                ("title", QueryValue::Text("Ghost".into())),
                ("genre", QueryValue::Null),
            ]),
            row(&[
                (IDENTITY_COLUMN, QueryValue::Integer(1)),
                ("title", QueryValue::Text("Real".into())),
                ("genre", QueryValue::Null),
            ]),
        ];

        fold_rows(&rows, &title_genre_columns(), &mut tracks).unwrap();

        assert_eq!(tracks[0].values("title"), ["Real"]);
        assert_eq!(tracks.len(), 1);
    }

    #[test]
    fn duplicate_pending_identities_are_all_populated() {
        let mut tracks = vec![Track::new(TrackId(1)), Track::new(TrackId(1))];
        let rows = vec![row(&[
            (IDENTITY_COLUMN, QueryValue::Integer(1)),
            ("title", QueryValue::Text("Twice".into())),
            ("genre", QueryValue::Text("Rock".into())),
        ])];

        fold_rows(&rows, &title_genre_columns(), &mut tracks).unwrap();

        for track in &tracks {
            assert_eq!(track.values("title"), ["Twice"]);
            assert_eq!(track.values("genre"), ["Rock"]);
        }
    }

    #[test]
    fn meta_pairs_fold_under_their_own_key() {
        let columns = vec![
            binding(IDENTITY_COLUMN, ColumnRole::Identity),
            binding(META_KEY_COLUMN, ColumnRole::MetaKey),
            binding(META_VALUE_COLUMN, ColumnRole::MetaValue),
        ];
        let mut tracks = vec![Track::new(TrackId(4))];
        let rows = vec![
            row(&[
                (IDENTITY_COLUMN, QueryValue::Integer(4)),
                (META_KEY_COLUMN, QueryValue::Text("composer".into())),
                (META_VALUE_COLUMN, QueryValue::Text("Someone".into())),
            ]),
            row(&[
                (IDENTITY_COLUMN, QueryValue::Integer(4)),
                (META_KEY_COLUMN, QueryValue::Text("mood".into())),
                (META_VALUE_COLUMN, QueryValue::Text("calm".into())),
            ]),
            // Track with no metadata at all still yields a null pair
            row(&[
                (IDENTITY_COLUMN, QueryValue::Integer(4)),
                (META_KEY_COLUMN, QueryValue::Null),
                (META_VALUE_COLUMN, QueryValue::Null),
            ]),
        ];

        fold_rows(&rows, &columns, &mut tracks).unwrap();

        assert_eq!(tracks[0].values("composer"), ["Someone"]);
        assert_eq!(tracks[0].values("mood"), ["calm"]);
        assert_eq!(tracks[0].field_count(), 2);
    }

    #[test]
    fn numeric_fixed_columns_become_strings() {
        let columns = vec![
            binding(IDENTITY_COLUMN, ColumnRole::Identity),
            binding("year", ColumnRole::Fixed("year".to_string())),
            binding("bpm", ColumnRole::Fixed("bpm".to_string())),
        ];
        let mut tracks = vec![Track::new(TrackId(5))];
        let rows = vec![row(&[
            (IDENTITY_COLUMN, QueryValue::Integer(5)),
            ("year", QueryValue::Integer(1994)),
            ("bpm", QueryValue::Real(127.5)),
        ])];

        fold_rows(&rows, &columns, &mut tracks).unwrap();

        assert_eq!(tracks[0].values("year"), ["1994"]);
        assert_eq!(tracks[0].values("bpm"), ["127.5"]);
    }

    #[test]
    fn missing_identity_column_is_an_error() {
        let columns = vec![binding("title", ColumnRole::Fixed("title".to_string()))];
        let mut tracks = vec![Track::new(TrackId(1))];

        let err = fold_rows(&[], &columns, &mut tracks).unwrap_err();
        assert!(matches!(err, LibraryError::InvalidInput { .. }));
    }
}
