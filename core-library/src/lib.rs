//! # Library Metadata Query Module
//!
//! Owns the canonical library store and answers batch metadata queries
//! over it: given a set of requested field names and a batch of tracks,
//! build one SQL query spanning the track table, the category lookups, and
//! the key/value metadata table, execute it, and fold the rows back into
//! the track records.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite schema and migrations for the library store
//! - The native engine adapter implementing the bridge contract
//! - The field catalog, selection, query builder, and result mapper
//! - The query lifecycle and the worker host that executes it
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_library::{QueryHost, Track, TrackId, TrackMetadataQuery};
//!
//! let mut query = TrackMetadataQuery::new();
//! query.request_fields(["album", "genre"]);
//! query.request_track(Track::new(TrackId(1)));
//!
//! let mut on_tracks = query.subscribe();
//! host.submit(query).await?;
//! let tracks = on_tracks.recv().await?;
//! ```

pub mod adapters;
pub mod db;
pub mod error;
pub mod host;
pub mod metadata;
pub mod models;

pub use error::{LibraryError, Result};
pub use host::QueryHost;
pub use metadata::{FieldCatalog, FieldSelection, QueryState, TrackBatch, TrackMetadataQuery};
pub use models::{Track, TrackId};
