//! # Metadata Query Subsystem
//!
//! Turns a set of requested field names for a batch of tracks into one SQL
//! query over the library store, then folds the result rows back into the
//! track records.
//!
//! ## Components
//!
//! - [`catalog`]: static classification of every queryable field name
//! - [`selection`]: the set of fields a caller wants, with display order
//! - [`builder`]: typed query fragments rendered to SQL plus binds
//! - [`mapper`]: folds result rows into pending tracks by identity
//! - [`query`]: the externally visible lifecycle (configure, submit,
//!   execute, notify)

pub mod builder;
pub mod catalog;
pub mod mapper;
pub mod query;
pub mod selection;

pub use catalog::{FieldCatalog, FieldDescriptor, FieldKind};
pub use query::{QueryState, TrackBatch, TrackMetadataQuery};
pub use selection::FieldSelection;
