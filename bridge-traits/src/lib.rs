//! # Host Bridge Traits
//!
//! Collaborator contracts between the metadata query core and its host.
//!
//! ## Overview
//!
//! The query core never talks to a concrete storage engine. It renders query
//! text plus positional parameters and hands both to a [`DatabaseAdapter`],
//! which executes the query and yields rows back as plain value maps. Any
//! embedded store that can satisfy that contract (execute query, iterate
//! rows) can host the library.
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Adapter implementations should convert engine-specific errors into
//! `BridgeError` with actionable messages.
//!
//! ## Thread Safety
//!
//! Bridge traits require `Send + Sync` bounds so adapters can be shared
//! across the submitting context and the query worker context.

pub mod database;
pub mod error;

pub use database::{DatabaseAdapter, DatabaseConfig, QueryRow, QueryValue};
pub use error::BridgeError;
