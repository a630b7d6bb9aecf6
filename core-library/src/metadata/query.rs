//! The externally visible query protocol: configure, submit, execute,
//! notify.
//!
//! A [`TrackMetadataQuery`] is configured on the submitting context
//! (tracks + fields), handed to the host by value, executed on the worker
//! context, and its result set delivered through a multicast completion
//! notification. Ownership handoff is the concurrency discipline: while the
//! query is executing nobody else holds it, so no internal locking exists.
//!
//! ```text
//! Configuring ──pre_enqueue──> Submitted ──execute──> Executing ─┬─> Completed ──run_callbacks──> (consumed)
//!                                                                └─> Failed
//! ```
//!
//! There is no retry transition; a host that wants to retry resubmits a
//! [`clone_for_resubmit`](TrackMetadataQuery::clone_for_resubmit) copy.

use std::mem;
use std::sync::Arc;

use bridge_traits::database::DatabaseAdapter;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{LibraryError, Result};
use crate::metadata::builder::render_metadata_query;
use crate::metadata::catalog::FieldCatalog;
use crate::metadata::mapper::fold_rows;
use crate::metadata::selection::FieldSelection;
use crate::models::{Track, TrackId};

/// Buffer of the completion notification channel.
const CALLBACK_BUFFER: usize = 16;

/// The completed result set as delivered to subscribers.
pub type TrackBatch = Arc<Vec<Track>>;

/// Where a query is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// Accepting configuration on the submitting context.
    Configuring,
    /// Enqueued with the host; configuration is frozen.
    Submitted,
    /// Running on the worker context.
    Executing,
    /// Result set is ready for callback delivery.
    Completed,
    /// Execution failed; the result set is empty.
    Failed,
}

/// A batch metadata query over the library store.
///
/// Deliberately not `Clone`: a plain copy would duplicate in-flight pending
/// state. The one sanctioned copy operation is
/// [`clone_for_resubmit`](Self::clone_for_resubmit), which carries the
/// configuration but starts with a clean slate.
pub struct TrackMetadataQuery {
    id: Uuid,
    state: QueryState,
    catalog: Arc<FieldCatalog>,
    selection: FieldSelection,
    pending: Vec<Track>,
    results: Vec<Track>,
    delivered: bool,
    on_tracks: broadcast::Sender<TrackBatch>,
}

impl TrackMetadataQuery {
    pub fn new() -> Self {
        let (on_tracks, _) = broadcast::channel(CALLBACK_BUFFER);
        Self {
            id: Uuid::new_v4(),
            state: QueryState::Configuring,
            catalog: Arc::new(FieldCatalog::new()),
            selection: FieldSelection::new(),
            pending: Vec::new(),
            results: Vec::new(),
            delivered: false,
            on_tracks,
        }
    }

    /// Correlation id, stable across the query's lifetime.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    /// Reset selection and pending/result state for reconfiguration.
    ///
    /// Only valid while [`Configuring`](QueryState::Configuring); once
    /// submitted, the object is frozen until execution finishes.
    pub fn clear(&mut self) -> Result<()> {
        self.expect_state(QueryState::Configuring)?;
        self.selection.clear();
        self.pending.clear();
        self.results.clear();
        self.delivered = false;
        Ok(())
    }

    /// Append a track to the pending batch.
    ///
    /// No dedup: the same track may legitimately be requested twice across
    /// repeated calls, and every occurrence will be populated. Duplicate
    /// handling is the caller's responsibility.
    pub fn request_track(&mut self, track: Track) {
        self.pending.push(track);
    }

    /// Add field names to the selection.
    pub fn request_fields<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection.request(names);
    }

    /// Request every field the catalog knows.
    pub fn request_all_fields(&mut self) {
        self.selection.request_all();
    }

    pub fn selection(&self) -> &FieldSelection {
        &self.selection
    }

    /// Tracks awaiting metadata.
    pub fn pending(&self) -> &[Track] {
        &self.pending
    }

    /// The populated result set (empty until `Completed`, and again after
    /// callbacks consume it).
    pub fn results(&self) -> &[Track] {
        &self.results
    }

    /// Register for the completion notification.
    ///
    /// Subscribers are independent of the query's lifetime and also hear
    /// completions of resubmitted copies.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackBatch> {
        self.on_tracks.subscribe()
    }

    /// Hook invoked by the host immediately before this query is enqueued.
    ///
    /// Freezes configuration: `Configuring` → `Submitted`.
    pub fn pre_enqueue(&mut self) -> Result<()> {
        self.expect_state(QueryState::Configuring)?;
        self.state = QueryState::Submitted;
        debug!(
            query_id = %self.id,
            tracks = self.pending.len(),
            fields = self.selection.display_order().len(),
            all_fields = self.selection.is_all_fields(),
            "query enqueued"
        );
        Ok(())
    }

    /// Execute the query against the engine collaborator.
    ///
    /// Invoked by the host on the worker context; returns only once the
    /// query and mapping are complete or have failed. On failure the result
    /// set stays empty and pending tracks keep their pre-submission state;
    /// no partial writes are observable.
    pub async fn execute(&mut self, adapter: &dyn DatabaseAdapter) -> Result<()> {
        self.expect_state(QueryState::Submitted)?;
        self.state = QueryState::Executing;

        match self.run_query(adapter).await {
            Ok(tracks) => {
                info!(
                    query_id = %self.id,
                    tracks = tracks.len(),
                    "metadata query completed"
                );
                self.results = tracks;
                self.state = QueryState::Completed;
                Ok(())
            }
            Err(e) => {
                warn!(query_id = %self.id, error = %e, "metadata query failed");
                self.state = QueryState::Failed;
                Err(e)
            }
        }
    }

    async fn run_query(&self, adapter: &dyn DatabaseAdapter) -> Result<Vec<Track>> {
        if self.pending.is_empty() {
            debug!(query_id = %self.id, "empty pending batch, trivial success");
            return Ok(Vec::new());
        }

        let fields = self.selection.effective(&self.catalog);
        let ids: Vec<TrackId> = self.pending.iter().map(|t| t.id).collect();
        let rendered = render_metadata_query(&fields, &ids)?;

        debug!(
            query_id = %self.id,
            sql = %rendered.sql,
            binds = rendered.binds.len(),
            "executing metadata query"
        );

        let rows = adapter.query(&rendered.sql, &rendered.binds).await?;

        // Rows fold into a working copy; the pending batch stays untouched
        // so a failure cannot leave a partially populated result.
        let mut tracks = self.pending.clone();
        fold_rows(&rows, &rendered.columns, &mut tracks)?;
        Ok(tracks)
    }

    /// Deliver the completed result set to all subscribers.
    ///
    /// Valid only after `Completed`, and only once per execution; the
    /// payload is consumed. Returns the number of subscribers reached
    /// (zero when nobody is listening, which is not an error).
    pub fn run_callbacks(&mut self) -> Result<usize> {
        self.expect_state(QueryState::Completed)?;
        if self.delivered {
            return Err(LibraryError::AlreadyDelivered(self.id.to_string()));
        }

        let batch: TrackBatch = Arc::new(mem::take(&mut self.results));
        self.delivered = true;
        let notified = self.on_tracks.send(batch).unwrap_or(0);
        debug!(query_id = %self.id, subscribers = notified, "callbacks delivered");
        Ok(notified)
    }

    /// A fresh, independently owned query carrying this query's field
    /// selection but empty pending/result state.
    ///
    /// The copy shares the completion notification channel, so subscribers
    /// registered on the original hear the copy's completion, so resubmission
    /// stays transparent to callers. Used by the host to retry or to keep
    /// configuring a next batch while this one is in flight.
    pub fn clone_for_resubmit(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: QueryState::Configuring,
            catalog: Arc::clone(&self.catalog),
            selection: self.selection.clone(),
            pending: Vec::new(),
            results: Vec::new(),
            delivered: false,
            on_tracks: self.on_tracks.clone(),
        }
    }

    fn expect_state(&self, expected: QueryState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(LibraryError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }
}

impl Default for TrackMetadataQuery {
    fn default() -> Self {
        Self::new()
    }
}
