//! # Query Host
//!
//! Owns the worker context that executes submitted metadata queries.
//!
//! The host is the scheduler side of the query protocol: callers configure
//! a [`TrackMetadataQuery`] on their own context and hand it over by value
//! with [`QueryHost::submit`]. The worker task executes each query against
//! the shared adapter, delivers its completion callbacks, and emits
//! lifecycle events on the shared [`EventBus`]. Because submission moves
//! the query, nothing can mutate it while it executes. The handoff *is*
//! the locking discipline.
//!
//! Retry lives here, not in the query: a failed query stays failed, and the
//! host (or its caller) resubmits a
//! [`clone_for_resubmit`](TrackMetadataQuery::clone_for_resubmit) copy.

use std::sync::Arc;
use std::time::Instant;

use bridge_traits::database::DatabaseAdapter;
use core_runtime::events::{CoreEvent, EventBus, HostEvent, QueryEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{LibraryError, Result};
use crate::metadata::query::TrackMetadataQuery;

/// The hosting scheduler for metadata queries.
///
/// One worker context per host; queries execute strictly in submission
/// order against the shared adapter.
pub struct QueryHost {
    submit_tx: mpsc::Sender<TrackMetadataQuery>,
    worker: JoinHandle<()>,
    events: EventBus,
}

impl QueryHost {
    /// Start the worker context.
    ///
    /// `queue_depth` bounds the submission queue; a full queue applies
    /// backpressure to submitters rather than growing without bound.
    pub fn start(
        adapter: Arc<dyn DatabaseAdapter>,
        events: EventBus,
        queue_depth: usize,
    ) -> Self {
        let (submit_tx, submit_rx) = mpsc::channel(queue_depth);
        let worker = tokio::spawn(worker_loop(submit_rx, adapter, events.clone()));
        Self {
            submit_tx,
            worker,
            events,
        }
    }

    /// Enqueue a configured query onto the worker context.
    ///
    /// Invokes the query's pre-add hook (freezing its configuration) before
    /// the handoff, then emits a `Submitted` event. Subscribe to the
    /// query's completion notification *before* submitting; the query
    /// itself moves into the host.
    ///
    /// # Errors
    ///
    /// `InvalidState` when the query was already submitted;
    /// `HostUnavailable` when the worker has shut down.
    pub async fn submit(&self, mut query: TrackMetadataQuery) -> Result<()> {
        query.pre_enqueue()?;

        self.events
            .emit(CoreEvent::Query(QueryEvent::Submitted {
                query_id: query.id().to_string(),
                track_count: query.pending().len(),
            }))
            .ok();

        self.submit_tx
            .send(query)
            .await
            .map_err(|_| LibraryError::HostUnavailable)
    }

    /// The lifecycle event bus this host publishes on.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Stop accepting submissions, drain the queue, and wait for the
    /// worker to exit.
    pub async fn shutdown(self) {
        drop(self.submit_tx);
        if let Err(e) = self.worker.await {
            warn!(error = %e, "query worker terminated abnormally");
        }
    }
}

async fn worker_loop(
    mut submit_rx: mpsc::Receiver<TrackMetadataQuery>,
    adapter: Arc<dyn DatabaseAdapter>,
    events: EventBus,
) {
    info!("query worker started");
    events.emit(CoreEvent::Host(HostEvent::WorkerStarted)).ok();

    while let Some(mut query) = submit_rx.recv().await {
        let query_id = query.id().to_string();
        let started = Instant::now();

        match query.execute(adapter.as_ref()).await {
            Ok(()) => {
                let track_count = query.results().len();
                let subscribers_notified = query.run_callbacks().unwrap_or_else(|e| {
                    warn!(query_id = %query_id, error = %e, "callback delivery failed");
                    0
                });
                events
                    .emit(CoreEvent::Query(QueryEvent::Completed {
                        query_id,
                        track_count,
                        duration_ms: started.elapsed().as_millis() as u64,
                        subscribers_notified,
                    }))
                    .ok();
            }
            Err(e) => {
                events
                    .emit(CoreEvent::Query(QueryEvent::Failed {
                        query_id,
                        message: e.to_string(),
                        recoverable: e.is_recoverable(),
                    }))
                    .ok();
            }
        }
    }

    info!("query worker stopped");
    events.emit(CoreEvent::Host(HostEvent::WorkerStopped)).ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SqliteAdapter;
    use crate::db::create_test_pool;
    use crate::models::{Track, TrackId};

    async fn test_host() -> QueryHost {
        let pool = create_test_pool().await.unwrap();
        let adapter = Arc::new(SqliteAdapter::from_pool(pool));
        QueryHost::start(adapter, EventBus::new(16), 8)
    }

    #[tokio::test]
    async fn submit_rejects_an_already_submitted_query() {
        let host = test_host().await;

        let mut query = TrackMetadataQuery::new();
        query.pre_enqueue().unwrap();

        let err = host.submit(query).await.unwrap_err();
        assert!(matches!(err, LibraryError::InvalidState { .. }));
        host.shutdown().await;
    }

    #[tokio::test]
    async fn worker_lifecycle_events_bracket_the_host() {
        let pool = create_test_pool().await.unwrap();
        let adapter: Arc<dyn DatabaseAdapter> = Arc::new(SqliteAdapter::from_pool(pool));

        let bus = EventBus::new(16);
        let mut events = bus.subscribe();
        let host = QueryHost::start(adapter, bus, 8);
        host.shutdown().await;

        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Host(HostEvent::WorkerStarted)
        );
        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Host(HostEvent::WorkerStopped)
        );
    }

    #[tokio::test]
    async fn empty_query_completes_through_the_host() {
        let host = test_host().await;
        let mut events = host.events().subscribe();

        let query = TrackMetadataQuery::new();
        let mut callbacks = query.subscribe();
        host.submit(query).await.unwrap();

        let batch = callbacks.recv().await.unwrap();
        assert!(batch.is_empty());

        // Submitted then Completed, in order, skipping host events.
        let mut saw_submitted = false;
        loop {
            match events.recv().await.unwrap() {
                CoreEvent::Query(QueryEvent::Submitted { .. }) => saw_submitted = true,
                CoreEvent::Query(QueryEvent::Completed { track_count, .. }) => {
                    assert!(saw_submitted);
                    assert_eq!(track_count, 0);
                    break;
                }
                _ => {}
            }
        }

        host.shutdown().await;
    }

    #[tokio::test]
    async fn queries_complete_in_submission_order() {
        let host = test_host().await;
        let mut events = host.events().subscribe();

        let first = TrackMetadataQuery::new();
        let first_id = first.id().to_string();
        let second = TrackMetadataQuery::new();
        let second_id = second.id().to_string();

        host.submit(first).await.unwrap();
        host.submit(second).await.unwrap();

        let mut completed = Vec::new();
        while completed.len() < 2 {
            if let CoreEvent::Query(QueryEvent::Completed { query_id, .. }) =
                events.recv().await.unwrap()
            {
                completed.push(query_id);
            }
        }
        assert_eq!(completed, [first_id, second_id]);

        host.shutdown().await;
    }

    #[tokio::test]
    async fn failed_query_emits_a_failed_event() {
        // Dropping the key/value table makes any generic-field query fail.
        let pool = create_test_pool().await.unwrap();
        sqlx::query("DROP TABLE track_meta")
            .execute(&pool)
            .await
            .unwrap();
        let adapter = Arc::new(SqliteAdapter::from_pool(pool));
        let host = QueryHost::start(adapter, EventBus::new(16), 8);
        let mut events = host.events().subscribe();

        let mut query = TrackMetadataQuery::new();
        query.request_fields(["comment"]);
        query.request_track(Track::new(TrackId(1)));
        host.submit(query).await.unwrap();

        loop {
            if let CoreEvent::Query(QueryEvent::Failed { recoverable, .. }) =
                events.recv().await.unwrap()
            {
                assert!(recoverable);
                break;
            }
        }

        host.shutdown().await;
    }
}
