//! # Event Bus System
//!
//! Decoupled communication between the query host and its observers using
//! `tokio::sync::broadcast`. The host publishes typed lifecycle events as
//! queries move through submit/execute/notify; any number of subscribers
//! listen independently.
//!
//! ```text
//! ┌─────────────┐     emit      ┌───────────┐
//! │ Query Host  ├──────────────>│           │
//! └─────────────┘               │ EventBus  │     subscribe    ┌────────────┐
//!                               │ (broadcast├─────────────────>│ Subscriber │
//! ┌─────────────┐     emit      │  channel) │                  └────────────┘
//! │ Worker Task ├──────────────>│           │     subscribe    ┌────────────┐
//! └─────────────┘               └───────────┘─────────────────>│ Subscriber │
//!                                                              └────────────┘
//! ```
//!
//! Note this bus carries *lifecycle* events (submitted/completed/failed).
//! The result payload of a query travels on the query's own completion
//! notification channel, not here. Event payloads stay lightweight because
//! they are cloned per subscriber.
//!
//! ## Error Handling
//!
//! `tokio::sync::broadcast` produces two receive errors:
//!
//! - **`RecvError::Lagged(n)`**: the subscriber was too slow and missed `n`
//!   events. Non-fatal; the subscriber keeps receiving new events.
//! - **`RecvError::Closed`**: all senders dropped. Treat as shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Query lifecycle events
    Query(QueryEvent),
    /// Host worker events
    Host(HostEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Query(e) => e.description(),
            CoreEvent::Host(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Query(QueryEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Query(QueryEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Host(HostEvent::WorkerStarted) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Query Events
// ============================================================================

/// Events emitted as a metadata query moves through its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum QueryEvent {
    /// Query accepted onto the worker queue.
    Submitted {
        /// Correlation id of the query.
        query_id: String,
        /// Number of tracks awaiting metadata.
        track_count: usize,
    },
    /// Query executed and callbacks delivered.
    Completed {
        /// Correlation id of the query.
        query_id: String,
        /// Number of tracks in the result set.
        track_count: usize,
        /// Wall-clock execution time in milliseconds.
        duration_ms: u64,
        /// Number of completion-notification subscribers reached.
        subscribers_notified: usize,
    },
    /// Query execution failed; the result set was left empty.
    Failed {
        /// Correlation id of the query.
        query_id: String,
        /// Human-readable error message.
        message: String,
        /// Whether resubmitting a copy of the query may succeed.
        recoverable: bool,
    },
}

impl QueryEvent {
    fn description(&self) -> &str {
        match self {
            QueryEvent::Submitted { .. } => "Query submitted",
            QueryEvent::Completed { .. } => "Query completed",
            QueryEvent::Failed { .. } => "Query failed",
        }
    }
}

// ============================================================================
// Host Events
// ============================================================================

/// Events describing the query worker itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum HostEvent {
    /// Worker context is up and accepting queries.
    WorkerStarted,
    /// Worker context drained its queue and exited.
    WorkerStopped,
}

impl HostEvent {
    fn description(&self) -> &str {
        match self {
            HostEvent::WorkerStarted => "Query worker started",
            HostEvent::WorkerStopped => "Query worker stopped",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all
    /// future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with additional filtering
/// capabilities: a more ergonomic API for consumers that only care about
/// one event category.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n`
    /// events. Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }

            // Event didn't match filter, continue to next event
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }

                    // Event didn't match filter, continue
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn submitted(query_id: &str) -> CoreEvent {
        CoreEvent::Query(QueryEvent::Submitted {
            query_id: query_id.to_string(),
            track_count: 3,
        })
    }

    #[tokio::test]
    async fn event_bus_creation() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn event_bus_subscription() {
        let bus = EventBus::new(10);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn event_emission_no_subscribers() {
        let bus = EventBus::new(10);

        // Should error when no subscribers
        assert!(bus.emit(submitted("q-1")).is_err());
    }

    #[tokio::test]
    async fn event_emission_with_subscribers() {
        let bus = EventBus::new(10);
        let mut sub = bus.subscribe();

        let event = submitted("q-1");
        let result = bus.emit(event.clone());
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), 1);

        let received = sub.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Query(QueryEvent::Completed {
            query_id: "q-2".to_string(),
            track_count: 5,
            duration_ms: 12,
            subscribers_notified: 1,
        });
        bus.emit(event.clone()).ok();

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream =
            EventStream::new(bus.subscribe()).filter(|event| matches!(event, CoreEvent::Query(_)));

        // Host event should be filtered out
        bus.emit(CoreEvent::Host(HostEvent::WorkerStarted)).ok();

        // Query event should pass through
        let query_event = submitted("q-3");
        bus.emit(query_event.clone()).ok();

        let received = stream.recv().await.unwrap();
        assert_eq!(received, query_event);
    }

    #[tokio::test]
    async fn lagged_subscriber() {
        let bus = EventBus::new(2); // Very small buffer
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(submitted(&format!("q-{}", i))).ok();
        }

        // First recv should indicate lagging
        let result = sub.recv().await;
        assert!(matches!(result, Err(RecvError::Lagged(_))));
    }

    #[tokio::test]
    async fn event_severity() {
        let failed = CoreEvent::Query(QueryEvent::Failed {
            query_id: "q-4".to_string(),
            message: "engine exploded".to_string(),
            recoverable: true,
        });
        assert_eq!(failed.severity(), EventSeverity::Error);

        let completed = CoreEvent::Query(QueryEvent::Completed {
            query_id: "q-4".to_string(),
            track_count: 1,
            duration_ms: 3,
            subscribers_notified: 0,
        });
        assert_eq!(completed.severity(), EventSeverity::Info);

        assert_eq!(
            CoreEvent::Host(HostEvent::WorkerStopped).severity(),
            EventSeverity::Debug
        );
    }

    #[tokio::test]
    async fn event_description() {
        assert_eq!(submitted("q-5").description(), "Query submitted");
        assert_eq!(
            CoreEvent::Host(HostEvent::WorkerStarted).description(),
            "Query worker started"
        );
    }

    #[tokio::test]
    async fn event_serialization() {
        let event = CoreEvent::Query(QueryEvent::Failed {
            query_id: "q-6".to_string(),
            message: "no such table".to_string(),
            recoverable: false,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("q-6"));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[tokio::test]
    async fn try_recv_empty() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());

        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn try_recv_with_event() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());

        let event = submitted("q-7");
        bus.emit(event.clone()).ok();

        let received = stream.try_recv().unwrap().unwrap();
        assert_eq!(received, event);
    }
}
