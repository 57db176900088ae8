//! Event types for the MATCAT event system
//!
//! Provides shared event definitions and EventBus for all MATCAT services.
//! Events are broadcast via EventBus and can be serialized for SSE transmission.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// MATCAT catalog event types
///
/// All ingestion-pipeline notifications use this central enum for type safety
/// and exhaustive matching. Submission states are carried as their snake_case
/// wire form so subscribers do not need the ingest service's model types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CatalogEvent {
    /// Submission moved between ledger states
    SubmissionStateChanged {
        submission_id: Uuid,
        old_state: String,
        new_state: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Candidate batch attached to a submission
    CandidatesAccepted {
        submission_id: Uuid,
        accepted: usize,
        /// Candidates dropped by validation (missing required fields)
        skipped: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Resolution session opened
    SessionOpened {
        session_id: Uuid,
        submission_id: Option<Uuid>,
        candidate_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Resolution session completed and its decisions committed
    SessionCompleted {
        session_id: Uuid,
        created: usize,
        linked: usize,
        enqueued: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Resolution session abandoned with no catalog side effects
    SessionCancelled {
        session_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Entity placed in the approval queue
    PendingEnqueued {
        pending_id: Uuid,
        submission_id: Option<Uuid>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Pending entity approved; canonical entity created
    PendingApproved {
        pending_id: Uuid,
        entity_id: Uuid,
        reviewer_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Pending entity rejected (terminal, no canonical record)
    PendingRejected {
        pending_id: Uuid,
        reviewer_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Project association created (duplicates are absorbed, not re-announced)
    AssociationCreated {
        project_id: Uuid,
        entity_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// All children of a submission left the pending state
    SubmissionCompleted {
        submission_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Storage failure during an approval commit (retryable)
    CommitFailed {
        pending_id: Uuid,
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl CatalogEvent {
    /// Event type name for SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SubmissionStateChanged { .. } => "SubmissionStateChanged",
            Self::CandidatesAccepted { .. } => "CandidatesAccepted",
            Self::SessionOpened { .. } => "SessionOpened",
            Self::SessionCompleted { .. } => "SessionCompleted",
            Self::SessionCancelled { .. } => "SessionCancelled",
            Self::PendingEnqueued { .. } => "PendingEnqueued",
            Self::PendingApproved { .. } => "PendingApproved",
            Self::PendingRejected { .. } => "PendingRejected",
            Self::AssociationCreated { .. } => "AssociationCreated",
            Self::SubmissionCompleted { .. } => "SubmissionCompleted",
            Self::CommitFailed { .. } => "CommitFailed",
        }
    }
}

/// Broadcast bus for catalog events
///
/// Wraps a tokio broadcast channel. Emitting with no subscribers is not an
/// error worth propagating; callers use `.ok()` on the result.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CatalogEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Returns a receiver that will receive all events emitted after
    /// subscription. Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if no subscribers are listening.
    pub fn emit(&self, event: CatalogEvent) -> Result<usize, broadcast::error::SendError<CatalogEvent>> {
        self.tx.send(event)
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_reaches_subscriber() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(CatalogEvent::SubmissionCompleted {
            submission_id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
        })
        .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "SubmissionCompleted");
    }

    #[test]
    fn emit_without_subscribers_is_err() {
        let bus = EventBus::new(16);
        let result = bus.emit(CatalogEvent::SessionCancelled {
            session_id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
        });
        assert!(result.is_err());
    }
}
