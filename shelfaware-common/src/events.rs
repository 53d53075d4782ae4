//! Event types for the Shelf Aware event system
//!
//! Scan workflow progress is broadcast via [`EventBus`] and serialized for
//! SSE transmission to connected UIs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Scan workflow events
///
/// Emitted by the scan engine as a session moves through its lifecycle and
/// by the points handlers when a reward is granted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScanEvent {
    /// A capture session started and the status poll began
    ScanStarted {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// The status poll returned a non-null detection
    DetectionFound {
        session_id: Uuid,
        detected_text: String,
        timestamp: DateTime<Utc>,
    },

    /// Detection resolved to product data; session returned to idle
    ScanResolved {
        session_id: Uuid,
        detected_text: String,
        /// Number of product rows fetched from the row-store
        product_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Capture stopped without a resolution
    ScanStopped {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A network call failed or the backend reported an error
    ScanFailed {
        session_id: Uuid,
        message: String,
        /// Consecutive failed start attempts so far
        attempts: u32,
        timestamp: DateTime<Utc>,
    },

    /// The visual stream dropped; a fresh stream token was issued
    StreamInterrupted {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Reward points were granted for a comparison action
    PointsAwarded {
        delta: i64,
        total: i64,
        timestamp: DateTime<Utc>,
    },
}

impl ScanEvent {
    /// Event name used for the SSE `event:` field
    pub fn name(&self) -> &'static str {
        match self {
            ScanEvent::ScanStarted { .. } => "ScanStarted",
            ScanEvent::DetectionFound { .. } => "DetectionFound",
            ScanEvent::ScanResolved { .. } => "ScanResolved",
            ScanEvent::ScanStopped { .. } => "ScanStopped",
            ScanEvent::ScanFailed { .. } => "ScanFailed",
            ScanEvent::StreamInterrupted { .. } => "StreamInterrupted",
            ScanEvent::PointsAwarded { .. } => "PointsAwarded",
        }
    }
}

/// Broadcast bus for [`ScanEvent`]s
///
/// Thin wrapper over `tokio::sync::broadcast`. Emitting with no subscribers
/// is not an error; events are simply dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ScanEvent>,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all current subscribers (fire-and-forget)
    pub fn emit(&self, event: ScanEvent) {
        // send only fails when there are no receivers, which is fine
        let _ = self.tx.send(event);
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}
