//! Scan workflow state machine
//!
//! A capture session progresses IDLE → STARTING → STREAMING → RESOLVING →
//! IDLE, with ERROR reachable from any network call's failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::ProductRecord;

/// Scan workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScanState {
    /// No capture in progress
    Idle,
    /// Start request issued, awaiting acknowledgement
    Starting,
    /// Capture running, status poll active
    Streaming,
    /// Detection obtained, downstream calls in flight
    Resolving,
    /// A network call failed; retry or reset required
    Error,
}

impl ScanState {
    /// A session in one of these states owns the capture resource
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ScanState::Starting | ScanState::Streaming | ScanState::Resolving
        )
    }
}

/// State transition event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_state: ScanState,
    pub new_state: ScanState,
    pub transitioned_at: DateTime<Utc>,
}

/// Capture session (in-memory state)
///
/// At most one session owns the capture resource at a time. The stream
/// token is regenerated on every start so the media element treats each
/// session as a distinct resource and never reuses a broken connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSession {
    /// Unique session identifier, regenerated on every start
    pub session_id: Uuid,

    /// Token keying the visual stream resource
    pub stream_token: Uuid,

    /// Current workflow state
    pub state: ScanState,

    /// Consecutive failed start attempts (cleared on resolution or reset)
    pub attempts: u32,

    /// Session start time (None before the first start)
    pub started_at: Option<DateTime<Utc>>,

    /// Last user-visible error message
    pub last_error: Option<String>,

    /// Transient stream status ("retrying" notice after a stream drop)
    pub stream_notice: Option<String>,

    /// Text obtained from the most recent resolved detection
    pub detected_text: Option<String>,
}

impl ScanSession {
    /// Create a fresh idle session
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            stream_token: Uuid::new_v4(),
            state: ScanState::Idle,
            attempts: 0,
            started_at: None,
            last_error: None,
            stream_notice: None,
            detected_text: None,
        }
    }

    /// Begin a new capture: fresh identifiers, cleared errors, state STARTING
    ///
    /// The attempt counter is preserved; it only clears on resolution or an
    /// explicit reset.
    pub fn begin(&mut self) -> Uuid {
        self.session_id = Uuid::new_v4();
        self.stream_token = Uuid::new_v4();
        self.state = ScanState::Starting;
        self.started_at = Some(Utc::now());
        self.last_error = None;
        self.stream_notice = None;
        self.detected_text = None;
        self.session_id
    }

    /// Transition to a new state
    pub fn transition_to(&mut self, new_state: ScanState) -> StateTransition {
        let transition = StateTransition {
            session_id: self.session_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;
        transition
    }

    /// Issue a fresh stream token without changing the logical state
    ///
    /// Used when the visual stream drops mid-session.
    pub fn rotate_stream_token(&mut self) -> Uuid {
        self.stream_token = Uuid::new_v4();
        self.stream_token
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolved scan result: the detection plus the product rows it resolved to
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub session_id: Uuid,
    pub detected_text: String,
    pub products: Vec<ProductRecord>,
    pub resolved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_idle() {
        let session = ScanSession::new();
        assert_eq!(session.state, ScanState::Idle);
        assert_eq!(session.attempts, 0);
        assert!(session.detected_text.is_none());
        assert!(!session.state.is_active());
    }

    #[test]
    fn begin_regenerates_identifiers() {
        let mut session = ScanSession::new();
        let old_session_id = session.session_id;
        let old_stream_token = session.stream_token;
        session.last_error = Some("previous failure".to_string());

        session.begin();

        assert_ne!(session.session_id, old_session_id);
        assert_ne!(session.stream_token, old_stream_token);
        assert_eq!(session.state, ScanState::Starting);
        assert!(session.last_error.is_none());
        assert!(session.started_at.is_some());
    }

    #[test]
    fn begin_preserves_attempt_counter() {
        let mut session = ScanSession::new();
        session.attempts = 2;
        session.begin();
        assert_eq!(session.attempts, 2);
    }

    #[test]
    fn transition_records_old_and_new_state() {
        let mut session = ScanSession::new();
        session.begin();
        let transition = session.transition_to(ScanState::Streaming);
        assert_eq!(transition.old_state, ScanState::Starting);
        assert_eq!(transition.new_state, ScanState::Streaming);
        assert_eq!(session.state, ScanState::Streaming);
    }

    #[test]
    fn rotate_stream_token_keeps_state() {
        let mut session = ScanSession::new();
        session.begin();
        session.transition_to(ScanState::Streaming);
        let old_token = session.stream_token;

        let new_token = session.rotate_stream_token();

        assert_ne!(new_token, old_token);
        assert_eq!(session.state, ScanState::Streaming);
    }

    #[test]
    fn active_states() {
        assert!(ScanState::Starting.is_active());
        assert!(ScanState::Streaming.is_active());
        assert!(ScanState::Resolving.is_active());
        assert!(!ScanState::Idle.is_active());
        assert!(!ScanState::Error.is_active());
    }
}
