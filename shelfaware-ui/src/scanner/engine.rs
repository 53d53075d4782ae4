//! Scan workflow engine
//!
//! Drives a capture session from idle to "result obtained" through repeated
//! status polling. States: IDLE → STARTING → STREAMING → RESOLVING → IDLE,
//! with ERROR reachable from any network call's failure. After an error the
//! engine retries the start automatically up to a fixed attempt ceiling;
//! beyond it, an explicit reset is required.
//!
//! Concurrency model: the poll loop is a spawned task cancelled via
//! `CancellationToken` on every exit from STREAMING. In-flight requests are
//! not aborted; a response arriving after the session has moved on is
//! discarded by checking the session id before any state mutation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::BoxFuture;
use tokio::sync::{Mutex, RwLock};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shelfaware_common::{Error, EventBus, Result, ScanEvent};

use crate::models::{ScanOutcome, ScanSession, ScanState};
use crate::store::{ProductRecord, RowStore};
use crate::vision::VisionBackend;

/// Surfaced when the backend stops processing without finding anything
pub const NO_DETECTION_MESSAGE: &str = "No brands detected. Please try again.";

/// Transient notice shown while a dropped visual stream reconnects
const STREAM_RETRY_NOTICE: &str = "Video stream connection lost. Retrying...";

/// Detection-polling workflow engine
///
/// A cheap-to-clone handle over shared state; clones share the same
/// session. The vision backend and row-store are injected as trait objects
/// so tests substitute fakes.
#[derive(Clone)]
pub struct ScanEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    vision: Arc<dyn VisionBackend>,
    store: Arc<dyn RowStore>,
    bus: EventBus,
    session: RwLock<ScanSession>,
    outcome: RwLock<Option<ScanOutcome>>,
    /// Cancellation token of the live poll loop, if any
    poll_cancel: Mutex<Option<CancellationToken>>,
    poll_interval: Duration,
    max_attempts: u32,
}

impl ScanEngine {
    /// Create an idle engine
    pub fn new(
        vision: Arc<dyn VisionBackend>,
        store: Arc<dyn RowStore>,
        bus: EventBus,
        poll_interval: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                vision,
                store,
                bus,
                session: RwLock::new(ScanSession::new()),
                outcome: RwLock::new(None),
                poll_cancel: Mutex::new(None),
                poll_interval,
                max_attempts,
            }),
        }
    }

    /// Begin a capture session
    ///
    /// Errors when a session is already active or the attempt ceiling has
    /// been reached (reset required). A start rejection or transport failure
    /// does not error here; it lands the session in the ERROR state with the
    /// message surfaced in the snapshot, and schedules an automatic retry
    /// while attempts remain.
    pub async fn start(&self) -> Result<ScanSession> {
        let session_id = {
            let mut session = self.inner.session.write().await;
            if session.state.is_active() {
                return Err(Error::Conflict(
                    "A scan session is already active".to_string(),
                ));
            }
            if session.attempts >= self.inner.max_attempts {
                return Err(Error::InvalidInput(
                    "Maximum attempts reached. Reset the scanner to try again.".to_string(),
                ));
            }
            session.begin()
        };

        self.attempt_start(session_id).await;
        Ok(self.snapshot().await)
    }

    /// Stop the capture session
    ///
    /// The stop call is issued even when already idle (a known redundancy of
    /// the workflow, preserved deliberately). Always lands in IDLE; a stop
    /// transport failure is recorded in the error slot, never raised.
    pub async fn stop(&self) -> ScanSession {
        self.cancel_poll().await;

        // leave STREAMING before awaiting the network stop: an in-flight
        // status response must fail the session guard instead of launching
        // a resolution after the user stopped
        let session_id = {
            let mut session = self.inner.session.write().await;
            session.transition_to(ScanState::Idle);
            session.stream_notice = None;
            session.session_id
        };

        if let Err(e) = self.inner.vision.stop_capture().await {
            warn!(error = %e, "Stop call failed; staying idle");
            let mut session = self.inner.session.write().await;
            if session.session_id == session_id {
                session.last_error = Some(e.to_string());
            }
        }

        self.inner.bus.emit(ScanEvent::ScanStopped {
            session_id,
            timestamp: Utc::now(),
        });
        self.snapshot().await
    }

    /// Explicit user-triggered reset: clears the attempt counter and any
    /// accumulated results, returning a fresh idle session
    pub async fn reset(&self) -> ScanSession {
        self.cancel_poll().await;

        {
            let mut session = self.inner.session.write().await;
            *session = ScanSession::new();
        }
        *self.inner.outcome.write().await = None;

        info!("Scanner reset; attempt counter and results cleared");
        self.snapshot().await
    }

    /// Connection-loss callback for the visual stream
    ///
    /// Regenerates the stream token so the media element binds a distinct
    /// resource, and surfaces a transient "retrying" notice. The logical
    /// state machine does not change.
    pub async fn stream_interrupted(&self) -> ScanSession {
        let interrupted = {
            let mut session = self.inner.session.write().await;
            if session.state.is_active() {
                session.rotate_stream_token();
                session.stream_notice = Some(STREAM_RETRY_NOTICE.to_string());
                Some(session.session_id)
            } else {
                None
            }
        };

        if let Some(session_id) = interrupted {
            warn!(%session_id, "Visual stream interrupted; issued fresh stream token");
            self.inner.bus.emit(ScanEvent::StreamInterrupted {
                session_id,
                timestamp: Utc::now(),
            });
        }
        self.snapshot().await
    }

    /// Snapshot of the current session state
    pub async fn snapshot(&self) -> ScanSession {
        self.inner.session.read().await.clone()
    }

    /// The most recently resolved scan outcome, if any
    pub async fn outcome(&self) -> Option<ScanOutcome> {
        self.inner.outcome.read().await.clone()
    }

    /// Visual stream URL for the given session token
    pub fn stream_url(&self, token: Uuid) -> String {
        self.inner.vision.stream_url(token)
    }

    /// Configured automatic start-retry ceiling
    pub fn max_attempts(&self) -> u32 {
        self.inner.max_attempts
    }

    /// Issue the start call and, on acknowledgement, enter STREAMING and
    /// spawn the status poll loop
    async fn attempt_start(&self, session_id: Uuid) {
        match self.inner.vision.start_capture().await {
            Ok(()) => {
                {
                    let mut session = self.inner.session.write().await;
                    // stop()/reset() may have won the race while the start
                    // call was in flight
                    if session.session_id != session_id || session.state != ScanState::Starting {
                        debug!(%session_id, "Start acknowledged after session moved on; discarding");
                        return;
                    }
                    session.transition_to(ScanState::Streaming);
                }

                let cancel = CancellationToken::new();
                {
                    let mut guard = self.inner.poll_cancel.lock().await;
                    if let Some(old) = guard.replace(cancel.clone()) {
                        old.cancel();
                    }
                }

                info!(%session_id, "Capture started; polling for detection");
                self.inner.bus.emit(ScanEvent::ScanStarted {
                    session_id,
                    timestamp: Utc::now(),
                });

                let engine = self.clone();
                tokio::spawn(async move {
                    engine.poll_loop(session_id, cancel).await;
                });
            }
            Err(e) => {
                self.handle_failure(session_id, e.to_string()).await;
            }
        }
    }

    /// Fixed-interval status poll, active only while STREAMING
    ///
    /// The first tick fires one full period after start, matching the
    /// original timer behavior.
    async fn poll_loop(&self, session_id: Uuid, cancel: CancellationToken) {
        let first_tick = tokio::time::Instant::now() + self.inner.poll_interval;
        let mut ticker = tokio::time::interval_at(first_tick, self.inner.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(%session_id, "Status poll started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(%session_id, "Status poll cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    if !self.is_streaming(session_id).await {
                        debug!(%session_id, "Session moved on; stopping poll");
                        break;
                    }

                    match self.inner.vision.status().await {
                        Ok(status) => {
                            // a response arriving after the session moved on
                            // must be discarded, not applied
                            if !self.is_streaming(session_id).await {
                                debug!(%session_id, "Discarding stale status response");
                                break;
                            }

                            match status.detected_text {
                                Some(text) if !text.is_empty() => {
                                    self.resolve_detection(session_id, text).await;
                                    break;
                                }
                                _ if !status.processing => {
                                    // backend finished without a detection
                                    self.handle_failure(
                                        session_id,
                                        NO_DETECTION_MESSAGE.to_string(),
                                    )
                                    .await;
                                    break;
                                }
                                _ => {
                                    // still processing, nothing detected yet
                                }
                            }
                        }
                        Err(e) => {
                            self.handle_failure(session_id, e.to_string()).await;
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn is_streaming(&self, session_id: Uuid) -> bool {
        let session = self.inner.session.read().await;
        session.session_id == session_id && session.state == ScanState::Streaming
    }

    /// A detection arrived: cancel the timer, then chain the stop call, the
    /// result-processing call, and the product row fetch, in that order
    async fn resolve_detection(&self, session_id: Uuid, text: String) {
        {
            let mut session = self.inner.session.write().await;
            if session.session_id != session_id || session.state != ScanState::Streaming {
                return;
            }
            session.transition_to(ScanState::Resolving);
        }
        self.cancel_poll().await;

        info!(%session_id, detected_text = %text, "Detection found; resolving");
        self.inner.bus.emit(ScanEvent::DetectionFound {
            session_id,
            detected_text: text.clone(),
            timestamp: Utc::now(),
        });

        match self.resolve(&text).await {
            Ok(products) => {
                let product_count = products.len();
                {
                    let mut session = self.inner.session.write().await;
                    // stop()/reset() may have moved the session on while the
                    // resolution chain was in flight; the result must be
                    // discarded, not published
                    if session.session_id != session_id || session.state != ScanState::Resolving {
                        debug!(%session_id, "Discarding stale resolution");
                        return;
                    }
                    *self.inner.outcome.write().await = Some(ScanOutcome {
                        session_id,
                        detected_text: text.clone(),
                        products,
                        resolved_at: Utc::now(),
                    });
                    session.transition_to(ScanState::Idle);
                    session.detected_text = Some(text.clone());
                    session.attempts = 0;
                }

                info!(%session_id, products = product_count, "Scan resolved");
                self.inner.bus.emit(ScanEvent::ScanResolved {
                    session_id,
                    detected_text: text,
                    product_count,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                self.handle_failure(session_id, e.to_string()).await;
            }
        }
    }

    /// The downstream resolution chain
    async fn resolve(&self, _detected_text: &str) -> Result<Vec<ProductRecord>> {
        self.inner.vision.stop_capture().await?;
        self.inner.vision.process_results().await?;
        self.inner.store.fetch_products().await
    }

    /// Map a failure onto the ERROR state and schedule an automatic retry
    /// while attempts remain below the ceiling
    async fn handle_failure(&self, session_id: Uuid, message: String) {
        self.cancel_poll().await;

        let attempts = {
            let mut session = self.inner.session.write().await;
            if session.session_id != session_id || !session.state.is_active() {
                debug!(%session_id, "Discarding stale failure");
                return;
            }
            session.transition_to(ScanState::Error);
            session.last_error = Some(message.clone());
            session.attempts += 1;
            session.attempts
        };

        warn!(%session_id, attempts, error = %message, "Scan failed");
        self.inner.bus.emit(ScanEvent::ScanFailed {
            session_id,
            message,
            attempts,
            timestamp: Utc::now(),
        });

        if attempts < self.inner.max_attempts {
            info!(attempts, max_attempts = self.inner.max_attempts, "Retrying scan start");
            tokio::spawn(self.restart());
        } else {
            warn!(
                max_attempts = self.inner.max_attempts,
                "Maximum attempts reached; explicit reset required"
            );
        }
    }

    /// Automatic retry after a failure
    ///
    /// Boxed to break the async type cycle with `attempt_start`. Aborts if
    /// the user stopped or reset the session in the meantime.
    fn restart(&self) -> BoxFuture<'static, ()> {
        let engine = self.clone();
        Box::pin(async move {
            let session_id = {
                let mut session = engine.inner.session.write().await;
                if session.state != ScanState::Error {
                    debug!("Session no longer in error state; skipping automatic retry");
                    return;
                }
                session.begin()
            };
            engine.attempt_start(session_id).await;
        })
    }

    /// Cancel the live poll loop, if any
    async fn cancel_poll(&self) {
        if let Some(token) = self.inner.poll_cancel.lock().await.take() {
            token.cancel();
        }
    }
}
