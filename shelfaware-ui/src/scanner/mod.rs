//! Detection-polling workflow
//!
//! Owns the lifecycle of "start capture → poll for a detection → resolve to
//! product data → surface to the UI", including start/stop idempotence,
//! bounded automatic retries, and error-to-retry transitions.

mod engine;

pub use engine::{ScanEngine, NO_DETECTION_MESSAGE};
