//! Data models for the scan workflow

mod scan_session;

pub use scan_session::{ScanOutcome, ScanSession, ScanState, StateTransition};
