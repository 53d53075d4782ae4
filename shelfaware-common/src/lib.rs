//! # Shelf Aware Common Library
//!
//! Shared code for the Shelf Aware front-end service:
//! - Error types
//! - Event types (ScanEvent enum) and EventBus
//! - Configuration loading
//! - SSE utilities

pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
pub use events::{EventBus, ScanEvent};
