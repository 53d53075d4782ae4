//! HTTP API handlers for shelfaware-ui
//!
//! The API layer is a pure function of workflow state: handlers read or
//! nudge the scan engine and the row-store, and render snapshots.

pub mod health;
pub mod products;
pub mod scan;
pub mod sse;

pub use health::health_routes;
pub use products::product_routes;
pub use scan::scan_routes;
pub use sse::event_stream;
