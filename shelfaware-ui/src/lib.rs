//! shelfaware-ui library interface
//!
//! Front-end service for the Shelf Aware product scanner: owns the
//! detection-polling workflow, the vision backend and row-store clients,
//! and the HTTP API the browser UI talks to.

pub mod api;
pub mod error;
pub mod models;
pub mod scanner;
pub mod store;
pub mod vision;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use shelfaware_common::EventBus;

use crate::scanner::ScanEngine;
use crate::store::RowStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Detection-polling workflow engine (cheap-to-clone handle)
    pub engine: ScanEngine,
    /// Row-store client for points and coupon reads outside the workflow
    pub store: Arc<dyn RowStore>,
    /// Event bus for SSE broadcasting
    pub bus: EventBus,
    /// Points granted per qualifying comparison action
    pub reward_points: i64,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        engine: ScanEngine,
        store: Arc<dyn RowStore>,
        bus: EventBus,
        reward_points: i64,
    ) -> Self {
        Self {
            engine,
            store,
            bus,
            reward_points,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;
    use tower_http::{cors::CorsLayer, trace::TraceLayer};

    Router::new()
        .merge(api::scan_routes())
        .merge(api::product_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
