//! Server-Sent Events (SSE) utilities
//!
//! Bridges an [`EventBus`] subscription into an axum SSE response so
//! connected UIs receive scan workflow events as they happen.

use crate::events::EventBus;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Create an SSE stream that forwards all events from the bus
///
/// Sends an initial `ConnectionStatus: connected` event, then forwards every
/// broadcast event as JSON. Lagged subscribers skip dropped events rather
/// than disconnecting.
pub fn event_sse_stream(
    bus: &EventBus,
    service_name: &'static str,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to {} events", service_name);

    let mut rx = bus.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => {
                        debug!(event = event.name(), "SSE: forwarding event");
                        yield Ok(Event::default().event(event.name()).data(json));
                    }
                    Err(e) => {
                        warn!("SSE: failed to serialize event: {}", e);
                    }
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("SSE: subscriber lagged, {} events skipped", skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    info!("SSE: {} event stream closed", service_name);
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
