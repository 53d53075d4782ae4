//! SSE endpoint forwarding scan workflow events to connected UIs

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

/// GET /events
///
/// Stream of scan workflow events (start, detection, resolution, failures,
/// points awards) rendered as SSE.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    shelfaware_common::sse::event_sse_stream(&state.bus, "shelfaware-ui")
}
