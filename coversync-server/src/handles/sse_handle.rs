use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use futures::stream::{self, Stream, StreamExt};
use tokio::time::{Instant, interval_at};
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};

use crate::services::LiveUpdates;

pub const REFRESH_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct SseState {
    pub live_updates: Arc<LiveUpdates>,
}

enum Update {
    Pushed(String),
    Refresh,
}

/// Streams the full actor state: once on connect, on every broadcast and every
/// [`REFRESH_INTERVAL`]. The stream ends when the live updates shut down.
#[utoipa::path(
    get,
    path = "/api/events",
    tag = "event",
    responses(
        (status = 200, description = "Server-sent stream of actor state arrays")
    )
)]
pub async fn sse_handler(
    State(state): State<SseState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.live_updates.subscribe();
    tracing::info!("SSE client connected, total clients: {}", state.live_updates.client_count());

    let pushed = BroadcastStream::new(receiver).filter_map(|result| async move {
        match result {
            Ok(message) => Some(Update::Pushed(message)),
            Err(e) => {
                tracing::debug!("SSE client lagging: {}", e);
                None
            }
        }
    });
    let first_refresh = Instant::now() + REFRESH_INTERVAL;
    let refresh = IntervalStream::new(interval_at(first_refresh, REFRESH_INTERVAL))
        .map(|_| Update::Refresh);
    let closed = state.live_updates.closed();

    let live_updates = state.live_updates;
    let stream = stream::once(async { Update::Refresh })
        .chain(stream::select(pushed, refresh))
        .then(move |update| {
            let live_updates = live_updates.clone();
            async move {
                match update {
                    Update::Pushed(message) => Some(message),
                    Update::Refresh => match live_updates.current_state().await {
                        Ok(message) => Some(message),
                        Err(e) => {
                            tracing::error!("Failed to serialize actor state: {}", e);
                            None
                        }
                    },
                }
            }
        })
        .filter_map(|message| async move { message.map(|data| Ok(Event::default().data(data))) })
        .take_until(closed);

    Sse::new(stream).keep_alive(KeepAlive::default())
}
