use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::StreamExt;

use crate::middleware::ActingUser;
use crate::startup::AppState;

/// Server-sent events feed of store changes. Each event is named after the
/// changed collection (`collections`, `ledger`, ...) and carries the
/// [`ChangeEvent`](crate::services::ChangeEvent) as JSON.
pub async fn stream_changes(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    tracing::info!(uid = %user.uid, "Change feed subscribed");

    let stream = BroadcastStream::new(state.store.subscribe()).filter_map(|message| match message {
        Ok(change) => Some(Event::default().event(change.collection.name()).json_data(&change)),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "Change feed subscriber lagged");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
