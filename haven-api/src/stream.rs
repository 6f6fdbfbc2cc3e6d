use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;
use crate::middleware::customer_auth_middleware;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/slots/{id}/stream", get(slot_stream))
        .route_layer(axum::middleware::from_fn_with_state(state, customer_auth_middleware))
}

/// Live seat counts for one slot. Lagging subscribers skip missed updates.
async fn slot_stream(
    State(state): State<AppState>,
    Path(time_slot_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let rx = state.sse_tx.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) if event.time_slot_id == time_slot_id => {
                Some(Event::default().event("slot_availability").json_data(&event))
            }
            _ => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
