use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    routing::post,
    Router,
};
use chrono::Utc;
use haven_booking::Partitioned;
use haven_core::Booking;
use haven_shared::models::SlotAvailabilityEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::error::AppError;
use crate::middleware::{customer_auth_middleware, CustomerClaims};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub time_slot_id: Uuid,
    pub offering_type_id: Uuid,
}

#[derive(Debug, Serialize)]
struct BookingResponse {
    success: bool,
    booking: Booking,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_my_bookings))
        .route_layer(axum::middleware::from_fn_with_state(state, customer_auth_middleware))
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let result = state
        .transactor
        .create_booking(&claims.sub, req.time_slot_id, req.offering_type_id)
        .await;
    state.metrics.record_booking(result.as_ref().map(|_| ()));
    let booking = result?;

    publish_availability(&state, booking.time_slot_id, booking.offering_type_id).await;

    Ok((StatusCode::CREATED, Json(BookingResponse { success: true, booking })))
}

async fn list_my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
) -> Result<Json<Partitioned>, AppError> {
    let views = state.projections.for_user(&claims.sub, Utc::now()).await?;
    Ok(Json(views))
}

/// Best effort: only runs when someone is listening, and a failed read just
/// skips the update.
async fn publish_availability(state: &AppState, time_slot_id: Uuid, offering_type_id: Uuid) {
    if state.sse_tx.receiver_count() == 0 {
        return;
    }

    let snapshot = tokio::try_join!(
        state.store.get_time_slot(time_slot_id),
        state.store.get_offering_type(offering_type_id),
    );
    if let Ok((Some(slot), Some(offering_type))) = snapshot {
        let event = SlotAvailabilityEvent {
            time_slot_id,
            offering_type_id,
            booked_participants_count: slot.value.booked_participants_count,
            max_participants: offering_type.value.max_participants,
            changed_at: Utc::now(),
        };
        tracing::debug!(time_slot_id = %time_slot_id, remaining = event.remaining_seats(), "Publishing slot availability");
        let _ = state.sse_tx.send(event);
    }
}
