use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use haven_booking::BookingView;
use haven_catalog::{LocalizedText, OfferingType, SessionModel, SlotSeries};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::error::AppError;
use crate::middleware::admin_auth_middleware;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OfferingTypeRequest {
    #[serde(default)]
    pub name: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    pub session_model: SessionModel,
    pub max_participants: i32,
    pub price_minor: i32,
    pub currency: String,
}

impl OfferingTypeRequest {
    fn into_offering_type(self, id: Uuid) -> OfferingType {
        OfferingType {
            id,
            name: self.name,
            description: self.description,
            session_model: self.session_model,
            max_participants: self.max_participants,
            price_minor: self.price_minor,
            currency: self.currency,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateSlotsResponse {
    pub slot_ids: Vec<Uuid>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/admin/slots", post(create_slots))
        .route("/v1/admin/slots/{id}", axum::routing::delete(delete_slot))
        .route("/v1/admin/offering-types/{id}", put(put_offering_type).delete(delete_offering_type))
        .route("/v1/admin/bookings/today", get(bookings_today))
        .route("/v1/admin/bookings/past", get(bookings_past))
        .route_layer(axum::middleware::from_fn_with_state(state, admin_auth_middleware))
}

// ============================================================================
// Slots
// ============================================================================

/// POST /v1/admin/slots
async fn create_slots(
    State(state): State<AppState>,
    Json(series): Json<SlotSeries>,
) -> Result<(StatusCode, Json<CreateSlotsResponse>), AppError> {
    let slot_ids = state.scheduler.create_slots(&series).await?;
    state.metrics.record_slots_created(slot_ids.len());
    Ok((StatusCode::CREATED, Json(CreateSlotsResponse { slot_ids })))
}

/// DELETE /v1/admin/slots/{id}
async fn delete_slot(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    state.scheduler.delete_slot(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Offering types
// ============================================================================

/// PUT /v1/admin/offering-types/{id}
async fn put_offering_type(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<OfferingTypeRequest>,
) -> Result<Json<OfferingType>, AppError> {
    let offering_type = req.into_offering_type(id);
    state.scheduler.put_offering_type(&offering_type).await?;
    Ok(Json(offering_type))
}

/// DELETE /v1/admin/offering-types/{id}
async fn delete_offering_type(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    state.scheduler.delete_offering_type(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Bookings
// ============================================================================

/// GET /v1/admin/bookings/today
async fn bookings_today(State(state): State<AppState>) -> Result<Json<Vec<BookingView>>, AppError> {
    let views = state.projections.for_admin_day(Utc::now().date_naive()).await?;
    Ok(Json(views))
}

/// GET /v1/admin/bookings/past
async fn bookings_past(State(state): State<AppState>) -> Result<Json<Vec<BookingView>>, AppError> {
    let views = state.projections.for_admin_past(Utc::now()).await?;
    Ok(Json(views))
}
