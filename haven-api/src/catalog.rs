use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use haven_catalog::{OfferingType, TimeSlot};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub offering_type_id: Option<Uuid>,
    /// Only slots that have not ended at this instant (defaults to now).
    pub from: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct SlotAvailability {
    #[serde(flatten)]
    pub slot: TimeSlot,
    pub remaining_capacity: i32,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/offering-types", get(list_offering_types))
        .route("/v1/slots", get(list_slots))
}

async fn list_offering_types(State(state): State<AppState>) -> Result<Json<Vec<OfferingType>>, AppError> {
    Ok(Json(state.store.list_offering_types().await?))
}

async fn list_slots(
    State(state): State<AppState>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Vec<SlotAvailability>>, AppError> {
    let (slots, types) = tokio::try_join!(state.store.list_time_slots(), state.store.list_offering_types())?;
    let capacity: HashMap<Uuid, i32> = types.iter().map(|t| (t.id, t.max_participants)).collect();
    let from = query.from.unwrap_or_else(Utc::now);

    let available = slots
        .into_iter()
        .filter(|s| query.offering_type_id.map_or(true, |id| s.offering_type_id == id))
        .filter(|s| !s.has_ended(from))
        .filter_map(|slot| {
            let max = *capacity.get(&slot.offering_type_id)?;
            Some(SlotAvailability {
                remaining_capacity: slot.remaining_capacity(max),
                slot,
            })
        })
        .collect();

    Ok(Json(available))
}
