use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Published after a committed booking so live listeners can refresh a slot's
/// remaining seats without re-reading the store.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct SlotAvailabilityEvent {
    pub time_slot_id: Uuid,
    pub offering_type_id: Uuid,
    pub booked_participants_count: i32,
    pub max_participants: i32,
    pub changed_at: DateTime<Utc>,
}

impl SlotAvailabilityEvent {
    pub fn remaining_seats(&self) -> i32 {
        (self.max_participants - self.booked_participants_count).max(0)
    }
}
