use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::{CatalogError, CatalogResult};

/// One concrete bookable interval of an offering type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSlot {
    pub id: Uuid,
    pub offering_type_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub booked_participants_count: i32,
}

impl TimeSlot {
    /// New empty slot. Fails unless `start_time < end_time`.
    pub fn new(offering_type_id: Uuid, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> CatalogResult<Self> {
        if start_time >= end_time {
            return Err(CatalogError::Validation(format!(
                "slot must end after it starts ({} >= {})",
                start_time.to_rfc3339(),
                end_time.to_rfc3339()
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            offering_type_id,
            start_time,
            end_time,
            booked_participants_count: 0,
        })
    }

    /// Seats left against the offering type's current capacity.
    pub fn remaining_capacity(&self, max_participants: i32) -> i32 {
        (max_participants - self.booked_participants_count).max(0)
    }

    pub fn is_full(&self, max_participants: i32) -> bool {
        self.booked_participants_count >= max_participants
    }

    /// Whether the session is over at `now`.
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end_time <= now
    }
}
