use chrono::{DateTime, NaiveDate, Utc};
use haven_catalog::{OfferingType, TimeSlot};
use haven_core::{Booking, SlotStore, StoreError};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// A booking joined with the slot and offering type it points at.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub time_slot: TimeSlot,
    pub offering_type: OfferingType,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Partitioned {
    pub upcoming: Vec<BookingView>,
    pub past: Vec<BookingView>,
}

/// Join bookings with their slots and offering types. Bookings whose slot or
/// type no longer exists are left out.
pub fn merge_bookings(bookings: Vec<Booking>, slots: &[TimeSlot], offering_types: &[OfferingType]) -> Vec<BookingView> {
    let slots: HashMap<Uuid, &TimeSlot> = slots.iter().map(|s| (s.id, s)).collect();
    let types: HashMap<Uuid, &OfferingType> = offering_types.iter().map(|t| (t.id, t)).collect();

    bookings
        .into_iter()
        .filter_map(|booking| {
            let slot = slots.get(&booking.time_slot_id);
            let offering_type = types.get(&booking.offering_type_id);
            match (slot, offering_type) {
                (Some(slot), Some(offering_type)) => Some(BookingView {
                    time_slot: (*slot).clone(),
                    offering_type: (*offering_type).clone(),
                    booking,
                }),
                _ => {
                    debug!(booking_id = %booking.id, "Dropping orphaned booking from projection");
                    None
                }
            }
        })
        .collect()
}

/// Split on slot end: a session still running counts as upcoming.
pub fn partition_by_time(views: Vec<BookingView>, now: DateTime<Utc>) -> Partitioned {
    let (mut upcoming, mut past): (Vec<_>, Vec<_>) =
        views.into_iter().partition(|v| !v.time_slot.has_ended(now));

    upcoming.sort_by_key(|v| v.time_slot.start_time);
    past.sort_by(|a, b| b.time_slot.start_time.cmp(&a.time_slot.start_time));

    Partitioned { upcoming, past }
}

/// Views whose slot starts on `day` (UTC), earliest first.
pub fn bookings_on_day(views: Vec<BookingView>, day: NaiveDate) -> Vec<BookingView> {
    let mut on_day: Vec<BookingView> = views
        .into_iter()
        .filter(|v| v.time_slot.start_time.date_naive() == day)
        .collect();
    on_day.sort_by_key(|v| v.time_slot.start_time);
    on_day
}

/// Read side used by the customer and admin booking lists.
#[derive(Clone)]
pub struct ProjectionService {
    store: Arc<dyn SlotStore>,
}

impl ProjectionService {
    pub fn new(store: Arc<dyn SlotStore>) -> Self {
        Self { store }
    }

    pub async fn for_user(&self, user_id: &str, now: DateTime<Utc>) -> Result<Partitioned, StoreError> {
        let (bookings, slots, types) = tokio::try_join!(
            self.store.list_bookings_for_user(user_id),
            self.store.list_time_slots(),
            self.store.list_offering_types(),
        )?;
        Ok(partition_by_time(merge_bookings(bookings, &slots, &types), now))
    }

    pub async fn for_admin_day(&self, day: NaiveDate) -> Result<Vec<BookingView>, StoreError> {
        Ok(bookings_on_day(self.load_all().await?, day))
    }

    /// Every booking whose session has ended, most recent first.
    pub async fn for_admin_past(&self, now: DateTime<Utc>) -> Result<Vec<BookingView>, StoreError> {
        Ok(partition_by_time(self.load_all().await?, now).past)
    }

    async fn load_all(&self) -> Result<Vec<BookingView>, StoreError> {
        let (bookings, slots, types) = tokio::try_join!(
            self.store.list_bookings(),
            self.store.list_time_slots(),
            self.store.list_offering_types(),
        )?;
        Ok(merge_bookings(bookings, &slots, &types))
    }
}
