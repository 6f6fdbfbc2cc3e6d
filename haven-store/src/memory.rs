use async_trait::async_trait;
use chrono::Utc;
use haven_catalog::{OfferingType, TimeSlot};
use haven_core::{
    Booking, CommitOutcome, DeleteOutcome, NewBooking, SlotStore, StoreError, StoreResult,
    Versioned,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    offering_types: HashMap<Uuid, Versioned<OfferingType>>,
    time_slots: HashMap<Uuid, Versioned<TimeSlot>>,
    bookings: Vec<Booking>,
}

/// In-process `SlotStore`.
///
/// All collections sit behind one lock, so a conditional commit (version
/// check, counter increment, booking insert) happens under a single write
/// guard and is observed by readers either entirely or not at all.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Confirmed bookings referencing `time_slot_id`.
    pub async fn confirmed_count(&self, time_slot_id: Uuid) -> i64 {
        let state = self.state.read().await;
        count_confirmed(&state.bookings, time_slot_id)
    }
}

fn count_confirmed(bookings: &[Booking], time_slot_id: Uuid) -> i64 {
    bookings
        .iter()
        .filter(|b| b.time_slot_id == time_slot_id && b.is_confirmed())
        .count() as i64
}

#[async_trait]
impl SlotStore for MemoryStore {
    async fn get_offering_type(&self, id: Uuid) -> StoreResult<Option<Versioned<OfferingType>>> {
        Ok(self.state.read().await.offering_types.get(&id).cloned())
    }

    async fn get_time_slot(&self, id: Uuid) -> StoreResult<Option<Versioned<TimeSlot>>> {
        Ok(self.state.read().await.time_slots.get(&id).cloned())
    }

    async fn commit_booking(
        &self,
        slot: &Versioned<TimeSlot>,
        offering_type: &Versioned<OfferingType>,
        booking: NewBooking,
    ) -> StoreResult<CommitOutcome> {
        let mut state = self.state.write().await;

        let type_unchanged = state
            .offering_types
            .get(&offering_type.value.id)
            .is_some_and(|current| current.version == offering_type.version);
        if !type_unchanged {
            return Ok(CommitOutcome::Conflict);
        }

        let Some(current) = state.time_slots.get_mut(&slot.value.id) else {
            return Ok(CommitOutcome::Conflict);
        };
        if current.version != slot.version {
            return Ok(CommitOutcome::Conflict);
        }

        current.value.booked_participants_count += 1;
        current.version += 1;

        let committed = booking.into_booking(Utc::now());
        state.bookings.push(committed.clone());
        Ok(CommitOutcome::Committed(committed))
    }

    async fn insert_time_slots(&self, slots: &[TimeSlot]) -> StoreResult<()> {
        let mut state = self.state.write().await;

        // Validate the whole batch before touching anything
        for slot in slots {
            if state.time_slots.contains_key(&slot.id) {
                return Err(StoreError::Database(format!("time slot {} already exists", slot.id)));
            }
            if !state.offering_types.contains_key(&slot.offering_type_id) {
                return Err(StoreError::Database(format!(
                    "time slot {} references unknown offering type {}",
                    slot.id, slot.offering_type_id
                )));
            }
        }

        for slot in slots {
            state.time_slots.insert(slot.id, Versioned::new(slot.clone(), 0));
        }
        Ok(())
    }

    async fn delete_time_slot(&self, id: Uuid) -> StoreResult<DeleteOutcome> {
        let mut state = self.state.write().await;

        if !state.time_slots.contains_key(&id) {
            return Ok(DeleteOutcome::NotFound);
        }

        let count = count_confirmed(&state.bookings, id);
        if count > 0 {
            return Ok(DeleteOutcome::InUse { count });
        }

        state.time_slots.remove(&id);
        state.bookings.retain(|b| b.time_slot_id != id);
        Ok(DeleteOutcome::Deleted)
    }

    async fn put_offering_type(&self, offering_type: &OfferingType) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let version = state
            .offering_types
            .get(&offering_type.id)
            .map_or(0, |current| current.version + 1);
        state
            .offering_types
            .insert(offering_type.id, Versioned::new(offering_type.clone(), version));
        Ok(())
    }

    async fn delete_offering_type(&self, id: Uuid) -> StoreResult<DeleteOutcome> {
        let mut state = self.state.write().await;

        if !state.offering_types.contains_key(&id) {
            return Ok(DeleteOutcome::NotFound);
        }

        let count = state
            .time_slots
            .values()
            .filter(|s| s.value.offering_type_id == id)
            .count() as i64;
        if count > 0 {
            return Ok(DeleteOutcome::InUse { count });
        }

        state.offering_types.remove(&id);
        Ok(DeleteOutcome::Deleted)
    }

    async fn list_offering_types(&self) -> StoreResult<Vec<OfferingType>> {
        let state = self.state.read().await;
        let mut types: Vec<OfferingType> = state.offering_types.values().map(|v| v.value.clone()).collect();
        types.sort_by_key(|t| t.id);
        Ok(types)
    }

    async fn list_time_slots(&self) -> StoreResult<Vec<TimeSlot>> {
        let state = self.state.read().await;
        let mut slots: Vec<TimeSlot> = state.time_slots.values().map(|v| v.value.clone()).collect();
        slots.sort_by_key(|s| (s.start_time, s.id));
        Ok(slots)
    }

    async fn list_bookings(&self) -> StoreResult<Vec<Booking>> {
        Ok(self.state.read().await.bookings.clone())
    }

    async fn list_bookings_for_user(&self, user_id: &str) -> StoreResult<Vec<Booking>> {
        let state = self.state.read().await;
        Ok(state.bookings.iter().filter(|b| b.user_id == user_id).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use haven_catalog::SessionModel;
    use haven_core::BookingStatus;

    async fn seeded(max_participants: i32) -> (MemoryStore, OfferingType, TimeSlot) {
        let store = MemoryStore::new();
        let model = if max_participants == 1 { SessionModel::SingleOccupant } else { SessionModel::SmallGroup };
        let offering = OfferingType::new(model, max_participants, 6000, "EUR");
        store.put_offering_type(&offering).await.unwrap();

        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let slot = TimeSlot::new(offering.id, start, start + Duration::hours(1)).unwrap();
        store.insert_time_slots(&[slot.clone()]).await.unwrap();
        (store, offering, slot)
    }

    fn new_booking(user: &str, slot: &TimeSlot) -> NewBooking {
        NewBooking::confirmed(user, slot.id, slot.offering_type_id, format!("hv_{}", user))
    }

    #[tokio::test]
    async fn test_commit_increments_and_bumps_version() {
        let (store, offering, slot) = seeded(2).await;
        let slot_v = store.get_time_slot(slot.id).await.unwrap().unwrap();
        let type_v = store.get_offering_type(offering.id).await.unwrap().unwrap();

        let outcome = store.commit_booking(&slot_v, &type_v, new_booking("u1", &slot)).await.unwrap();
        assert!(matches!(outcome, CommitOutcome::Committed(_)));

        let after = store.get_time_slot(slot.id).await.unwrap().unwrap();
        assert_eq!(after.value.booked_participants_count, 1);
        assert_eq!(after.version, slot_v.version + 1);
        assert_eq!(store.confirmed_count(slot.id).await, 1);
    }

    #[tokio::test]
    async fn test_stale_snapshot_conflicts_without_writing() {
        let (store, offering, slot) = seeded(2).await;
        let slot_v = store.get_time_slot(slot.id).await.unwrap().unwrap();
        let type_v = store.get_offering_type(offering.id).await.unwrap().unwrap();

        store.commit_booking(&slot_v, &type_v, new_booking("u1", &slot)).await.unwrap();
        let outcome = store.commit_booking(&slot_v, &type_v, new_booking("u2", &slot)).await.unwrap();

        assert_eq!(outcome, CommitOutcome::Conflict);
        assert_eq!(store.list_bookings().await.unwrap().len(), 1);
        assert_eq!(store.get_time_slot(slot.id).await.unwrap().unwrap().value.booked_participants_count, 1);
    }

    #[tokio::test]
    async fn test_offering_type_edit_conflicts() {
        let (store, offering, slot) = seeded(3).await;
        let slot_v = store.get_time_slot(slot.id).await.unwrap().unwrap();
        let type_v = store.get_offering_type(offering.id).await.unwrap().unwrap();

        let mut edited = offering.clone();
        edited.max_participants = 2;
        store.put_offering_type(&edited).await.unwrap();

        let outcome = store.commit_booking(&slot_v, &type_v, new_booking("u1", &slot)).await.unwrap();
        assert_eq!(outcome, CommitOutcome::Conflict);
    }

    #[tokio::test]
    async fn test_batch_insert_is_all_or_nothing() {
        let (store, offering, slot) = seeded(2).await;
        let start = Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap();
        let fresh = TimeSlot::new(offering.id, start, start + Duration::hours(1)).unwrap();

        // Second entry collides with the seeded slot
        let result = store.insert_time_slots(&[fresh.clone(), slot.clone()]).await;
        assert!(result.is_err());
        assert!(store.get_time_slot(fresh.id).await.unwrap().is_none());
        assert_eq!(store.list_time_slots().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_slot_blocked_by_confirmed_booking() {
        let (store, offering, slot) = seeded(2).await;
        let slot_v = store.get_time_slot(slot.id).await.unwrap().unwrap();
        let type_v = store.get_offering_type(offering.id).await.unwrap().unwrap();
        store.commit_booking(&slot_v, &type_v, new_booking("u1", &slot)).await.unwrap();

        assert_eq!(store.delete_time_slot(slot.id).await.unwrap(), DeleteOutcome::InUse { count: 1 });
        assert_eq!(store.delete_time_slot(Uuid::new_v4()).await.unwrap(), DeleteOutcome::NotFound);
        assert_eq!(store.delete_offering_type(offering.id).await.unwrap(), DeleteOutcome::InUse { count: 1 });
    }

    #[tokio::test]
    async fn test_pending_booking_does_not_block_delete() {
        let (store, offering, slot) = seeded(2).await;
        let slot_v = store.get_time_slot(slot.id).await.unwrap().unwrap();
        let type_v = store.get_offering_type(offering.id).await.unwrap().unwrap();
        let mut pending = new_booking("u1", &slot);
        pending.status = BookingStatus::Pending;
        store.commit_booking(&slot_v, &type_v, pending).await.unwrap();

        assert_eq!(store.confirmed_count(slot.id).await, 0);
        assert_eq!(store.delete_time_slot(slot.id).await.unwrap(), DeleteOutcome::Deleted);
        assert!(store.list_bookings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_offering_type_versions() {
        let store = MemoryStore::new();
        let offering = OfferingType::new(SessionModel::LargeGroup, 40, 1500, "EUR");
        store.put_offering_type(&offering).await.unwrap();
        store.put_offering_type(&offering).await.unwrap();

        assert_eq!(store.get_offering_type(offering.id).await.unwrap().unwrap().version, 1);
        assert_eq!(store.delete_offering_type(offering.id).await.unwrap(), DeleteOutcome::Deleted);
        assert!(store.list_offering_types().await.unwrap().is_empty());
    }
}
