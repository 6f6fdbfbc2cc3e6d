use async_trait::async_trait;
use haven_catalog::{OfferingType, TimeSlot};
use uuid::Uuid;
use crate::booking::{Booking, NewBooking};
use crate::StoreResult;

/// A record as read, together with the version it had at read time.
///
/// Every write bumps the version, so comparing versions at commit tells
/// whether anybody else touched the record in between.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: i64,
}

impl<T> Versioned<T> {
    pub fn new(value: T, version: i64) -> Self {
        Self { value, version }
    }
}

/// Result of a conditional booking commit
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Counter incremented and booking inserted as one unit.
    Committed(Booking),
    /// A read record changed since the snapshot; nothing was written.
    Conflict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    /// Still referenced by `count` records (confirmed bookings or slots).
    InUse { count: i64 },
}

/// Storage contract for the booking subsystem.
///
/// Implementations must make `commit_booking` and `insert_time_slots`
/// all-or-nothing; everything else is plain CRUD.
#[async_trait]
pub trait SlotStore: Send + Sync {
    async fn get_offering_type(&self, id: Uuid) -> StoreResult<Option<Versioned<OfferingType>>>;

    async fn get_time_slot(&self, id: Uuid) -> StoreResult<Option<Versioned<TimeSlot>>>;

    /// Increment the slot's counter by one and insert `booking`, provided both
    /// the slot and the offering type are still at the versions given.
    async fn commit_booking(
        &self,
        slot: &Versioned<TimeSlot>,
        offering_type: &Versioned<OfferingType>,
        booking: NewBooking,
    ) -> StoreResult<CommitOutcome>;

    /// Persist every slot or none of them.
    async fn insert_time_slots(&self, slots: &[TimeSlot]) -> StoreResult<()>;

    /// Delete a slot unless confirmed bookings still reference it.
    async fn delete_time_slot(&self, id: Uuid) -> StoreResult<DeleteOutcome>;

    /// Create or replace an offering type, bumping its version.
    async fn put_offering_type(&self, offering_type: &OfferingType) -> StoreResult<()>;

    /// Delete an offering type unless slots still reference it.
    async fn delete_offering_type(&self, id: Uuid) -> StoreResult<DeleteOutcome>;

    async fn list_offering_types(&self) -> StoreResult<Vec<OfferingType>>;

    async fn list_time_slots(&self) -> StoreResult<Vec<TimeSlot>>;

    async fn list_bookings(&self) -> StoreResult<Vec<Booking>>;

    async fn list_bookings_for_user(&self, user_id: &str) -> StoreResult<Vec<Booking>>;

    /// Cheap liveness check backing `/health`.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
