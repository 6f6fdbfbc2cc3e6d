use haven_catalog::{CatalogError, OfferingType, SlotSeries};
use haven_core::{DeleteOutcome, SlotStore, StoreError};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error(transparent)]
    Validation(#[from] CatalogError),

    #[error("Offering type not found: {0}")]
    OfferingTypeNotFound(Uuid),

    #[error("Time slot not found: {0}")]
    SlotNotFound(Uuid),

    #[error("Time slot {slot_id} still has {count} confirmed bookings")]
    SlotHasBookings { slot_id: Uuid, count: i64 },

    #[error("Offering type {id} is still used by {count} time slots")]
    OfferingTypeInUse { id: Uuid, count: i64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Administrator-side catalog writes: offering types and their time slots.
#[derive(Clone)]
pub struct SlotScheduler {
    store: Arc<dyn SlotStore>,
}

impl SlotScheduler {
    pub fn new(store: Arc<dyn SlotStore>) -> Self {
        Self { store }
    }

    /// Expand `series` and persist every occurrence in one batch.
    ///
    /// The offering type check is a plain read; a type deleted between the
    /// check and the write makes the batch insert fail as a whole.
    pub async fn create_slots(&self, series: &SlotSeries) -> Result<Vec<Uuid>, ScheduleError> {
        let slots = series.expand()?;

        if self.store.get_offering_type(series.offering_type_id).await?.is_none() {
            return Err(ScheduleError::OfferingTypeNotFound(series.offering_type_id));
        }

        self.store.insert_time_slots(&slots).await?;

        info!(
            offering_type_id = %series.offering_type_id,
            recurrence = ?series.recurrence,
            "Created {} time slots",
            slots.len()
        );
        Ok(slots.into_iter().map(|s| s.id).collect())
    }

    pub async fn delete_slot(&self, slot_id: Uuid) -> Result<(), ScheduleError> {
        match self.store.delete_time_slot(slot_id).await? {
            DeleteOutcome::Deleted => {
                info!(time_slot_id = %slot_id, "Deleted time slot");
                Ok(())
            }
            DeleteOutcome::NotFound => Err(ScheduleError::SlotNotFound(slot_id)),
            DeleteOutcome::InUse { count } => Err(ScheduleError::SlotHasBookings { slot_id, count }),
        }
    }

    pub async fn put_offering_type(&self, offering_type: &OfferingType) -> Result<(), ScheduleError> {
        offering_type.validate()?;
        self.store.put_offering_type(offering_type).await?;
        info!(
            offering_type_id = %offering_type.id,
            model = offering_type.session_model.as_str(),
            name = offering_type.display_name("en").unwrap_or_default(),
            "Saved offering type"
        );
        Ok(())
    }

    pub async fn delete_offering_type(&self, id: Uuid) -> Result<(), ScheduleError> {
        match self.store.delete_offering_type(id).await? {
            DeleteOutcome::Deleted => Ok(()),
            DeleteOutcome::NotFound => Err(ScheduleError::OfferingTypeNotFound(id)),
            DeleteOutcome::InUse { count } => Err(ScheduleError::OfferingTypeInUse { id, count }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use haven_catalog::{Recurrence, SessionModel};
    use haven_store::MemoryStore;

    async fn scheduler_with_type() -> (Arc<MemoryStore>, SlotScheduler, OfferingType) {
        let store = Arc::new(MemoryStore::new());
        let scheduler = SlotScheduler::new(store.clone());
        let offering = OfferingType::new(SessionModel::SmallGroup, 6, 2500, "EUR").with_name("en", "Yoga");
        scheduler.put_offering_type(&offering).await.unwrap();
        (store, scheduler, offering)
    }

    #[tokio::test]
    async fn test_create_slots_returns_ids_in_order() {
        let (store, scheduler, offering) = scheduler_with_type().await;
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let series = SlotSeries::repeating(offering.id, start, start + Duration::hours(1), Recurrence::Daily, 4);

        let ids = scheduler.create_slots(&series).await.unwrap();
        assert_eq!(ids.len(), 4);

        for (i, id) in ids.iter().enumerate() {
            let slot = store.get_time_slot(*id).await.unwrap().unwrap().value;
            assert_eq!(slot.start_time, start + Duration::days(i as i64));
            assert_eq!(slot.booked_participants_count, 0);
        }
    }

    #[tokio::test]
    async fn test_unknown_offering_type_writes_nothing() {
        let (store, scheduler, _) = scheduler_with_type().await;
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let series = SlotSeries::repeating(Uuid::new_v4(), start, start + Duration::hours(1), Recurrence::Weekly, 3);

        let err = scheduler.create_slots(&series).await.unwrap_err();
        assert!(matches!(err, ScheduleError::OfferingTypeNotFound(_)));
        assert!(store.list_time_slots().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_series_is_rejected_before_any_read() {
        let (store, scheduler, offering) = scheduler_with_type().await;
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let series = SlotSeries::single(offering.id, start, start);

        assert!(matches!(
            scheduler.create_slots(&series).await,
            Err(ScheduleError::Validation(_))
        ));
        assert!(store.list_time_slots().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_occupant_with_capacity_two_never_persists() {
        let (store, scheduler, _) = scheduler_with_type().await;
        let invalid = OfferingType::new(SessionModel::SingleOccupant, 2, 9000, "EUR");

        assert!(matches!(
            scheduler.put_offering_type(&invalid).await,
            Err(ScheduleError::Validation(_))
        ));
        assert!(store.get_offering_type(invalid.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_slot_outcomes() {
        let (_, scheduler, offering) = scheduler_with_type().await;
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let ids = scheduler
            .create_slots(&SlotSeries::single(offering.id, start, start + Duration::hours(1)))
            .await
            .unwrap();

        assert!(matches!(
            scheduler.delete_offering_type(offering.id).await,
            Err(ScheduleError::OfferingTypeInUse { count: 1, .. })
        ));

        scheduler.delete_slot(ids[0]).await.unwrap();
        assert!(matches!(
            scheduler.delete_slot(ids[0]).await,
            Err(ScheduleError::SlotNotFound(_))
        ));

        scheduler.delete_offering_type(offering.id).await.unwrap();
    }
}
