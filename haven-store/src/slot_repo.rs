use async_trait::async_trait;
use chrono::{DateTime, Utc};
use haven_catalog::{LocalizedText, OfferingType, SessionModel, TimeSlot};
use haven_core::{
    Booking, BookingStatus, CommitOutcome, DeleteOutcome, NewBooking, SlotStore, StoreError, StoreResult,
    Versioned,
};
use haven_shared::Masked;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

/// PostgreSQL `SlotStore`.
///
/// Every row carries a `version` column. `commit_booking` locks the slot row,
/// compares versions with the caller's snapshot and only then increments the
/// counter and inserts the booking, all inside one transaction.
pub struct PgSlotStore {
    pool: PgPool,
}

impl PgSlotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn try_commit(
        &self,
        slot: &Versioned<TimeSlot>,
        offering_type: &Versioned<OfferingType>,
        booking: NewBooking,
    ) -> Result<CommitOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let slot_version: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM time_slots WHERE id = $1 FOR UPDATE",
        )
        .bind(slot.value.id)
        .fetch_optional(&mut *tx)
        .await?;

        if slot_version != Some(slot.version) {
            tx.rollback().await?;
            return Ok(CommitOutcome::Conflict);
        }

        // FOR SHARE keeps capacity edits out until we commit
        let type_version: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM offering_types WHERE id = $1 FOR SHARE",
        )
        .bind(offering_type.value.id)
        .fetch_optional(&mut *tx)
        .await?;

        if type_version != Some(offering_type.version) {
            tx.rollback().await?;
            return Ok(CommitOutcome::Conflict);
        }

        sqlx::query(
            r#"
            UPDATE time_slots
            SET booked_participants_count = booked_participants_count + 1, version = version + 1
            WHERE id = $1
            "#,
        )
        .bind(slot.value.id)
        .execute(&mut *tx)
        .await?;

        let booking_time: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO bookings (id, user_id, time_slot_id, offering_type_id, status, session_token, booking_time)
            VALUES ($1, $2, $3, $4, $5, $6, clock_timestamp())
            RETURNING booking_time
            "#,
        )
        .bind(booking.id)
        .bind(&booking.user_id)
        .bind(booking.time_slot_id)
        .bind(booking.offering_type_id)
        .bind(booking.status.as_str())
        .bind(booking.session_token.expose())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(CommitOutcome::Committed(booking.into_booking(booking_time)))
    }
}

/// Serialization failures and deadlocks mean "somebody else got there first".
fn is_conflict(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "40001" || code == "40P01")
}

fn db_err(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => StoreError::Unavailable(err.to_string()),
        other => StoreError::Database(other.to_string()),
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct OfferingTypeRow {
    id: Uuid,
    name: Json<LocalizedText>,
    description: Json<LocalizedText>,
    session_model: String,
    max_participants: i32,
    price_minor: i32,
    currency: String,
    version: i64,
}

impl TryFrom<OfferingTypeRow> for Versioned<OfferingType> {
    type Error = StoreError;

    fn try_from(row: OfferingTypeRow) -> Result<Self, Self::Error> {
        let session_model = SessionModel::parse(&row.session_model).ok_or_else(|| {
            StoreError::Serialization(format!("offering type {} has session model {:?}", row.id, row.session_model))
        })?;

        Ok(Versioned::new(
            OfferingType {
                id: row.id,
                name: row.name.0,
                description: row.description.0,
                session_model,
                max_participants: row.max_participants,
                price_minor: row.price_minor,
                currency: row.currency,
            },
            row.version,
        ))
    }
}

#[derive(sqlx::FromRow)]
struct TimeSlotRow {
    id: Uuid,
    offering_type_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    booked_participants_count: i32,
    version: i64,
}

impl From<TimeSlotRow> for Versioned<TimeSlot> {
    fn from(row: TimeSlotRow) -> Self {
        Versioned::new(
            TimeSlot {
                id: row.id,
                offering_type_id: row.offering_type_id,
                start_time: row.start_time,
                end_time: row.end_time,
                booked_participants_count: row.booked_participants_count,
            },
            row.version,
        )
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: String,
    time_slot_id: Uuid,
    offering_type_id: Uuid,
    booking_time: DateTime<Utc>,
    status: String,
    session_token: String,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status: BookingStatus = row.status.parse().map_err(StoreError::Serialization)?;
        Ok(Booking {
            id: row.id,
            user_id: row.user_id,
            time_slot_id: row.time_slot_id,
            offering_type_id: row.offering_type_id,
            booking_time: row.booking_time,
            status,
            session_token: Masked::new(row.session_token),
        })
    }
}

const OFFERING_TYPE_COLUMNS: &str =
    "id, name, description, session_model, max_participants, price_minor, currency, version";
const TIME_SLOT_COLUMNS: &str = "id, offering_type_id, start_time, end_time, booked_participants_count, version";
const BOOKING_COLUMNS: &str = "id, user_id, time_slot_id, offering_type_id, booking_time, status, session_token";

#[async_trait]
impl SlotStore for PgSlotStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(db_err)?;
        Ok(())
    }

    async fn get_offering_type(&self, id: Uuid) -> StoreResult<Option<Versioned<OfferingType>>> {
        let row: Option<OfferingTypeRow> = sqlx::query_as(&format!(
            "SELECT {} FROM offering_types WHERE id = $1",
            OFFERING_TYPE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(Versioned::<OfferingType>::try_from).transpose()
    }

    async fn get_time_slot(&self, id: Uuid) -> StoreResult<Option<Versioned<TimeSlot>>> {
        let row: Option<TimeSlotRow> = sqlx::query_as(&format!(
            "SELECT {} FROM time_slots WHERE id = $1",
            TIME_SLOT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(Versioned::<TimeSlot>::from))
    }

    async fn commit_booking(
        &self,
        slot: &Versioned<TimeSlot>,
        offering_type: &Versioned<OfferingType>,
        booking: NewBooking,
    ) -> StoreResult<CommitOutcome> {
        match self.try_commit(slot, offering_type, booking).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if is_conflict(&e) => {
                debug!("Booking commit on slot {} aborted by Postgres: {}", slot.value.id, e);
                Ok(CommitOutcome::Conflict)
            }
            Err(e) => Err(db_err(e)),
        }
    }

    async fn insert_time_slots(&self, slots: &[TimeSlot]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        for slot in slots {
            sqlx::query(
                r#"
                INSERT INTO time_slots (id, offering_type_id, start_time, end_time, booked_participants_count)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(slot.id)
            .bind(slot.offering_type_id)
            .bind(slot.start_time)
            .bind(slot.end_time)
            .bind(slot.booked_participants_count)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        // Dropping the transaction on an early return rolls it back
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn delete_time_slot(&self, id: Uuid) -> StoreResult<DeleteOutcome> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Same row lock as commit_booking, so no booking can land mid-check
        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM time_slots WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if exists.is_none() {
            tx.rollback().await.map_err(db_err)?;
            return Ok(DeleteOutcome::NotFound);
        }

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings WHERE time_slot_id = $1 AND status = $2",
        )
        .bind(id)
        .bind(BookingStatus::Confirmed.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        if count > 0 {
            tx.rollback().await.map_err(db_err)?;
            return Ok(DeleteOutcome::InUse { count });
        }

        sqlx::query("DELETE FROM time_slots WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(DeleteOutcome::Deleted)
    }

    async fn put_offering_type(&self, offering_type: &OfferingType) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO offering_types (id, name, description, session_model, max_participants, price_minor, currency)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                description = EXCLUDED.description,
                session_model = EXCLUDED.session_model,
                max_participants = EXCLUDED.max_participants,
                price_minor = EXCLUDED.price_minor,
                currency = EXCLUDED.currency,
                version = offering_types.version + 1,
                updated_at = NOW()
            "#,
        )
        .bind(offering_type.id)
        .bind(Json(&offering_type.name))
        .bind(Json(&offering_type.description))
        .bind(offering_type.session_model.as_str())
        .bind(offering_type.max_participants)
        .bind(offering_type.price_minor)
        .bind(&offering_type.currency)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn delete_offering_type(&self, id: Uuid) -> StoreResult<DeleteOutcome> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM offering_types WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if exists.is_none() {
            tx.rollback().await.map_err(db_err)?;
            return Ok(DeleteOutcome::NotFound);
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM time_slots WHERE offering_type_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;
        if count > 0 {
            tx.rollback().await.map_err(db_err)?;
            return Ok(DeleteOutcome::InUse { count });
        }

        sqlx::query("DELETE FROM offering_types WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(DeleteOutcome::Deleted)
    }

    async fn list_offering_types(&self) -> StoreResult<Vec<OfferingType>> {
        let rows: Vec<OfferingTypeRow> = sqlx::query_as(&format!(
            "SELECT {} FROM offering_types ORDER BY id",
            OFFERING_TYPE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(|row| Versioned::<OfferingType>::try_from(row).map(|v| v.value))
            .collect()
    }

    async fn list_time_slots(&self) -> StoreResult<Vec<TimeSlot>> {
        let rows: Vec<TimeSlotRow> = sqlx::query_as(&format!(
            "SELECT {} FROM time_slots ORDER BY start_time, id",
            TIME_SLOT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(|row| Versioned::<TimeSlot>::from(row).value).collect())
    }

    async fn list_bookings(&self) -> StoreResult<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings ORDER BY booking_time",
            BOOKING_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn list_bookings_for_user(&self, user_id: &str) -> StoreResult<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE user_id = $1 ORDER BY booking_time",
            BOOKING_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(Booking::try_from).collect()
    }
}
