use haven_catalog::{OfferingType, TimeSlot};
use haven_core::{Booking, CommitOutcome, NewBooking, SlotStore, StoreError, Versioned};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;
use crate::token::generate_session_token;

/// Why a booking attempt did not produce a booking
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Time slot {time_slot_id} is full ({max_participants} participants)")]
    SlotFull { time_slot_id: Uuid, max_participants: i32 },

    #[error("Booking abandoned after {attempts} conflicting attempts")]
    TransientConflict { attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BookingError {
    /// Stable code handed to clients.
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::NotFound { .. } => "NOT_FOUND",
            BookingError::SlotFull { .. } => "SLOT_FULL",
            BookingError::TransientConflict { .. } => "TRANSIENT",
            BookingError::Store(_) => "STORE_ERROR",
        }
    }

    /// Only a lost race is worth resubmitting.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::TransientConflict { .. })
    }
}

/// How often a conflicting booking transaction is replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_backoff: Duration,
}

const MAX_BACKOFF: Duration = Duration::from_secs(1);

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    /// Always at least one.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_backoff(&self) -> Duration {
        self.base_backoff
    }

    /// Exponential: base, 2*base, 4*base... capped at one second.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(10))
    }
}

/// Capacity decision for one snapshot. Pure, so it can run between the
/// snapshot reads and the commit without suspending.
pub fn evaluate_capacity(slot: &TimeSlot, offering_type: &OfferingType) -> Result<(), BookingError> {
    if slot.offering_type_id != offering_type.id {
        // The requested offering has no such slot
        return Err(BookingError::NotFound {
            entity: "time slot",
            id: slot.id,
        });
    }

    if slot.is_full(offering_type.max_participants) {
        return Err(BookingError::SlotFull {
            time_slot_id: slot.id,
            max_participants: offering_type.max_participants,
        });
    }

    Ok(())
}

/// Reserves seats in time slots without ever overbooking them.
///
/// Each attempt reads the slot and its offering type, decides, and hands the
/// decision to [`SlotStore::commit_booking`], which only applies it if neither
/// record moved since the read. A lost race replays the whole attempt against
/// fresh data, so every caller ends with exactly one consistent answer.
#[derive(Clone)]
pub struct BookingTransactor {
    store: Arc<dyn SlotStore>,
    policy: RetryPolicy,
}

impl BookingTransactor {
    pub fn new(store: Arc<dyn SlotStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn create_booking(
        &self,
        user_id: &str,
        time_slot_id: Uuid,
        offering_type_id: Uuid,
    ) -> Result<Booking, BookingError> {
        for attempt in 1..=self.policy.max_attempts {
            let (slot, offering_type) = self.snapshot(time_slot_id, offering_type_id).await?;

            evaluate_capacity(&slot.value, &offering_type.value)?;

            let pending = NewBooking::confirmed(user_id, time_slot_id, offering_type_id, generate_session_token());
            match self.store.commit_booking(&slot, &offering_type, pending).await? {
                CommitOutcome::Committed(booking) => {
                    info!(
                        booking_id = %booking.id,
                        time_slot_id = %time_slot_id,
                        attempt,
                        "Booking confirmed ({}/{} seats taken)",
                        slot.value.booked_participants_count + 1,
                        offering_type.value.max_participants
                    );
                    return Ok(booking);
                }
                CommitOutcome::Conflict => {
                    warn!(time_slot_id = %time_slot_id, attempt, "Booking commit conflicted, retrying");
                    if attempt < self.policy.max_attempts {
                        let delay = self.policy.backoff(attempt);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }

        warn!(
            time_slot_id = %time_slot_id,
            attempts = self.policy.max_attempts,
            "Booking gave up after repeated conflicts"
        );
        Err(BookingError::TransientConflict {
            attempts: self.policy.max_attempts,
        })
    }

    async fn snapshot(
        &self,
        time_slot_id: Uuid,
        offering_type_id: Uuid,
    ) -> Result<(Versioned<TimeSlot>, Versioned<OfferingType>), BookingError> {
        let (slot, offering_type) = tokio::try_join!(
            self.store.get_time_slot(time_slot_id),
            self.store.get_offering_type(offering_type_id),
        )?;

        let slot = slot.ok_or(BookingError::NotFound {
            entity: "time slot",
            id: time_slot_id,
        })?;
        let offering_type = offering_type.ok_or(BookingError::NotFound {
            entity: "offering type",
            id: offering_type_id,
        })?;

        Ok((slot, offering_type))
    }
}
