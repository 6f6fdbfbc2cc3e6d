pub mod booking;
pub mod repository;

pub use booking::{Booking, BookingStatus, NewBooking};
pub use repository::{CommitOutcome, DeleteOutcome, SlotStore, Versioned};

/// Failures of the backing store itself. Business outcomes (full slot, missing
/// record, lost race) are reported through return values, never through this.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Corrupt record: {0}")]
    Serialization(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
