pub mod offering_type;
pub mod recurrence;
pub mod slot;

pub use offering_type::{LocalizedText, OfferingType, SessionModel};
pub use recurrence::{Recurrence, SlotSeries, MAX_OCCURRENCES};
pub use slot::TimeSlot;

/// Catalog input rejected before anything is written.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Validation failed: {0}")]
    Validation(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
