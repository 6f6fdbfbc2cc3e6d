pub mod events;

pub use events::SlotAvailabilityEvent;
