pub mod projection;
pub mod schedule;
pub mod token;
pub mod transactor;

pub use projection::{BookingView, Partitioned, ProjectionService};
pub use schedule::{ScheduleError, SlotScheduler};
pub use token::generate_session_token;
pub use transactor::{BookingError, BookingTransactor, RetryPolicy};
