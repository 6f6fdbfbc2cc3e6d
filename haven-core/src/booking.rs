use chrono::{DateTime, Utc};
use haven_shared::Masked;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Booking status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Confirmed,
    Pending,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Pending => "PENDING",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "PENDING" => Ok(BookingStatus::Pending),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

/// A user's reservation of one time slot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: String,
    pub time_slot_id: Uuid,
    pub offering_type_id: Uuid,
    /// Commit instant of the transaction that created the booking.
    pub booking_time: DateTime<Utc>,
    pub status: BookingStatus,
    /// Authorizes joining the live session later on.
    pub session_token: Masked<String>,
}

impl Booking {
    pub fn is_confirmed(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }
}

/// A booking that has been decided on but not committed yet. The store stamps
/// `booking_time` when the write actually lands.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub id: Uuid,
    pub user_id: String,
    pub time_slot_id: Uuid,
    pub offering_type_id: Uuid,
    pub status: BookingStatus,
    pub session_token: Masked<String>,
}

impl NewBooking {
    pub fn confirmed(user_id: &str, time_slot_id: Uuid, offering_type_id: Uuid, session_token: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            time_slot_id,
            offering_type_id,
            status: BookingStatus::Confirmed,
            session_token: Masked::new(session_token),
        }
    }

    pub fn into_booking(self, booking_time: DateTime<Utc>) -> Booking {
        Booking {
            id: self.id,
            user_id: self.user_id,
            time_slot_id: self.time_slot_id,
            offering_type_id: self.offering_type_id,
            booking_time,
            status: self.status,
            session_token: self.session_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [BookingStatus::Confirmed, BookingStatus::Pending, BookingStatus::Cancelled] {
            assert_eq!(status.to_string().parse::<BookingStatus>(), Ok(status));
        }
        assert!("REFUNDED".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn test_new_booking_is_confirmed_and_stamped_on_commit() {
        let pending = NewBooking::confirmed("u1", Uuid::new_v4(), Uuid::new_v4(), "hv_token".to_string());
        let committed_at = Utc::now();
        let booking = pending.clone().into_booking(committed_at);

        assert!(booking.is_confirmed());
        assert_eq!(booking.id, pending.id);
        assert_eq!(booking.booking_time, committed_at);
        assert!(!format!("{:?}", booking).contains("hv_token"));
    }
}
