use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use haven_booking::BookingError;

/// Counters exported at `/metrics`. Each instance owns its registry, so
/// several routers can live in one process.
pub struct ApiMetrics {
    registry: Registry,
    booking_attempts_total: IntCounterVec,
    slots_created_total: IntCounter,
}

impl ApiMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let booking_attempts_total = IntCounterVec::new(
            Opts::new("haven_booking_attempts_total", "Booking requests by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(booking_attempts_total.clone()))?;

        let slots_created_total = IntCounter::with_opts(Opts::new(
            "haven_slots_created_total",
            "Time slots written by the scheduler",
        ))?;
        registry.register(Box::new(slots_created_total.clone()))?;

        Ok(Self {
            registry,
            booking_attempts_total,
            slots_created_total,
        })
    }

    pub fn record_booking(&self, outcome: Result<(), &BookingError>) {
        let label = match outcome {
            Ok(()) => "confirmed",
            Err(BookingError::NotFound { .. }) => "not_found",
            Err(BookingError::SlotFull { .. }) => "slot_full",
            Err(BookingError::TransientConflict { .. }) => "transient",
            Err(BookingError::Store(_)) => "error",
        };
        self.booking_attempts_total.with_label_values(&[label]).inc();
    }

    pub fn record_slots_created(&self, count: usize) {
        self.slots_created_total.inc_by(count as u64);
    }

    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_outcomes_are_labelled() {
        let metrics = ApiMetrics::new().unwrap();
        metrics.record_booking(Ok(()));
        metrics.record_booking(Ok(()));
        metrics.record_booking(Err(&BookingError::SlotFull {
            time_slot_id: Uuid::new_v4(),
            max_participants: 1,
        }));
        metrics.record_slots_created(3);

        let text = metrics.encode_text().unwrap();
        assert!(text.contains(r#"haven_booking_attempts_total{outcome="confirmed"} 2"#));
        assert!(text.contains(r#"haven_booking_attempts_total{outcome="slot_full"} 1"#));
        assert!(text.contains("haven_slots_created_total 3"));
    }

    #[test]
    fn test_separate_instances_do_not_collide() {
        assert!(ApiMetrics::new().is_ok());
        assert!(ApiMetrics::new().is_ok());
    }
}
