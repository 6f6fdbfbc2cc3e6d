use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::slot::TimeSlot;
use crate::{CatalogError, CatalogResult};

/// Upper bound on occurrences written in one batch (a year of daily slots).
pub const MAX_OCCURRENCES: u32 = 366;

/// How a slot repeats
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

/// Administrator input for slot creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotSeries {
    pub offering_type_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default = "default_repeat_count")]
    pub repeat_count: u32,
}

fn default_repeat_count() -> u32 { 1 }

impl SlotSeries {
    pub fn single(offering_type_id: Uuid, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            offering_type_id,
            start_time,
            end_time,
            recurrence: Recurrence::None,
            repeat_count: 1,
        }
    }

    pub fn repeating(
        offering_type_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        recurrence: Recurrence,
        repeat_count: u32,
    ) -> Self {
        Self {
            offering_type_id,
            start_time,
            end_time,
            recurrence,
            repeat_count,
        }
    }

    /// Number of slots `expand` will produce.
    pub fn occurrences(&self) -> u32 {
        match self.recurrence {
            Recurrence::None => 1,
            _ => self.repeat_count,
        }
    }

    pub fn validate(&self) -> CatalogResult<()> {
        if self.start_time >= self.end_time {
            return Err(CatalogError::Validation(
                "start_time must be strictly before end_time".to_string(),
            ));
        }

        if self.recurrence != Recurrence::None {
            if self.repeat_count < 1 {
                return Err(CatalogError::Validation(
                    "repeat_count must be at least 1 for a recurring series".to_string(),
                ));
            }
            if self.repeat_count > MAX_OCCURRENCES {
                return Err(CatalogError::Validation(format!(
                    "repeat_count {} exceeds the limit of {}",
                    self.repeat_count, MAX_OCCURRENCES
                )));
            }
        }

        Ok(())
    }

    /// Materialize every occurrence as an independent, empty slot.
    ///
    /// Occurrence `i` starts at `start_time + i * step` and keeps the duration of
    /// the first one. Monthly steps are taken from the anchor (never chained), so
    /// a series anchored on the 31st lands on the last day of shorter months and
    /// returns to the 31st afterwards.
    pub fn expand(&self) -> CatalogResult<Vec<TimeSlot>> {
        self.validate()?;

        let duration = self.end_time - self.start_time;
        let mut slots = Vec::with_capacity(self.occurrences() as usize);

        for i in 0..self.occurrences() {
            let start = self.occurrence_start(i)?;
            let end = start.checked_add_signed(duration).ok_or_else(|| {
                CatalogError::Validation(format!("occurrence {} ends out of range", i))
            })?;
            slots.push(TimeSlot::new(self.offering_type_id, start, end)?);
        }

        Ok(slots)
    }

    fn occurrence_start(&self, index: u32) -> CatalogResult<DateTime<Utc>> {
        let out_of_range = || CatalogError::Validation(format!("occurrence {} starts out of range", index));
        let step_days = match self.recurrence {
            Recurrence::None => return Ok(self.start_time),
            Recurrence::Daily => 1,
            Recurrence::Weekly => 7,
            Recurrence::Biweekly => 14,
            Recurrence::Monthly => {
                return self
                    .start_time
                    .checked_add_months(Months::new(index))
                    .ok_or_else(out_of_range);
            }
        };

        self.start_time
            .checked_add_signed(Duration::days(step_days * i64::from(index)))
            .ok_or_else(out_of_range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_weekly_series() {
        let series = SlotSeries::repeating(Uuid::new_v4(), at(2024, 1, 1, 10), at(2024, 1, 1, 11), Recurrence::Weekly, 3);
        let slots = series.expand().unwrap();

        let starts: Vec<_> = slots.iter().map(|s| s.start_time).collect();
        assert_eq!(starts, vec![at(2024, 1, 1, 10), at(2024, 1, 8, 10), at(2024, 1, 15, 10)]);
        for slot in &slots {
            assert_eq!(slot.end_time - slot.start_time, Duration::hours(1));
            assert_eq!(slot.booked_participants_count, 0);
            assert_eq!(slot.offering_type_id, series.offering_type_id);
        }
    }

    #[test]
    fn test_none_ignores_repeat_count() {
        let series = SlotSeries::repeating(Uuid::new_v4(), at(2024, 3, 1, 9), at(2024, 3, 1, 10), Recurrence::None, 12);
        let slots = series.expand().unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start_time, at(2024, 3, 1, 9));
    }

    #[test]
    fn test_daily_and_biweekly_steps() {
        let id = Uuid::new_v4();
        let daily = SlotSeries::repeating(id, at(2024, 2, 28, 18), at(2024, 2, 28, 19), Recurrence::Daily, 3)
            .expand()
            .unwrap();
        assert_eq!(daily[1].start_time, at(2024, 2, 29, 18));
        assert_eq!(daily[2].start_time, at(2024, 3, 1, 18));

        let biweekly = SlotSeries::repeating(id, at(2024, 1, 1, 10), at(2024, 1, 1, 12), Recurrence::Biweekly, 2)
            .expand()
            .unwrap();
        assert_eq!(biweekly[1].start_time, at(2024, 1, 15, 10));
        assert_eq!(biweekly[1].end_time, at(2024, 1, 15, 12));
    }

    #[test]
    fn test_monthly_clamps_to_month_end() {
        let series = SlotSeries::repeating(Uuid::new_v4(), at(2024, 1, 31, 10), at(2024, 1, 31, 11), Recurrence::Monthly, 4);
        let starts: Vec<_> = series.expand().unwrap().iter().map(|s| s.start_time).collect();
        assert_eq!(
            starts,
            vec![at(2024, 1, 31, 10), at(2024, 2, 29, 10), at(2024, 3, 31, 10), at(2024, 4, 30, 10)]
        );
    }

    #[test]
    fn test_monthly_duration_can_cross_midnight() {
        let series = SlotSeries::repeating(Uuid::new_v4(), at(2023, 1, 31, 23), at(2023, 2, 1, 1), Recurrence::Monthly, 2);
        let slots = series.expand().unwrap();
        assert_eq!(slots[1].start_time, at(2023, 2, 28, 23));
        assert_eq!(slots[1].end_time, at(2023, 3, 1, 1));
    }

    #[test]
    fn test_validation_errors() {
        let id = Uuid::new_v4();
        let inverted = SlotSeries::single(id, at(2024, 1, 1, 11), at(2024, 1, 1, 10));
        assert!(matches!(inverted.expand(), Err(CatalogError::Validation(_))));

        let zero = SlotSeries::repeating(id, at(2024, 1, 1, 10), at(2024, 1, 1, 11), Recurrence::Weekly, 0);
        assert!(zero.validate().is_err());

        let huge = SlotSeries::repeating(id, at(2024, 1, 1, 10), at(2024, 1, 1, 11), Recurrence::Daily, MAX_OCCURRENCES + 1);
        assert!(huge.validate().is_err());
    }

    #[test]
    fn test_series_request_defaults() {
        let json = r#"
            {
                "offering_type_id": "00000000-0000-0000-0000-000000000000",
                "start_time": "2024-01-01T10:00:00Z",
                "end_time": "2024-01-01T11:00:00Z"
            }
        "#;
        let series: SlotSeries = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(series.recurrence, Recurrence::None);
        assert_eq!(series.repeat_count, 1);
        assert_eq!(series.occurrences(), 1);
    }
}
