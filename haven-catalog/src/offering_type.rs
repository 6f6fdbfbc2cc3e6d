use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use crate::{CatalogError, CatalogResult};

/// Locale code (e.g. "en", "fr") to text.
pub type LocalizedText = BTreeMap<String, String>;

/// Capacity model of an offering
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionModel {
    SingleOccupant,
    SmallGroup,
    LargeGroup,
}

impl SessionModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionModel::SingleOccupant => "SINGLE_OCCUPANT",
            SessionModel::SmallGroup => "SMALL_GROUP",
            SessionModel::LargeGroup => "LARGE_GROUP",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SINGLE_OCCUPANT" => Some(SessionModel::SingleOccupant),
            "SMALL_GROUP" => Some(SessionModel::SmallGroup),
            "LARGE_GROUP" => Some(SessionModel::LargeGroup),
            _ => None,
        }
    }
}

/// A bookable category of session ("session type" in the admin console).
///
/// Slots reference an offering type but never copy its capacity: the booking
/// transaction always checks against the current `max_participants`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfferingType {
    pub id: Uuid,
    #[serde(default)]
    pub name: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    pub session_model: SessionModel,
    pub max_participants: i32,
    /// Minor currency units (cents).
    pub price_minor: i32,
    pub currency: String,
}

impl OfferingType {
    pub fn new(session_model: SessionModel, max_participants: i32, price_minor: i32, currency: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: LocalizedText::new(),
            description: LocalizedText::new(),
            session_model,
            max_participants,
            price_minor,
            currency: currency.to_string(),
        }
    }

    pub fn with_name(mut self, locale: &str, name: &str) -> Self {
        self.name.insert(locale.to_string(), name.to_string());
        self
    }

    /// Name in `locale`, falling back to any available translation.
    pub fn display_name(&self, locale: &str) -> Option<&str> {
        self.name
            .get(locale)
            .or_else(|| self.name.values().next())
            .map(String::as_str)
    }

    /// Field validation run before every create or edit.
    pub fn validate(&self) -> CatalogResult<()> {
        if self.max_participants < 1 {
            return Err(CatalogError::Validation(format!(
                "max_participants must be at least 1, got {}",
                self.max_participants
            )));
        }

        match self.session_model {
            SessionModel::SingleOccupant if self.max_participants != 1 => {
                return Err(CatalogError::Validation(format!(
                    "single-occupant sessions take exactly 1 participant, got {}",
                    self.max_participants
                )));
            }
            SessionModel::SmallGroup | SessionModel::LargeGroup if self.max_participants < 2 => {
                return Err(CatalogError::Validation(format!(
                    "{} sessions need at least 2 participants",
                    self.session_model.as_str()
                )));
            }
            _ => {}
        }

        if self.price_minor < 0 {
            return Err(CatalogError::Validation("price cannot be negative".to_string()));
        }

        if self.currency.len() != 3 || !self.currency.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(CatalogError::Validation(format!(
                "currency must be a 3-letter ISO code, got {:?}",
                self.currency
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_occupant_requires_exactly_one() {
        let ok = OfferingType::new(SessionModel::SingleOccupant, 1, 9000, "EUR");
        assert!(ok.validate().is_ok());

        let bad = OfferingType::new(SessionModel::SingleOccupant, 2, 9000, "EUR");
        assert!(matches!(bad.validate(), Err(CatalogError::Validation(_))));
    }

    #[test]
    fn test_group_models_need_two_seats() {
        assert!(OfferingType::new(SessionModel::SmallGroup, 1, 0, "EUR").validate().is_err());
        assert!(OfferingType::new(SessionModel::SmallGroup, 6, 0, "EUR").validate().is_ok());
        assert!(OfferingType::new(SessionModel::LargeGroup, 200, 0, "EUR").validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_capacity_and_bad_money() {
        assert!(OfferingType::new(SessionModel::LargeGroup, 0, 100, "EUR").validate().is_err());
        assert!(OfferingType::new(SessionModel::SmallGroup, 4, -1, "EUR").validate().is_err());
        assert!(OfferingType::new(SessionModel::SmallGroup, 4, 100, "eur").validate().is_err());
        assert!(OfferingType::new(SessionModel::SmallGroup, 4, 100, "EURO").validate().is_err());
    }

    #[test]
    fn test_display_name_falls_back() {
        let offering = OfferingType::new(SessionModel::SingleOccupant, 1, 5000, "EUR")
            .with_name("fr", "Soin énergétique");
        assert_eq!(offering.display_name("fr"), Some("Soin énergétique"));
        assert_eq!(offering.display_name("en"), Some("Soin énergétique"));
    }

    #[test]
    fn test_session_model_deserialization() {
        let json = r#"
            {
                "id": "00000000-0000-0000-0000-000000000000",
                "name": {"en": "Group healing"},
                "session_model": "SMALL_GROUP",
                "max_participants": 8,
                "price_minor": 4500,
                "currency": "EUR"
            }
        "#;
        let offering: OfferingType = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(offering.session_model, SessionModel::SmallGroup);
        assert!(offering.description.is_empty());
        assert_eq!(SessionModel::parse(offering.session_model.as_str()), Some(SessionModel::SmallGroup));
    }
}
