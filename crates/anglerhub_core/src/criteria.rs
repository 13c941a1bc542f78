//! crates/anglerhub_core/src/criteria.rs
//!
//! Typed goal criteria. The goal type is the tag of the union, so every
//! consumer (validation, storage, evaluation) matches on it exhaustively.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::GoalType;
use crate::validation::ValidationErrors;

/// Serialises as `{"type": "...", "criteria": {...}}`, which is also the
/// shape the API accepts and the database stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "criteria", rename_all = "snake_case")]
pub enum GoalCriteria {
    Species(SpeciesCriteria),
    Weight(WeightCriteria),
    Count(CountCriteria),
    Location(LocationCriteria),
    Custom(CustomCriteria),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesCriteria {
    pub species: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_weight: Option<f64>,
}

/// `target_weight` is informational; achievement is judged on `target_value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CountCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCriteria {
    pub location: String,
}

/// Free-form criteria for manually tracked goals.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomCriteria {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        day >= self.start && day <= self.end
    }
}

impl GoalCriteria {
    pub fn goal_type(&self) -> GoalType {
        match self {
            Self::Species(_) => GoalType::Species,
            Self::Weight(_) => GoalType::Weight,
            Self::Count(_) => GoalType::Count,
            Self::Location(_) => GoalType::Location,
            Self::Custom(_) => GoalType::Custom,
        }
    }

    /// Builds typed criteria from the raw JSON document submitted for a goal
    /// of `goal_type`, reporting missing type-required keys per field.
    pub fn parse(goal_type: GoalType, raw: &Value) -> Result<Self, ValidationErrors> {
        let Some(object) = raw.as_object() else {
            return Err(ValidationErrors::single(
                "criteria",
                "The criteria field must be an object.",
            ));
        };

        let required = match goal_type {
            GoalType::Species => Some(("species", "Species is required for species goals")),
            GoalType::Weight => Some((
                "target_weight",
                "Target weight is required for weight goals",
            )),
            GoalType::Location => Some(("location", "Location is required for location goals")),
            GoalType::Count | GoalType::Custom => None,
        };
        if let Some((key, message)) = required {
            if object.get(key).map_or(true, Value::is_null) {
                return Err(ValidationErrors::single(format!("criteria.{key}"), message));
            }
        }

        let invalid = |e: serde_json::Error| {
            ValidationErrors::single("criteria", format!("The criteria field is invalid: {e}"))
        };
        let value = raw.clone();
        let criteria = match goal_type {
            GoalType::Species => Self::Species(serde_json::from_value(value).map_err(invalid)?),
            GoalType::Weight => Self::Weight(serde_json::from_value(value).map_err(invalid)?),
            GoalType::Count => Self::Count(serde_json::from_value(value).map_err(invalid)?),
            GoalType::Location => Self::Location(serde_json::from_value(value).map_err(invalid)?),
            GoalType::Custom => Self::Custom(serde_json::from_value(value).map_err(invalid)?),
        };

        if let Self::Count(CountCriteria {
            date_range: Some(range),
            ..
        }) = &criteria
        {
            if range.end < range.start {
                return Err(ValidationErrors::single(
                    "criteria.date_range",
                    "The date range end must not be before its start.",
                ));
            }
        }
        Ok(criteria)
    }

    /// The criteria document without its type tag, as stored in the
    /// `criteria` column.
    pub fn to_document(&self) -> Value {
        let document = match self {
            Self::Species(c) => serde_json::to_value(c),
            Self::Weight(c) => serde_json::to_value(c),
            Self::Count(c) => serde_json::to_value(c),
            Self::Location(c) => serde_json::to_value(c),
            Self::Custom(c) => serde_json::to_value(c),
        };
        // Plain structs of strings, numbers and dates always serialise.
        document.unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn species_requires_species_key() {
        let err = GoalCriteria::parse(GoalType::Species, &json!({ "min_weight": 5 })).unwrap_err();
        assert!(err.contains("criteria.species"));
    }

    #[test]
    fn weight_requires_target_weight() {
        let err = GoalCriteria::parse(GoalType::Weight, &json!({})).unwrap_err();
        assert!(err.contains("criteria.target_weight"));

        let ok = GoalCriteria::parse(GoalType::Weight, &json!({ "target_weight": 4.5 })).unwrap();
        assert_eq!(
            ok,
            GoalCriteria::Weight(WeightCriteria {
                target_weight: Some(4.5)
            })
        );
    }

    #[test]
    fn location_requires_location() {
        let err = GoalCriteria::parse(GoalType::Location, &json!({ "location": null })).unwrap_err();
        assert!(err.contains("criteria.location"));
    }

    #[test]
    fn count_accepts_empty_document() {
        let criteria = GoalCriteria::parse(GoalType::Count, &json!({})).unwrap();
        assert_eq!(criteria, GoalCriteria::Count(CountCriteria::default()));
    }

    #[test]
    fn count_rejects_inverted_date_range() {
        let raw = json!({ "date_range": { "start": "2024-06-01", "end": "2024-05-01" } });
        let err = GoalCriteria::parse(GoalType::Count, &raw).unwrap_err();
        assert!(err.contains("criteria.date_range"));
    }

    #[test]
    fn non_object_criteria_is_rejected() {
        let err = GoalCriteria::parse(GoalType::Custom, &json!(["bass"])).unwrap_err();
        assert!(err.contains("criteria"));
    }

    #[test]
    fn custom_keeps_arbitrary_fields() {
        let raw = json!({ "note": "fish every lake in the county" });
        let criteria = GoalCriteria::parse(GoalType::Custom, &raw).unwrap();
        assert_eq!(criteria.to_document(), raw);
    }

    #[test]
    fn serialises_with_type_tag() {
        let criteria = GoalCriteria::Location(LocationCriteria {
            location: "Lake Erie".into(),
        });
        assert_eq!(
            serde_json::to_value(&criteria).unwrap(),
            json!({ "type": "location", "criteria": { "location": "Lake Erie" } })
        );
    }
}
