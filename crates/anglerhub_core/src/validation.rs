//! crates/anglerhub_core/src/validation.rs
//!
//! Field-level request validation. Errors are collected per field so the web
//! layer can report every problem at once.

use serde::Serialize;
use std::collections::BTreeMap;

/// A map of field name to human readable messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for a single failing field.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// The first message overall, used as the headline of an error response.
    pub fn first_message(&self) -> Option<&str> {
        self.0
            .values()
            .find_map(|messages| messages.first())
            .map(String::as_str)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn required(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, format!("The {field} field is required."));
        }
    }

    pub fn max_len(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(value) = value {
            if value.chars().count() > max {
                self.add(
                    field,
                    format!("The {field} field must not be greater than {max} characters."),
                );
            }
        }
    }

    pub fn between(&mut self, field: &str, value: Option<f64>, min: f64, max: f64) {
        if let Some(value) = value {
            if !value.is_finite() || value < min || value > max {
                self.add(
                    field,
                    format!("The {field} field must be between {min} and {max}."),
                );
            }
        }
    }

    pub fn max_items<T>(&mut self, field: &str, items: &[T], max: usize) {
        if items.len() > max {
            self.add(
                field,
                format!("The {field} field must not have more than {max} items."),
            );
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.first_message().unwrap_or("The given data was invalid."))
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_messages_per_field() {
        let mut errors = ValidationErrors::new();
        errors.required("species", "  ");
        errors.between("latitude", Some(91.0), -90.0, 90.0);
        errors.between("longitude", Some(-180.0), -180.0, 180.0);
        errors.max_len("notes", Some("abc"), 2);

        assert!(errors.contains("species"));
        assert!(errors.contains("latitude"));
        assert!(!errors.contains("longitude"));
        assert!(errors.contains("notes"));
        assert!(errors.clone().into_result().is_err());
    }

    #[test]
    fn nan_is_out_of_range() {
        let mut errors = ValidationErrors::new();
        errors.between("weight", Some(f64::NAN), 0.0, 999.999);
        assert!(errors.contains("weight"));
    }

    #[test]
    fn empty_errors_are_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }
}
