use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field name to message map returned when parameters fail validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(pub BTreeMap<String, String>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .0
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect();
        f.write_str(&rendered.join("; "))
    }
}

/// Free-form parameters supplied by the caller of `dispatch`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionParams(pub Map<String, Value>);

impl ActionParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.get(field).is_some_and(|value| !value.is_null())
    }

    /// Trimmed, non-empty text value.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn required_text(&self, field: &str, errors: &mut FieldErrors) -> Option<String> {
        let value = self.text(field).map(str::to_string);
        if value.is_none() {
            errors.add(field, "is required");
        }
        value
    }

    /// Decimal given either as a JSON string or a JSON number.
    pub fn decimal(&self, field: &str, errors: &mut FieldErrors) -> Option<Decimal> {
        let raw = match self.0.get(field)? {
            Value::Null => return None,
            Value::String(text) => text.trim().to_string(),
            Value::Number(number) => number.to_string(),
            _ => {
                errors.add(field, "must be a decimal number");
                return None;
            }
        };
        match Decimal::from_str(&raw) {
            Ok(value) => Some(value),
            Err(_) => {
                errors.add(field, "must be a decimal number");
                None
            }
        }
    }

    pub fn positive_decimal(&self, field: &str, errors: &mut FieldErrors) -> Option<Decimal> {
        let value = self.decimal(field, errors);
        match value {
            Some(value) if value > Decimal::ZERO => Some(value),
            Some(_) => {
                errors.add(field, "must be greater than zero");
                None
            }
            None => None,
        }
    }

    pub fn required_positive_decimal(
        &self,
        field: &str,
        errors: &mut FieldErrors,
    ) -> Option<Decimal> {
        if !self.contains(field) {
            errors.add(field, "is required");
            return None;
        }
        self.positive_decimal(field, errors)
    }

    pub fn positive_integer(&self, field: &str, errors: &mut FieldErrors) -> Option<u32> {
        let value = self.0.get(field)?;
        if value.is_null() {
            return None;
        }
        match value.as_u64().and_then(|number| u32::try_from(number).ok()) {
            Some(number) if number > 0 => Some(number),
            _ => {
                errors.add(field, "must be a positive whole number");
                None
            }
        }
    }

    pub fn required_positive_integer(
        &self,
        field: &str,
        errors: &mut FieldErrors,
    ) -> Option<u32> {
        if !self.contains(field) {
            errors.add(field, "is required");
            return None;
        }
        self.positive_integer(field, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decimal_accepts_strings_and_numbers() {
        let params = ActionParams::new()
            .with("as_text", "1500000.50")
            .with("as_number", json!(42));
        let mut errors = FieldErrors::default();

        assert_eq!(
            params.decimal("as_text", &mut errors),
            Some(Decimal::new(150000050, 2))
        );
        assert_eq!(
            params.decimal("as_number", &mut errors),
            Some(Decimal::new(42, 0))
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn required_fields_collect_every_error() {
        let params = ActionParams::new()
            .with("amount", "-5")
            .with("term_days", json!(0));
        let mut errors = FieldErrors::default();

        params.required_positive_decimal("amount", &mut errors);
        params.required_positive_integer("term_days", &mut errors);
        params.required_text("reason", &mut errors);

        assert_eq!(errors.get("amount"), Some("must be greater than zero"));
        assert_eq!(errors.get("term_days"), Some("must be a positive whole number"));
        assert_eq!(errors.get("reason"), Some("is required"));
    }

    #[test]
    fn blank_text_counts_as_missing() {
        let params = ActionParams::new().with("comment", "   ");
        assert_eq!(params.text("comment"), None);
    }
}
