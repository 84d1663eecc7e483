//! Field-level validation for submitted forms.
//!
//! Forms arrive as raw URL-encoded pairs so that repeated keys such as
//! `choices[]` survive; [`FormFields`] gives lookup access and the DTOs in
//! [`crate::models`] turn it into typed input or a list of [`FieldError`]s.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[FieldError] {
        &self.0
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn finish<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}

/// Decoded `application/x-www-form-urlencoded` body, in submission order.
#[derive(Debug, Default, Clone)]
pub struct FormFields(Vec<(String, String)>);

impl From<Vec<(String, String)>> for FormFields {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }
}

impl FormFields {
    /// First value submitted under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value submitted under `key`, empty ones included.
    pub fn all(&self, key: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// Trimmed, non-empty text no longer than `max` characters.
pub fn required_text(
    errors: &mut FieldErrors,
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> String {
    let value = value.unwrap_or_default().trim();

    if value.is_empty() {
        errors.push(field, "cannot be blank");
    } else if value.chars().count() > max {
        errors.push(field, format!("must be at most {max} characters"));
    }

    value.to_string()
}

/// Accepts `YYYY-MM-DD` or a `datetime-local` value, keeping the date.
pub fn date(errors: &mut FieldErrors, field: &'static str, value: Option<&str>) -> Option<NaiveDate> {
    let value = value.unwrap_or_default().trim();

    if value.is_empty() {
        errors.push(field, "cannot be blank");
        return None;
    }

    let date_part = value.split(['T', ' ']).next().unwrap_or(value);
    match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(field, "must be a valid date");
            None
        }
    }
}

/// Non-blank entries paired with their 1-based position in the submitted list.
pub fn positioned_entries(values: &[&str]) -> Vec<(i64, String)> {
    values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| {
            let v = v.trim();
            (!v.is_empty()).then(|| (i as i64 + 1, v.to_string()))
        })
        .collect()
}
