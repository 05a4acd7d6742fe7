//! Post-deserialization checks for generated responses.
//!
//! `serde` guarantees shape; [`Validate`] covers the constraints a JSON
//! schema expresses but a provider may still ignore (ranges, minimum
//! lengths, non-empty lists).

use thiserror::Error;

/// A single constraint violation, reported against a dotted field path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Semantic validation for a deserialized response type.
pub trait Validate {
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Require at least `min` non-whitespace-trimmed characters.
///
/// # Errors
///
/// Returns [`ValidationError`] when `value` is shorter than `min`.
pub fn min_chars(field: &str, value: &str, min: usize) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if len < min {
        return Err(ValidationError::new(
            field,
            format!("expected at least {min} characters, got {len}"),
        ));
    }
    Ok(())
}

/// Require a finite value inside `[lo, hi]`.
///
/// # Errors
///
/// Returns [`ValidationError`] for NaN, infinities, or out-of-range values.
pub fn in_range(field: &str, value: f32, lo: f32, hi: f32) -> Result<(), ValidationError> {
    if !value.is_finite() || value < lo || value > hi {
        return Err(ValidationError::new(
            field,
            format!("expected a value in [{lo}, {hi}], got {value}"),
        ));
    }
    Ok(())
}

/// Require a list length inside `[min, max]`.
///
/// # Errors
///
/// Returns [`ValidationError`] when the length is outside the bounds.
pub fn len_between(field: &str, len: usize, min: usize, max: usize) -> Result<(), ValidationError> {
    if len < min || len > max {
        return Err(ValidationError::new(
            field,
            format!("expected between {min} and {max} entries, got {len}"),
        ));
    }
    Ok(())
}
