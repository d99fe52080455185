//! Input validation errors

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{field} must be greater than zero (got {value})")]
    NonPositiveDimension { field: &'static str, value: f64 },

    #[error("{field} must not be negative (got {value})")]
    NegativeQuantity { field: &'static str, value: f64 },

    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },

    #[error("Unknown container preset '{0}'")]
    UnknownPreset(String),
}
