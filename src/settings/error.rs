//! Settings engine error types.

use thiserror::Error;

/// Result type for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Errors raised while walking a schema or validating a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    /// The schema root is a leaf and cannot be expanded into fields.
    #[error("Schema root must be an object")]
    NotAnObject,

    /// No leaf exists at the given dotted key.
    #[error("Unknown settings field: {0}")]
    UnknownField(String),

    /// The value does not have the type the field stores.
    #[error("Invalid value for '{key}': expected {expected}")]
    InvalidValue { key: String, expected: &'static str },

    /// A number lies outside the declared bounds.
    #[error("Value {value} for '{key}' is outside the allowed range {range}")]
    OutOfRange { key: String, value: f64, range: String },

    /// A string is not one of the declared choices.
    #[error("'{value}' is not a valid choice for '{key}' (expected one of: {choices})")]
    NotInEnum { key: String, value: String, choices: String },
}
