//! Error types for name parsing and validation.

use thiserror::Error;

/// Errors that can occur when parsing or validating resource names.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameError {
    /// The name is empty.
    #[error("name cannot be empty")]
    Empty,

    /// The name exceeds the maximum length.
    #[error("name is {length} bytes, maximum is {max}")]
    TooLong { length: usize, max: usize },

    /// The name starts with an invalid character.
    #[error("name must start with a lowercase letter, got '{actual}'")]
    InvalidStart { actual: char },

    /// The name contains an invalid character.
    #[error("invalid character '{actual}' in name (allowed: a-z, 0-9, '-')")]
    InvalidChar { actual: char },

    /// The name ends with a hyphen.
    #[error("name must not end with a hyphen")]
    TrailingHyphen,

    /// A reference string does not match the SRN format.
    #[error("invalid resource reference: {message}")]
    InvalidReference { message: String },

    /// A reference carries an unexpected resource type.
    #[error("reference type mismatch: expected '{expected}', got '{actual}'")]
    TypeMismatch {
        expected: &'static str,
        actual: String,
    },
}

impl NameError {
    /// Returns true if this error indicates the input was empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, NameError::Empty)
    }
}
