//! Errors raised by table edits.

use thiserror::Error;

/// Errors that can occur when mutating the table.
#[derive(Debug, Error, PartialEq)]
pub enum EditError {
    /// Row index does not exist.
    #[error("Row {0} does not exist")]
    RowOutOfRange(usize),

    /// No column with this field.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Column is read-only.
    #[error("Column '{0}' is read-only")]
    ReadOnly(String),

    /// Input for a number column did not parse.
    #[error("'{value}' is not a number")]
    InvalidNumber { value: String },

    /// Input for a date column is not `YYYY-MM-DD`.
    #[error("'{value}' is not a date (expected YYYY-MM-DD)")]
    InvalidDate { value: String },

    /// Input for a select column is not one of its options.
    #[error("'{value}' is not one of: {}", options.join(", "))]
    InvalidOption { value: String, options: Vec<String> },

    /// Input for an email column is not an address.
    #[error("'{value}' is not a valid email address")]
    InvalidEmail { value: String },

    /// Image cells only accept image data.
    #[error("Image cells only accept uploaded images")]
    InvalidImage,

    /// Column title is blank.
    #[error("Column title cannot be empty")]
    EmptyTitle,
}

/// Result type for table edits.
pub type Result<T> = std::result::Result<T, EditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_option_lists_choices() {
        let err = EditError::InvalidOption {
            value: "x".to_string(),
            options: vec!["A".to_string(), "B".to_string()],
        };
        assert_eq!(err.to_string(), "'x' is not one of: A, B");
    }

    #[test]
    fn test_read_only_message() {
        let err = EditError::ReadOnly("id".to_string());
        assert!(err.to_string().contains("read-only"));
    }
}
