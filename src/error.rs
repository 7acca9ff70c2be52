//! Centralized error types for LazyTable.
//!
//! Each concern has its own `thiserror` enum; [`AppError`] aggregates them
//! and turns them into messages suitable for a toast or an error dialog.

use thiserror::Error;

use crate::config::ConfigError;
use crate::csv::CsvError;
use crate::export::ExportError;
use crate::imaging::ImageError;
use crate::storage::{format_size, StorageError};
use crate::table::EditError;

/// The main application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration-related errors.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A cell, row or column edit was rejected.
    #[error("{0}")]
    Edit(#[from] EditError),

    /// CSV import failed.
    #[error("{0}")]
    Csv(#[from] CsvError),

    /// Image upload failed.
    #[error("{0}")]
    Image(#[from] ImageError),

    /// Saving or loading failed.
    #[error("{0}")]
    Storage(#[from] StorageError),

    /// Export failed.
    #[error("{0}")]
    Export(#[from] ExportError),

    /// IO errors (file system, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal-related errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Generic errors with a message.
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Create a terminal error.
    pub fn terminal(msg: impl Into<String>) -> Self {
        AppError::Terminal(msg.into())
    }

    /// Create a generic error.
    pub fn other(msg: impl Into<String>) -> Self {
        AppError::Other(msg.into())
    }

    /// Get a user-friendly message for display.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(e) => match e {
                ConfigError::NoConfigDir => "No configuration directory on this system.".to_string(),
                ConfigError::CreateDirError(_) | ConfigError::WriteError(_) => {
                    "The configuration could not be written.".to_string()
                }
                ConfigError::ReadError(_) => "config.toml could not be read.".to_string(),
                ConfigError::ParseError(_) => "config.toml is not valid TOML.".to_string(),
                ConfigError::SerializeError(_) => "The configuration could not be encoded.".to_string(),
                ConfigError::ValidationError(msg) => format!("Invalid setting: {}", msg),
            },
            AppError::Edit(e) => e.to_string(),
            AppError::Csv(e) => match e {
                CsvError::Empty => "The CSV file is empty.".to_string(),
                CsvError::NotCsvFile(_) => "Please choose a .csv file.".to_string(),
                CsvError::Read(_) => "Could not read the CSV file.".to_string(),
                CsvError::InvalidEncoding => "The CSV file is not UTF-8 text.".to_string(),
            },
            AppError::Image(e) => match e {
                ImageError::NotAnImage(_) => "Please choose an image file.".to_string(),
                ImageError::TooLarge { max, .. } => {
                    format!("Image is too large (max {}).", format_size(*max))
                }
                ImageError::Read(_) => "Could not read the image file.".to_string(),
                ImageError::Codec(_) => "Image processing failed.".to_string(),
                ImageError::InvalidDataUri => "The stored image is damaged.".to_string(),
            },
            AppError::Storage(e) => match e {
                StorageError::NoDataDir => {
                    "Could not find a data directory. Set data_dir in the configuration."
                        .to_string()
                }
                StorageError::QuotaExceeded { .. } => {
                    "Storage is full. Remove some images or rows.".to_string()
                }
                StorageError::Io(_) | StorageError::Serialize(_) => "Save failed.".to_string(),
            },
            AppError::Export(e) => match e {
                ExportError::Nothing(msg) => (*msg).to_string(),
                ExportError::Serialize(_) | ExportError::Io(_) => "Export failed.".to_string(),
            },
            AppError::Io(e) => format!("File error: {}", e),
            AppError::Terminal(msg) => format!("Terminal error: {}", msg),
            AppError::Other(msg) => msg.clone(),
        }
    }

    /// Check if this error is critical and requires user acknowledgment.
    ///
    /// Critical errors get a dialog; the rest are shown as toasts.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            AppError::Config(_)
                | AppError::Storage(StorageError::NoDataDir)
                | AppError::Terminal(_)
        )
    }

    /// Check if this error is recoverable.
    ///
    /// Recoverable errors leave the table untouched; the user can fix the
    /// input and try again.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Edit(_)
                | AppError::Csv(_)
                | AppError::Image(_)
                | AppError::Export(ExportError::Nothing(_))
        )
    }

    /// Get a suggested action for the user.
    pub fn suggested_action(&self) -> Option<&'static str> {
        match self {
            AppError::Config(ConfigError::ParseError(_)) => {
                Some("Fix or delete ~/.config/lazytable/config.toml and restart.")
            }
            AppError::Storage(StorageError::QuotaExceeded { .. }) => {
                Some("Clear image cells or export and reset the data.")
            }
            AppError::Storage(StorageError::NoDataDir) => {
                Some("Pass --data-dir or set data_dir in config.toml.")
            }
            AppError::Image(ImageError::TooLarge { .. }) => {
                Some("Choose an image smaller than the limit.")
            }
            _ => None,
        }
    }
}

/// Result type for application operations.
pub type Result<T> = std::result::Result<T, AppError>;
