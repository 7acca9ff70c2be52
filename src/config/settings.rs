//! Image and CSV import settings.

use serde::{Deserialize, Serialize};

use super::{ConfigError, Result};

/// Limits applied to uploaded images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    /// Images are scaled down to fit inside this width.
    pub max_width: u32,
    /// Images are scaled down to fit inside this height.
    pub max_height: u32,
    /// JPEG quality of the re-encoded image, 1-100.
    pub quality: u8,
    /// Files larger than this are rejected before decoding.
    pub max_file_bytes: u64,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            max_width: 800,
            max_height: 600,
            quality: 80,
            max_file_bytes: 5 * 1024 * 1024,
        }
    }
}

impl ImageSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(ConfigError::ValidationError(
                "image.max_width and image.max_height must be greater than 0".to_string(),
            ));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::ValidationError(format!(
                "image.quality must be between 1 and 100, got {}",
                self.quality
            )));
        }
        Ok(())
    }
}

/// Defaults for the CSV import dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvSettings {
    /// Treat the first line as column titles.
    pub has_header: bool,
    /// Replace the table instead of appending to it.
    pub replace_existing: bool,
}

impl Default for CsvSettings {
    fn default() -> Self {
        Self {
            has_header: true,
            replace_existing: false,
        }
    }
}
