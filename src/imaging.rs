//! Image cells.
//!
//! Uploaded files are validated by extension and size, decoded, scaled down
//! to fit the configured box, re-encoded as JPEG and stored inline in the row
//! as a base64 `data:image/jpeg;base64,...` URI.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::ImageSettings;
use crate::model::{ColumnDef, ColumnType, Row};

/// File extensions accepted for upload.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

const JPEG_PREFIX: &str = "data:image/jpeg;base64,";

/// Errors that can occur while processing an image.
#[derive(Debug, Error)]
pub enum ImageError {
    /// File extension is not an image type.
    #[error("Not an image file: {0}")]
    NotAnImage(String),

    /// File exceeds the size limit.
    #[error("Image is {size} bytes, the limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },

    /// File could not be read.
    #[error("Could not read image: {0}")]
    Read(#[from] std::io::Error),

    /// Pixel data could not be decoded or encoded.
    #[error("Image processing failed: {0}")]
    Codec(#[from] image::ImageError),

    /// Stored value is not a base64 image data URI.
    #[error("Invalid image data")]
    InvalidDataUri,
}

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, ImageError>;

/// A re-encoded image ready to store in a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedImage {
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
    pub original_width: u32,
    pub original_height: u32,
    /// Size of the encoded JPEG.
    pub bytes: usize,
}

/// Facts about a stored image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub mime: String,
    pub bytes: usize,
    pub width: u32,
    pub height: u32,
}

/// One image in the image list export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageEntry {
    pub row_id: Option<u64>,
    pub field: String,
    #[serde(rename = "type")]
    pub mime: String,
    pub size: usize,
    pub width: u32,
    pub height: u32,
}

/// Check the file extension against [`IMAGE_EXTENSIONS`].
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Fit `width x height` inside `max_width x max_height`, keeping the aspect
/// ratio. Images already inside the box keep their size.
pub fn calculate_new_size(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }
    let ratio = (f64::from(max_width) / f64::from(width))
        .min(f64::from(max_height) / f64::from(height));
    let scaled = |v: u32| ((f64::from(v) * ratio).round() as u32).max(1);
    (scaled(width), scaled(height))
}

/// Validate, read and process an image file.
pub fn process_file(path: &Path, settings: &ImageSettings) -> Result<ProcessedImage> {
    if !is_image_file(path) {
        return Err(ImageError::NotAnImage(path.display().to_string()));
    }
    let size = fs::metadata(path)?.len();
    if size > settings.max_file_bytes {
        return Err(ImageError::TooLarge {
            size,
            max: settings.max_file_bytes,
        });
    }
    let bytes = fs::read(path)?;
    process_bytes(&bytes, settings)
}

/// Decode, scale and re-encode image bytes.
pub fn process_bytes(bytes: &[u8], settings: &ImageSettings) -> Result<ProcessedImage> {
    let image = image::load_from_memory(bytes)?;
    let (original_width, original_height) = (image.width(), image.height());
    let (width, height) = calculate_new_size(
        original_width,
        original_height,
        settings.max_width,
        settings.max_height,
    );
    let image = if (width, height) == (original_width, original_height) {
        image
    } else {
        image.resize_exact(width, height, FilterType::Triangle)
    };

    let jpeg = encode_jpeg(&image, settings.quality)?;
    debug!(
        original_width,
        original_height,
        width,
        height,
        bytes = jpeg.len(),
        "Processed image"
    );
    Ok(ProcessedImage {
        data_uri: format!("{}{}", JPEG_PREFIX, BASE64.encode(&jpeg)),
        width,
        height,
        original_width,
        original_height,
        bytes: jpeg.len(),
    })
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    image.to_rgb8().write_with_encoder(encoder)?;
    Ok(buf)
}

/// Decode a stored data URI far enough to report its type and size.
pub fn inspect(data_uri: &str) -> Result<ImageInfo> {
    let rest = data_uri
        .strip_prefix("data:")
        .ok_or(ImageError::InvalidDataUri)?;
    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or(ImageError::InvalidDataUri)?;
    if !mime.starts_with("image/") {
        return Err(ImageError::InvalidDataUri);
    }
    let bytes = BASE64
        .decode(payload)
        .map_err(|_| ImageError::InvalidDataUri)?;
    let (width, height) = ImageReader::new(Cursor::new(&bytes))
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(ImageInfo {
        mime: mime.to_string(),
        bytes: bytes.len(),
        width,
        height,
    })
}

/// Every stored image in the table's image columns.
///
/// Values that fail to decode are skipped.
pub fn collect_images(rows: &[Row], columns: &[ColumnDef]) -> Vec<ImageEntry> {
    let image_fields: Vec<&str> = columns
        .iter()
        .filter(|c| c.column_type == ColumnType::Image)
        .map(|c| c.field.as_str())
        .collect();

    rows.iter()
        .flat_map(|row| {
            image_fields.iter().filter_map(move |&field| {
                let value = row.get(field).filter(|v| v.is_image())?;
                let info = inspect(&value.display()).ok()?;
                Some(ImageEntry {
                    row_id: row.id(),
                    field: field.to_string(),
                    mime: info.mime,
                    size: info.bytes,
                    width: info.width,
                    height: info.height,
                })
            })
        })
        .collect()
}
