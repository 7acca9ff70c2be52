//! File exports.
//!
//! Every export produces an [`ExportFile`] (a file name and its content); the
//! caller decides where it is written. Table exports cover the rows currently
//! shown, so an active filter narrows what is exported.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::csv;
use crate::group::{GroupStats, Grouping};
use crate::imaging;
use crate::model::{ColumnDef, FilterCondition, Row, SortDirection};

/// Errors that can occur while exporting.
#[derive(Debug, Error)]
pub enum ExportError {
    /// There is nothing of the requested kind to export.
    #[error("{0}")]
    Nothing(&'static str),

    /// The content could not be serialized.
    #[error("Could not serialize export: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The file could not be written.
    #[error("Could not write export: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for exports.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Table export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    /// CSV written for spreadsheet programs; the content is plain CSV.
    Excel,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Json, ExportFormat::Csv, ExportFormat::Excel];

    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Json => "JSON",
            ExportFormat::Csv => "CSV",
            ExportFormat::Excel => "Excel (CSV)",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::Json => "table-data.json",
            ExportFormat::Csv | ExportFormat::Excel => "table-data.csv",
        }
    }

    /// Parse a CLI format name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            "excel" | "xlsx" => Some(ExportFormat::Excel),
            _ => None,
        }
    }
}

/// Export content and the name it is saved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub content: String,
    /// Extra information for the user, such as the Excel fallback.
    pub note: Option<&'static str>,
}

impl ExportFile {
    fn new(file_name: &str, content: String) -> Self {
        Self {
            file_name: file_name.to_string(),
            content,
            note: None,
        }
    }

    /// Write into `dir`, creating it. Returns the full path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.content)?;
        info!(path = %path.display(), bytes = self.content.len(), "Wrote export");
        Ok(path)
    }
}

/// Export rows in the given format.
pub fn export_table(format: ExportFormat, columns: &[ColumnDef], rows: &[&Row]) -> Result<ExportFile> {
    if rows.is_empty() {
        return Err(ExportError::Nothing("No data to export"));
    }
    let file = match format {
        ExportFormat::Json => ExportFile::new(format.file_name(), serde_json::to_string_pretty(rows)?),
        ExportFormat::Csv => ExportFile::new(format.file_name(), csv::write(columns, rows.iter().copied())),
        ExportFormat::Excel => ExportFile {
            note: Some("Exported as CSV (Excel compatible)"),
            ..ExportFile::new(format.file_name(), csv::write(columns, rows.iter().copied()))
        },
    };
    Ok(file)
}

/// The active filter conditions as a JSON array.
pub fn export_filters(conditions: &[FilterCondition]) -> Result<ExportFile> {
    if conditions.is_empty() {
        return Err(ExportError::Nothing("No filter conditions to export"));
    }
    Ok(ExportFile::new(
        "filter_conditions.json",
        serde_json::to_string_pretty(conditions)?,
    ))
}

#[derive(Serialize)]
struct GroupedRows<'a> {
    group: &'a str,
    rows: Vec<&'a Row>,
}

#[derive(Serialize)]
struct GroupedExport<'a> {
    group_field: &'a str,
    group_sort: SortDirection,
    groups: Vec<GroupedRows<'a>>,
    stats: GroupStats,
}

/// Rows of every group in display order, with the grouping stats.
pub fn export_grouped(grouping: Option<&Grouping>, rows: &[Row]) -> Result<ExportFile> {
    let grouping = grouping.ok_or(ExportError::Nothing("Apply a grouping first"))?;
    let groups = grouping
        .groups
        .iter()
        .map(|g| GroupedRows {
            group: &g.key,
            rows: g.rows.iter().filter_map(|&i| rows.get(i)).collect(),
        })
        .collect();
    let export = GroupedExport {
        group_field: &grouping.config.field,
        group_sort: grouping.config.sort,
        groups,
        stats: grouping.stats(),
    };
    Ok(ExportFile::new(
        "grouped_data.json",
        serde_json::to_string_pretty(&export)?,
    ))
}

/// Per-group statistics of the number columns.
pub fn export_group_summary(
    grouping: Option<&Grouping>,
    rows: &[Row],
    columns: &[ColumnDef],
) -> Result<ExportFile> {
    let grouping = grouping.ok_or(ExportError::Nothing("Apply a grouping first"))?;
    Ok(ExportFile::new(
        "group_summary.json",
        serde_json::to_string_pretty(&grouping.summary(rows, columns))?,
    ))
}

/// The list of stored images.
pub fn export_images(rows: &[Row], columns: &[ColumnDef]) -> Result<ExportFile> {
    let images = imaging::collect_images(rows, columns);
    if images.is_empty() {
        return Err(ExportError::Nothing("No images to export"));
    }
    Ok(ExportFile::new(
        "images_data.json",
        serde_json::to_string_pretty(&images)?,
    ))
}
