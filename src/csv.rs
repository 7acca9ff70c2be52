//! CSV parsing and writing.
//!
//! The dialect is deliberately small: `,` separates fields, `"` toggles
//! quoting, `""` inside quotes is a literal quote, and every field is trimmed.
//! Quoted newlines are not supported; a document is split on `\n` first.

use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::model::{CellValue, ColumnDef, ColumnType, Row, DEFAULT_COLUMN_WIDTH};

/// Rows shown in the import preview.
pub const PREVIEW_ROWS: usize = 5;

/// Errors that can occur while importing CSV.
#[derive(Debug, Error)]
pub enum CsvError {
    /// The document has no non-blank lines.
    #[error("CSV file is empty")]
    Empty,

    /// The chosen file is not a `.csv` file.
    #[error("Not a CSV file: {0}")]
    NotCsvFile(String),

    /// The file could not be read.
    #[error("Could not read CSV file: {0}")]
    Read(#[from] std::io::Error),

    /// The file is not UTF-8 text.
    #[error("CSV file is not valid UTF-8")]
    InvalidEncoding,
}

/// Result type for CSV operations.
pub type Result<T> = std::result::Result<T, CsvError>;

/// A parsed CSV document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvDocument {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// What the import dialog shows before the user confirms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvPreview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

impl CsvPreview {
    /// Whether more rows exist than are shown.
    pub fn is_truncated(&self) -> bool {
        self.total_rows > self.rows.len()
    }
}

/// Split one line into trimmed fields.
pub fn parse_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

/// Parse a whole document. Blank lines are skipped.
///
/// Without a header row, headers are generated as `Column 1..N` where N is
/// the width of the first row.
pub fn parse_document(text: &str, has_header: bool) -> Result<CsvDocument> {
    let mut lines = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .map(parse_line);

    let Some(first) = lines.next() else {
        return Err(CsvError::Empty);
    };

    let document = if has_header {
        CsvDocument {
            headers: first,
            rows: lines.collect(),
        }
    } else {
        let headers = (1..=first.len()).map(default_title).collect();
        let mut rows = vec![first];
        rows.extend(lines);
        CsvDocument { headers, rows }
    };
    debug!(
        columns = document.headers.len(),
        rows = document.rows.len(),
        has_header,
        "Parsed CSV"
    );
    Ok(document)
}

fn default_title(position: usize) -> String {
    format!("Column {}", position)
}

impl CsvDocument {
    /// The first rows and the total count.
    pub fn preview(&self) -> CsvPreview {
        CsvPreview {
            headers: self
                .headers
                .iter()
                .enumerate()
                .map(|(i, h)| {
                    if h.is_empty() {
                        default_title(i + 1)
                    } else {
                        h.clone()
                    }
                })
                .collect(),
            rows: self.rows.iter().take(PREVIEW_ROWS).cloned().collect(),
            total_rows: self.rows.len(),
        }
    }

    /// Convert to text columns `col_0..` and rows keyed by them.
    ///
    /// Short rows are padded with empty text; extra cells are dropped.
    pub fn to_table(&self) -> (Vec<ColumnDef>, Vec<Row>) {
        let columns: Vec<ColumnDef> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let title = if header.is_empty() {
                    default_title(i + 1)
                } else {
                    header.clone()
                };
                ColumnDef::new(format!("col_{}", i), title, ColumnType::Text)
                    .with_width(DEFAULT_COLUMN_WIDTH)
            })
            .collect();

        let rows = self
            .rows
            .iter()
            .map(|cells| {
                let mut row = Row::new();
                for (i, column) in columns.iter().enumerate() {
                    let value = cells.get(i).cloned().unwrap_or_default();
                    row.set(column.field.clone(), CellValue::Text(value));
                }
                row
            })
            .collect();
        (columns, rows)
    }
}

/// Quote a value when it contains `,` or `"`, doubling inner quotes.
pub fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Write a header of column titles and one line per row, joined by `\n`.
pub fn write<'a>(columns: &[ColumnDef], rows: impl IntoIterator<Item = &'a Row>) -> String {
    let mut lines = vec![columns
        .iter()
        .map(|c| escape_field(&c.title))
        .collect::<Vec<_>>()
        .join(",")];
    lines.extend(rows.into_iter().map(|row| {
        columns
            .iter()
            .map(|c| escape_field(&row.display(&c.field)))
            .collect::<Vec<_>>()
            .join(",")
    }));
    lines.join("\n")
}

/// Check that a path names a `.csv` file (case-insensitive).
pub fn ensure_csv_path(path: &Path) -> Result<()> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        Ok(())
    } else {
        Err(CsvError::NotCsvFile(path.display().to_string()))
    }
}

/// Read a CSV file as UTF-8 text.
pub fn read_file(path: &Path) -> Result<String> {
    ensure_csv_path(path)?;
    let bytes = fs::read(path)?;
    let text = String::from_utf8(bytes).map_err(|_| CsvError::InvalidEncoding)?;
    Ok(text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text))
}
