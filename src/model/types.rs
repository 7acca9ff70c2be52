//! Row, cell and column types.
//!
//! These types serialize to the same JSON layout the snapshot document uses:
//! a row is a flat object keyed by field name, a column is an object with
//! `field`, `title`, `width`, `type`, `editable` and optional `options`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Field name that carries a row's numeric identity.
pub const ID_FIELD: &str = "id";

/// Width given to new columns, in pixels.
pub const DEFAULT_COLUMN_WIDTH: u16 = 120;

/// Columns cannot be resized below this width, in pixels.
pub const MIN_COLUMN_WIDTH: u16 = 100;

/// Largest id that survives a round trip through a JSON number.
const MAX_ROW_ID: f64 = 9_007_199_254_740_992.0;

/// Prefix that marks a text cell as an inline image.
const IMAGE_PREFIX: &str = "data:image/";

/// A single cell value.
///
/// Serialized untagged: `null`, a JSON number, or a JSON string. Image cells
/// are strings holding a base64 `data:image/...` URI.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// No value.
    #[default]
    Null,
    /// A numeric value.
    #[serde(serialize_with = "serialize_number")]
    Number(f64),
    /// A text value (also used for dates, select options and images).
    Text(String),
}

/// Integral numbers are written without a fraction so ids stay `1`, not `1.0`.
fn serialize_number<S>(n: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    if n.fract() == 0.0 && n.abs() < 1e15 {
        serializer.serialize_i64(*n as i64)
    } else {
        serializer.serialize_f64(*n)
    }
}

impl CellValue {
    /// Create a text value.
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    /// An empty text value, the representation of a blank cell.
    pub fn empty() -> Self {
        CellValue::Text(String::new())
    }

    /// Check whether the cell is null or blank text.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Number(_) => false,
            CellValue::Text(s) => s.is_empty(),
        }
    }

    /// Interpret the cell as a number.
    ///
    /// Text cells are parsed after trimming; blank text is not a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Null => None,
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
                }
            }
        }
    }

    /// Check whether this cell holds an inline image.
    pub fn is_image(&self) -> bool {
        matches!(self, CellValue::Text(s) if s.starts_with(IMAGE_PREFIX))
    }

    /// The string form used for display, filtering, grouping and export.
    pub fn display(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<u64> for CellValue {
    fn from(value: u64) -> Self {
        CellValue::Number(value as f64)
    }
}

/// One record in the grid, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    cells: BTreeMap<String, CellValue>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter, mostly useful in tests and sample data.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.cells.insert(field.into(), value.into());
        self
    }

    /// Get the value for a field.
    pub fn get(&self, field: &str) -> Option<&CellValue> {
        self.cells.get(field)
    }

    /// Get the display string for a field; missing fields display as empty.
    pub fn display(&self, field: &str) -> String {
        self.cells.get(field).map(CellValue::display).unwrap_or_default()
    }

    /// Set the value for a field.
    pub fn set(&mut self, field: impl Into<String>, value: CellValue) {
        self.cells.insert(field.into(), value);
    }

    /// Check whether the row has an entry for a field.
    pub fn contains_field(&self, field: &str) -> bool {
        self.cells.contains_key(field)
    }

    /// Remove a field, returning its previous value.
    pub fn remove(&mut self, field: &str) -> Option<CellValue> {
        self.cells.remove(field)
    }

    /// The row's numeric identity, if it has one.
    ///
    /// Numbers past 2^53 cannot be stored exactly and are not treated as ids.
    pub fn id(&self) -> Option<u64> {
        self.cells
            .get(ID_FIELD)
            .and_then(CellValue::as_f64)
            .filter(|n| (0.0..=MAX_ROW_ID).contains(n))
            .map(|n| n as u64)
    }

    /// Set the row's numeric identity.
    pub fn set_id(&mut self, id: u64) {
        self.cells.insert(ID_FIELD.to_string(), CellValue::from(id));
    }

    /// Iterate over `(field, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &CellValue)> {
        self.cells.iter()
    }

    /// Number of fields present.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check whether the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Semantic type of a column, controlling editing, sorting and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Text,
    Number,
    Date,
    Select,
    Image,
    Email,
}

impl ColumnType {
    /// All column types, in the order offered by the add-column dialog.
    pub const ALL: [ColumnType; 6] = [
        ColumnType::Text,
        ColumnType::Number,
        ColumnType::Date,
        ColumnType::Select,
        ColumnType::Image,
        ColumnType::Email,
    ];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ColumnType::Text => "Text",
            ColumnType::Number => "Number",
            ColumnType::Date => "Date",
            ColumnType::Select => "Select",
            ColumnType::Image => "Image",
            ColumnType::Email => "Email",
        }
    }

    /// Key used in serialized form (`"text"`, `"number"`, ...).
    pub fn key(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Number => "number",
            ColumnType::Date => "date",
            ColumnType::Select => "select",
            ColumnType::Image => "image",
            ColumnType::Email => "email",
        }
    }

    /// Image columns cannot be used as a grouping key.
    pub fn is_groupable(&self) -> bool {
        !matches!(self, ColumnType::Image)
    }
}

fn default_width() -> u16 {
    DEFAULT_COLUMN_WIDTH
}

fn default_true() -> bool {
    true
}

/// Metadata describing a field's display and edit behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Field name used as the key in each row.
    pub field: String,
    /// Display title.
    pub title: String,
    /// Width in pixels.
    #[serde(default = "default_width")]
    pub width: u16,
    /// Semantic type.
    #[serde(rename = "type", default)]
    pub column_type: ColumnType,
    /// Whether cells in this column can be edited.
    #[serde(default = "default_true")]
    pub editable: bool,
    /// Allowed values for `select` columns, in display order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl ColumnDef {
    /// Create an editable column with the default width.
    pub fn new(field: impl Into<String>, title: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            field: field.into(),
            title: title.into(),
            width: DEFAULT_COLUMN_WIDTH,
            column_type,
            editable: true,
            options: Vec::new(),
        }
    }

    /// Set the width.
    pub fn with_width(mut self, width: u16) -> Self {
        self.width = width;
        self
    }

    /// Set the select options.
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the column read-only.
    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    /// Width in terminal cells; one cell is roughly eight pixels.
    pub fn char_width(&self) -> u16 {
        (self.width / 8).max(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_untagged_json() {
        let row: Row = serde_json::from_str(r#"{"id": 3, "name": "Ann", "note": null}"#).unwrap();
        assert_eq!(row.get("id"), Some(&CellValue::Number(3.0)));
        assert_eq!(row.get("name"), Some(&CellValue::text("Ann")));
        assert_eq!(row.get("note"), Some(&CellValue::Null));

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"id":3,"name":"Ann","note":null}"#);
    }

    #[test]
    fn test_number_display_drops_trailing_zero() {
        assert_eq!(CellValue::Number(25.0).display(), "25");
        assert_eq!(CellValue::Number(2.5).display(), "2.5");
        assert_eq!(CellValue::Null.display(), "");
    }

    #[test]
    fn test_as_f64() {
        assert_eq!(CellValue::text(" 42 ").as_f64(), Some(42.0));
        assert_eq!(CellValue::text("").as_f64(), None);
        assert_eq!(CellValue::text("abc").as_f64(), None);
        assert_eq!(CellValue::Null.as_f64(), None);
    }

    #[test]
    fn test_is_image() {
        assert!(CellValue::text("data:image/jpeg;base64,AAAA").is_image());
        assert!(!CellValue::text("image.png").is_image());
        assert!(!CellValue::Number(1.0).is_image());
    }

    #[test]
    fn test_row_id() {
        let row = Row::new().with("id", 7u64);
        assert_eq!(row.id(), Some(7));
        let row = Row::new().with("id", "12");
        assert_eq!(row.id(), Some(12));
        assert_eq!(Row::new().id(), None);
    }

    #[test]
    fn test_column_def_deserialize_defaults() {
        let col: ColumnDef =
            serde_json::from_str(r#"{"field":"col_0","title":"Name","sort":true}"#).unwrap();
        assert_eq!(col.width, DEFAULT_COLUMN_WIDTH);
        assert_eq!(col.column_type, ColumnType::Text);
        assert!(col.editable);
        assert!(col.options.is_empty());
    }

    #[test]
    fn test_column_def_type_key() {
        let col = ColumnDef::new("status", "Status", ColumnType::Select).with_options(["A", "B"]);
        let json = serde_json::to_value(&col).unwrap();
        assert_eq!(json["type"], "select");
        assert_eq!(json["options"][1], "B");
    }

    #[test]
    fn test_image_not_groupable() {
        assert!(!ColumnType::Image.is_groupable());
        assert!(ColumnType::Select.is_groupable());
    }
}
