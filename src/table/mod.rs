//! The table manager.
//!
//! [`Table`] owns the column definitions, the row vector, the row selection
//! and per-column sort state. Every row or column mutation in the editor goes
//! through it; the grid view is rebuilt from its contents on every frame.

mod defaults;
mod error;

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;
use rand::Rng;
use tracing::debug;

use crate::model::{
    CellValue, ColumnDef, ColumnType, Row, Snapshot, SortDirection, DEFAULT_COLUMN_WIDTH,
    ID_FIELD, MIN_COLUMN_WIDTH,
};

pub use defaults::{default_columns, sample_rows, today, DEPARTMENTS, STATUSES};
pub use error::{EditError, Result};

/// Date format accepted by date columns.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parameters for a column created by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct NewColumn {
    pub title: String,
    pub column_type: ColumnType,
    pub width: Option<u16>,
    pub options: Vec<String>,
}

impl NewColumn {
    pub fn new(title: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            title: title.into(),
            column_type,
            width: None,
            options: Vec::new(),
        }
    }
}

/// Outcome of a CSV import into the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOutcome {
    /// Rows added to the table.
    pub rows: usize,
    /// Columns added (or adopted, in replace mode).
    pub columns: usize,
}

/// Rows, columns and selection state of the editor.
#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<ColumnDef>,
    rows: Vec<Row>,
    selected: BTreeSet<usize>,
    anchor: Option<usize>,
    sort_state: HashMap<String, SortDirection>,
}

impl Default for Table {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Table {
    /// Create a table with the default column set and no rows.
    pub fn with_defaults() -> Self {
        Self::new(default_columns(), Vec::new())
    }

    /// Create a table from columns and rows.
    pub fn new(columns: Vec<ColumnDef>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            selected: BTreeSet::new(),
            anchor: None,
            sort_state: HashMap::new(),
        }
    }

    /// Restore a table from a persisted snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self::new(snapshot.columns, snapshot.data)
    }

    /// Build the persisted snapshot of the current rows and columns.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::now(self.rows.clone(), self.columns.clone())
    }

    // ---- accessors ----

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn column(&self, field: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.field == field)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Find the current index of the row with the given id.
    pub fn index_of_id(&self, id: u64) -> Option<usize> {
        self.rows.iter().position(|r| r.id() == Some(id))
    }

    /// Current sort direction of a column, if it has been sorted.
    pub fn sort_direction(&self, field: &str) -> Option<SortDirection> {
        self.sort_state.get(field).copied()
    }

    // ---- rows ----

    /// Replace all rows with `count` generated sample rows.
    pub fn generate_sample_rows(&mut self, count: usize) {
        self.rows = sample_rows(&self.columns, count);
        self.clear_selection();
        debug!(count, "Generated sample rows");
    }

    /// The id the next new row receives: max existing id + 1, or 1.
    pub fn next_id(&self) -> u64 {
        self.rows
            .iter()
            .filter_map(Row::id)
            .max()
            .map_or(1, |max| max.saturating_add(1))
    }

    /// A new row with a fresh id and every other column blank.
    pub fn empty_record(&self) -> Row {
        let mut row = Row::new();
        row.set_id(self.next_id());
        for column in self.columns.iter().filter(|c| c.field != ID_FIELD) {
            row.set(column.field.clone(), CellValue::empty());
        }
        row
    }

    /// Append a row pre-filled with new-employee defaults. Returns its index.
    pub fn add_row(&mut self) -> usize {
        let mut row = self.empty_record();
        let first_option = |field: &str| {
            self.column(field)
                .and_then(|c| c.options.first().cloned())
                .unwrap_or_default()
        };
        let defaults = [
            ("name", CellValue::text(defaults::NEW_ROW_NAME)),
            ("age", CellValue::Number(defaults::NEW_ROW_AGE)),
            ("department", CellValue::Text(first_option("department"))),
            ("joinDate", CellValue::Text(today())),
            ("status", CellValue::Text(first_option("status"))),
        ];
        for (field, value) in defaults {
            if self.column(field).is_some() {
                row.set(field, value);
            }
        }

        self.rows.push(row);
        let index = self.rows.len() - 1;
        debug!(index, "Added row");
        index
    }

    /// Insert an empty row after `after`. Returns the new row's index.
    pub fn insert_row(&mut self, after: usize) -> Result<usize> {
        if after >= self.rows.len() {
            return Err(EditError::RowOutOfRange(after));
        }
        let row = self.empty_record();
        let index = after + 1;
        self.rows.insert(index, row);
        self.selected = self
            .selected
            .iter()
            .map(|&i| if i >= index { i + 1 } else { i })
            .collect();
        debug!(index, "Inserted row");
        Ok(index)
    }

    /// Remove a row; selected indices above it shift down by one.
    pub fn delete_row(&mut self, index: usize) -> Result<Row> {
        if index >= self.rows.len() {
            return Err(EditError::RowOutOfRange(index));
        }
        let removed = self.rows.remove(index);
        self.selected = self
            .selected
            .iter()
            .filter(|&&i| i != index)
            .map(|&i| if i > index { i - 1 } else { i })
            .collect();
        if self.anchor == Some(index) {
            self.anchor = None;
        }
        debug!(index, "Deleted row");
        Ok(removed)
    }

    /// Duplicate a row under a new id, inserted right after the source.
    pub fn copy_row(&mut self, index: usize) -> Result<usize> {
        let mut copy = self
            .rows
            .get(index)
            .cloned()
            .ok_or(EditError::RowOutOfRange(index))?;
        copy.set_id(self.next_id());
        let target = index + 1;
        self.rows.insert(target, copy);
        self.selected = self
            .selected
            .iter()
            .map(|&i| if i >= target { i + 1 } else { i })
            .collect();
        debug!(source = index, target, "Copied row");
        Ok(target)
    }

    /// Delete every selected row. Returns how many were removed.
    pub fn delete_selected_rows(&mut self) -> usize {
        let indices: Vec<usize> = self.selected.iter().rev().copied().collect();
        for &index in &indices {
            if index < self.rows.len() {
                self.rows.remove(index);
            }
        }
        self.clear_selection();
        debug!(count = indices.len(), "Deleted selected rows");
        indices.len()
    }

    /// Remove all rows, keeping the columns.
    pub fn clear_rows(&mut self) {
        self.rows.clear();
        self.clear_selection();
        debug!("Cleared all rows");
    }

    /// Restore the default columns with no rows.
    pub fn reset_to_defaults(&mut self) {
        self.columns = default_columns();
        self.rows.clear();
        self.sort_state.clear();
        self.clear_selection();
    }

    /// Reset columns to the defaults and regenerate sample rows.
    pub fn clear_all(&mut self, sample_rows: usize) {
        self.reset_to_defaults();
        self.generate_sample_rows(sample_rows);
        debug!("Reset table to defaults");
    }

    // ---- cells ----

    /// Update a cell from user input, coercing it to the column's type.
    pub fn set_cell(&mut self, index: usize, field: &str, raw: &str) -> Result<()> {
        if index >= self.rows.len() {
            return Err(EditError::RowOutOfRange(index));
        }
        let column = self
            .column(field)
            .ok_or_else(|| EditError::UnknownColumn(field.to_string()))?;
        if !column.editable {
            return Err(EditError::ReadOnly(column.title.clone()));
        }
        let value = coerce(column, raw)?;

        self.rows[index].set(field, value);
        debug!(index, field, "Updated cell");
        Ok(())
    }

    /// Store an uploaded image on the row with the given id.
    ///
    /// Returns `false` when the row no longer exists.
    pub fn set_image(&mut self, row_id: u64, field: &str, data_uri: String) -> Result<bool> {
        let column = self
            .column(field)
            .ok_or_else(|| EditError::UnknownColumn(field.to_string()))?;
        if column.column_type != ColumnType::Image {
            return Err(EditError::InvalidImage);
        }
        let Some(index) = self.index_of_id(row_id) else {
            return Ok(false);
        };
        self.rows[index].set(field, CellValue::Text(data_uri));
        debug!(row_id, field, "Stored image");
        Ok(true)
    }

    /// Blank a set of cells. Read-only columns are skipped.
    ///
    /// Returns the number of cells cleared.
    pub fn clear_cells(&mut self, cells: &[(usize, String)]) -> usize {
        let editable: HashSet<&str> = self
            .columns
            .iter()
            .filter(|c| c.editable)
            .map(|c| c.field.as_str())
            .collect();
        let mut cleared = 0;
        for (index, field) in cells {
            if !editable.contains(field.as_str()) {
                continue;
            }
            if let Some(row) = self.rows.get_mut(*index) {
                row.set(field.clone(), CellValue::empty());
                cleared += 1;
            }
        }
        debug!(cleared, "Cleared cells");
        cleared
    }

    // ---- columns ----

    /// Append a user-defined column; existing rows get a blank value for it.
    ///
    /// Returns the generated field name.
    pub fn add_column(&mut self, new_column: NewColumn) -> Result<String> {
        let title = new_column.title.trim();
        if title.is_empty() {
            return Err(EditError::EmptyTitle);
        }
        let field = self.generate_field();
        let mut column = ColumnDef::new(field.clone(), title, new_column.column_type)
            .with_width(new_column.width.unwrap_or(DEFAULT_COLUMN_WIDTH).max(MIN_COLUMN_WIDTH));
        if new_column.column_type == ColumnType::Select {
            column.options = new_column
                .options
                .iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        for row in &mut self.rows {
            row.set(field.clone(), CellValue::empty());
        }
        self.columns.push(column);
        debug!(field = %field, title, "Added column");
        Ok(field)
    }

    fn generate_field(&self) -> String {
        const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let mut rng = rand::rng();
        loop {
            let suffix: String = (0..9)
                .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
                .collect();
            let field = format!("col_{}", suffix);
            if self.column(&field).is_none() {
                return field;
            }
        }
    }

    /// Change a column's width by `delta`, never below the minimum.
    ///
    /// Returns the new width.
    pub fn resize_column(&mut self, field: &str, delta: i32) -> Result<u16> {
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.field == field)
            .ok_or_else(|| EditError::UnknownColumn(field.to_string()))?;
        let width = (i32::from(column.width) + delta)
            .clamp(i32::from(MIN_COLUMN_WIDTH), i32::from(u16::MAX));
        column.width = width as u16;
        debug!(field, width, "Resized column");
        Ok(column.width)
    }

    /// Sort rows by a column, toggling its direction. The first sort ascends.
    ///
    /// Selection is cleared because row indices change.
    pub fn sort_by_column(&mut self, field: &str) -> Result<SortDirection> {
        let column = self
            .column(field)
            .cloned()
            .ok_or_else(|| EditError::UnknownColumn(field.to_string()))?;
        let direction = match self.sort_state.get(field) {
            Some(SortDirection::Asc) => SortDirection::Desc,
            _ => SortDirection::Asc,
        };
        self.sort_state.clear();
        self.sort_state.insert(field.to_string(), direction);

        self.rows.sort_by(|a, b| {
            let ord = compare_cells(column.column_type, a.get(field), b.get(field));
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
        self.clear_selection();
        debug!(field, direction = direction.label(), "Sorted rows");
        Ok(direction)
    }

    // ---- selection ----

    /// Toggle a row's selection and make it the range anchor.
    pub fn toggle_row(&mut self, index: usize) {
        if index >= self.rows.len() {
            return;
        }
        if !self.selected.remove(&index) {
            self.selected.insert(index);
        }
        self.anchor = Some(index);
    }

    /// Select every row between the anchor and `index`, inclusive, in display
    /// order.
    ///
    /// `order` lists the displayed row indices; rows outside it are never
    /// selected. Without a displayed anchor this selects just `index`.
    pub fn select_range(&mut self, index: usize, order: &[usize]) {
        let Some(end) = order.iter().position(|&i| i == index) else {
            return;
        };
        let start = self
            .anchor
            .and_then(|anchor| order.iter().position(|&i| i == anchor))
            .unwrap_or(end);
        let (from, to) = if start <= end { (start, end) } else { (end, start) };
        let len = self.rows.len();
        self.selected
            .extend(order[from..=to].iter().copied().filter(|&i| i < len));
        self.anchor = Some(index);
    }

    /// Select exactly the displayed rows.
    pub fn select_all(&mut self, visible: &[usize]) {
        let len = self.rows.len();
        self.selected = visible.iter().copied().filter(|&i| i < len).collect();
    }

    /// Drop selected rows that are no longer displayed.
    pub fn retain_selection(&mut self, visible: &[usize]) {
        self.selected.retain(|i| visible.contains(i));
        if self.anchor.is_some_and(|a| !visible.contains(&a)) {
            self.anchor = None;
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
        self.anchor = None;
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    /// Selected row indices in ascending order.
    pub fn selected_rows(&self) -> Vec<usize> {
        self.selected.iter().copied().collect()
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Status text such as `"50 records, 3 selected"`.
    pub fn record_count_label(&self) -> String {
        let mut label = format!("{} records", self.rows.len());
        if !self.selected.is_empty() {
            label.push_str(&format!(", {} selected", self.selected.len()));
        }
        label
    }

    // ---- import ----

    /// Bring parsed CSV columns and rows into the table.
    ///
    /// Replace mode swaps in the new columns (all editable) and rows. Merge
    /// mode adopts the new columns when the table has no rows; otherwise
    /// every incoming field that collides with an existing one is renamed
    /// (`field_1`, `field_2`, ...), the new columns are appended, existing rows
    /// receive blank values for them and the incoming rows are appended.
    pub fn import_csv(
        &mut self,
        columns: Vec<ColumnDef>,
        rows: Vec<Row>,
        replace: bool,
    ) -> ImportOutcome {
        let outcome = ImportOutcome {
            rows: rows.len(),
            columns: columns.len(),
        };
        let editable = |columns: Vec<ColumnDef>| -> Vec<ColumnDef> {
            columns
                .into_iter()
                .map(|mut c| {
                    c.editable = true;
                    c
                })
                .collect()
        };

        if replace || self.rows.is_empty() {
            self.columns = editable(columns);
            self.rows = rows;
            self.sort_state.clear();
            self.clear_selection();
            debug!(rows = outcome.rows, replace, "Imported CSV into table");
            return outcome;
        }

        let mut existing: HashSet<String> = self.columns.iter().map(|c| c.field.clone()).collect();
        let mut mapping: HashMap<String, String> = HashMap::new();
        for mut column in editable(columns) {
            let original = column.field.clone();
            let mut field = original.clone();
            let mut counter = 1;
            while existing.contains(&field) {
                field = format!("{}_{}", original, counter);
                counter += 1;
            }
            existing.insert(field.clone());
            mapping.insert(original, field.clone());
            column.field = field;
            self.columns.push(column);
        }

        for row in &mut self.rows {
            for field in mapping.values() {
                if !row.contains_field(field) {
                    row.set(field.clone(), CellValue::empty());
                }
            }
        }
        self.rows.extend(rows.into_iter().map(|row| {
            let mut remapped = Row::new();
            for (field, value) in row.iter() {
                let target = mapping.get(field).unwrap_or(field);
                remapped.set(target.clone(), value.clone());
            }
            remapped
        }));
        debug!(rows = outcome.rows, columns = outcome.columns, "Merged CSV into table");
        outcome
    }
}

/// Convert raw input to a value for the column, validating by type.
fn coerce(column: &ColumnDef, raw: &str) -> Result<CellValue> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(CellValue::empty());
    }
    match column.column_type {
        ColumnType::Number => trimmed
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(CellValue::Number)
            .ok_or_else(|| EditError::InvalidNumber {
                value: raw.to_string(),
            }),
        ColumnType::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
            .map(|d| CellValue::Text(d.format(DATE_FORMAT).to_string()))
            .map_err(|_| EditError::InvalidDate {
                value: raw.to_string(),
            }),
        ColumnType::Select => {
            if column.options.is_empty() || column.options.iter().any(|o| o == trimmed) {
                Ok(CellValue::text(trimmed))
            } else {
                Err(EditError::InvalidOption {
                    value: raw.to_string(),
                    options: column.options.clone(),
                })
            }
        }
        ColumnType::Email => {
            if is_valid_email(trimmed) {
                Ok(CellValue::text(trimmed))
            } else {
                Err(EditError::InvalidEmail {
                    value: raw.to_string(),
                })
            }
        }
        ColumnType::Image => {
            if CellValue::text(trimmed).is_image() {
                Ok(CellValue::text(trimmed))
            } else {
                Err(EditError::InvalidImage)
            }
        }
        ColumnType::Text => Ok(CellValue::text(raw)),
    }
}

/// `local@domain.tld`: one `@`, no whitespace, a dot inside the domain.
pub fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .rfind('.')
        .is_some_and(|dot| dot > 0 && dot < domain.len() - 1)
}

/// Compare two cells the way a column of `column_type` sorts.
///
/// Numbers compare numerically with unparseable values as 0, dates
/// chronologically with unparseable values first, everything else by
/// lowercase text.
pub fn compare_cells(
    column_type: ColumnType,
    a: Option<&CellValue>,
    b: Option<&CellValue>,
) -> Ordering {
    match column_type {
        ColumnType::Number => {
            let x = a.and_then(CellValue::as_f64).unwrap_or(0.0);
            let y = b.and_then(CellValue::as_f64).unwrap_or(0.0);
            x.total_cmp(&y)
        }
        ColumnType::Date => parse_date(a).cmp(&parse_date(b)),
        _ => {
            let x = a.map(CellValue::display).unwrap_or_default().to_lowercase();
            let y = b.map(CellValue::display).unwrap_or_default().to_lowercase();
            x.cmp(&y)
        }
    }
}

/// Parse a cell as a `YYYY-MM-DD` date.
pub fn parse_date(value: Option<&CellValue>) -> Option<NaiveDate> {
    let text = value?.display();
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_rows(count: usize) -> Table {
        let mut table = Table::with_defaults();
        for _ in 0..count {
            table.add_row();
        }
        table
    }

    #[test]
    fn test_with_defaults_is_empty() {
        let table = Table::with_defaults();
        assert!(table.is_empty());
        assert_eq!(table.columns().len(), 8);
        assert_eq!(table.next_id(), 1);
    }

    #[test]
    fn test_next_id_is_max_plus_one() {
        let mut table = Table::new(
            default_columns(),
            vec![
                Row::new().with("id", 4u64),
                Row::new().with("id", 9u64),
                Row::new().with("name", "no id"),
            ],
        );
        assert_eq!(table.next_id(), 10);
        let index = table.add_row();
        assert_eq!(table.row(index).unwrap().id(), Some(10));
    }

    #[test]
    fn test_empty_record_blanks_every_column() {
        let table = table_with_rows(2);
        let record = table.empty_record();
        assert_eq!(record.id(), Some(3));
        assert_eq!(record.get("name"), Some(&CellValue::empty()));
        assert_eq!(record.len(), table.columns().len());
    }

    #[test]
    fn test_add_row_defaults() {
        let mut table = Table::with_defaults();
        let index = table.add_row();
        let row = table.row(index).unwrap();
        assert_eq!(row.display("name"), "New employee");
        assert_eq!(row.get("age"), Some(&CellValue::Number(25.0)));
        assert_eq!(row.display("department"), DEPARTMENTS[0]);
        assert_eq!(row.display("status"), STATUSES[0]);
        assert_eq!(row.display("joinDate"), today());
        assert_eq!(row.display("email"), "");
    }

    #[test]
    fn test_insert_row_after_index() {
        let mut table = table_with_rows(3);
        let index = table.insert_row(0).unwrap();
        assert_eq!(index, 1);
        assert_eq!(table.len(), 4);
        assert_eq!(table.row(1).unwrap().id(), Some(4));
        assert_eq!(table.row(1).unwrap().display("name"), "");
        assert!(table.insert_row(10).is_err());
    }

    #[test]
    fn test_delete_row_reindexes_selection() {
        let mut table = table_with_rows(6);
        table.toggle_row(1);
        table.toggle_row(3);
        table.toggle_row(5);

        table.delete_row(3).unwrap();
        assert_eq!(table.selected_rows(), vec![1, 4]);
        assert_eq!(table.len(), 5);

        table.delete_row(0).unwrap();
        assert_eq!(table.selected_rows(), vec![0, 3]);
    }

    #[test]
    fn test_delete_row_out_of_range() {
        let mut table = table_with_rows(1);
        assert_eq!(table.delete_row(1), Err(EditError::RowOutOfRange(1)));
    }

    #[test]
    fn test_copy_row_new_id_after_source() {
        let mut table = table_with_rows(3);
        table.set_cell(0, "name", "Ann").unwrap();
        let target = table.copy_row(0).unwrap();
        assert_eq!(target, 1);
        let copy = table.row(1).unwrap();
        assert_eq!(copy.display("name"), "Ann");
        assert_eq!(copy.id(), Some(4));
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_delete_selected_rows() {
        let mut table = table_with_rows(5);
        assert_eq!(table.delete_selected_rows(), 0);

        table.toggle_row(0);
        table.toggle_row(2);
        table.toggle_row(4);
        assert_eq!(table.delete_selected_rows(), 3);
        assert_eq!(table.len(), 2);
        let ids: Vec<_> = table.rows().iter().filter_map(Row::id).collect();
        assert_eq!(ids, vec![2, 4]);
        assert_eq!(table.selected_count(), 0);
    }

    #[test]
    fn test_set_cell_number_coercion() {
        let mut table = table_with_rows(1);
        table.set_cell(0, "age", " 41 ").unwrap();
        assert_eq!(table.row(0).unwrap().get("age"), Some(&CellValue::Number(41.0)));

        table.set_cell(0, "age", "").unwrap();
        assert_eq!(table.row(0).unwrap().get("age"), Some(&CellValue::empty()));

        let err = table.set_cell(0, "age", "old").unwrap_err();
        assert!(matches!(err, EditError::InvalidNumber { .. }));
    }

    #[test]
    fn test_set_cell_validation() {
        let mut table = table_with_rows(1);
        assert!(table.set_cell(0, "joinDate", "2024-02-29").is_ok());
        assert!(matches!(
            table.set_cell(0, "joinDate", "2023-02-30"),
            Err(EditError::InvalidDate { .. })
        ));
        assert!(table.set_cell(0, "department", "Design").is_ok());
        assert!(matches!(
            table.set_cell(0, "department", "Sales"),
            Err(EditError::InvalidOption { .. })
        ));
        assert!(table.set_cell(0, "email", "a@b.io").is_ok());
        assert!(matches!(
            table.set_cell(0, "email", "a@b"),
            Err(EditError::InvalidEmail { .. })
        ));
        assert!(matches!(
            table.set_cell(0, "avatar", "photo.png"),
            Err(EditError::InvalidImage)
        ));
    }

    #[test]
    fn test_set_cell_read_only_and_unknown() {
        let mut table = table_with_rows(1);
        assert!(matches!(table.set_cell(0, "id", "9"), Err(EditError::ReadOnly(_))));
        assert!(matches!(
            table.set_cell(0, "nope", "x"),
            Err(EditError::UnknownColumn(_))
        ));
        assert_eq!(table.set_cell(5, "name", "x"), Err(EditError::RowOutOfRange(5)));
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("user1@example.com"));
        assert!(is_valid_email("a.b@c.d.e"));
        assert!(!is_valid_email("a@b."));
        assert!(!is_valid_email("a@.b"));
        assert!(!is_valid_email("@b.c"));
        assert!(!is_valid_email("a b@c.d"));
        assert!(!is_valid_email("a@b@c.d"));
    }

    #[test]
    fn test_set_image_targets_row_id() {
        let mut table = table_with_rows(3);
        table.sort_by_column("id").unwrap();
        table.sort_by_column("id").unwrap();
        let uri = "data:image/jpeg;base64,AAAA".to_string();
        assert!(table.set_image(2, "avatar", uri.clone()).unwrap());
        let index = table.index_of_id(2).unwrap();
        assert_eq!(table.row(index).unwrap().display("avatar"), uri);

        assert!(!table.set_image(99, "avatar", uri.clone()).unwrap());
        assert_eq!(table.set_image(1, "name", uri), Err(EditError::InvalidImage));
    }

    #[test]
    fn test_clear_cells_skips_read_only() {
        let mut table = table_with_rows(2);
        let cleared = table.clear_cells(&[
            (0, "name".to_string()),
            (1, "name".to_string()),
            (0, "id".to_string()),
            (7, "name".to_string()),
        ]);
        assert_eq!(cleared, 2);
        assert_eq!(table.row(0).unwrap().display("name"), "");
        assert_eq!(table.row(0).unwrap().id(), Some(1));
    }

    #[test]
    fn test_add_column_fills_rows() {
        let mut table = table_with_rows(2);
        let mut new_column = NewColumn::new("Priority", ColumnType::Select);
        new_column.options = vec!["High".into(), " ".into(), "Low ".into()];
        let field = table.add_column(new_column).unwrap();

        assert!(field.starts_with("col_"));
        assert_eq!(field.len(), 13);
        let column = table.column(&field).unwrap();
        assert_eq!(column.width, DEFAULT_COLUMN_WIDTH);
        assert_eq!(column.options, vec!["High", "Low"]);
        assert!(table.rows().iter().all(|r| r.get(&field) == Some(&CellValue::empty())));

        assert_eq!(
            table.add_column(NewColumn::new("  ", ColumnType::Text)),
            Err(EditError::EmptyTitle)
        );
    }

    #[test]
    fn test_resize_column_minimum() {
        let mut table = Table::with_defaults();
        assert_eq!(table.resize_column("name", 30).unwrap(), 150);
        assert_eq!(table.resize_column("name", -500).unwrap(), MIN_COLUMN_WIDTH);
        assert!(table.resize_column("missing", 10).is_err());
    }

    #[test]
    fn test_sort_number_toggles() {
        let mut table = Table::new(
            default_columns(),
            vec![
                Row::new().with("id", 1u64).with("age", 30.0),
                Row::new().with("id", 2u64).with("age", "x"),
                Row::new().with("id", 3u64).with("age", 12.0),
            ],
        );
        table.toggle_row(0);
        assert_eq!(table.sort_by_column("age").unwrap(), SortDirection::Asc);
        let ids: Vec<_> = table.rows().iter().filter_map(Row::id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(table.selected_count(), 0);

        assert_eq!(table.sort_by_column("age").unwrap(), SortDirection::Desc);
        let ids: Vec<_> = table.rows().iter().filter_map(Row::id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
        assert_eq!(table.sort_direction("age"), Some(SortDirection::Desc));
    }

    #[test]
    fn test_sort_dates_and_text() {
        let mut table = Table::new(
            default_columns(),
            vec![
                Row::new().with("id", 1u64).with("joinDate", "2024-03-01").with("name", "bob"),
                Row::new().with("id", 2u64).with("joinDate", "").with("name", "Alice"),
                Row::new().with("id", 3u64).with("joinDate", "2023-12-31").with("name", "carl"),
            ],
        );
        table.sort_by_column("joinDate").unwrap();
        let ids: Vec<_> = table.rows().iter().filter_map(Row::id).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        table.sort_by_column("name").unwrap();
        let names: Vec<_> = table.rows().iter().map(|r| r.display("name")).collect();
        assert_eq!(names, vec!["Alice", "bob", "carl"]);
    }

    #[test]
    fn test_select_range_and_all() {
        let mut table = table_with_rows(6);
        let all: Vec<usize> = (0..6).collect();
        table.toggle_row(1);
        table.select_range(4, &all);
        assert_eq!(table.selected_rows(), vec![1, 2, 3, 4]);

        table.clear_selection();
        table.select_range(2, &all);
        assert_eq!(table.selected_rows(), vec![2]);

        table.select_all(&all);
        assert_eq!(table.selected_count(), 6);
        assert_eq!(table.record_count_label(), "6 records, 6 selected");
        table.clear_selection();
        assert_eq!(table.record_count_label(), "6 records");
    }

    #[test]
    fn test_next_id_ignores_out_of_range_ids() {
        let rows = vec![
            Row::new().with("id", 1e20),
            Row::new().with("id", 7.0),
            Row::new().with("id", -3.0),
        ];
        let mut table = Table::new(default_columns(), rows);
        assert_eq!(table.next_id(), 8);
        let index = table.add_row();
        assert_eq!(table.row(index).unwrap().id(), Some(8));

        let mut huge = Table::new(default_columns(), vec![Row::new().with("id", 1e20)]);
        assert_eq!(huge.next_id(), 1);
        let index = huge.copy_row(0).unwrap();
        assert_eq!(huge.row(index).unwrap().id(), Some(1));
    }

    #[test]
    fn test_selection_follows_display_order() {
        let mut table = table_with_rows(6);
        // Rows 1 and 4 are hidden; 5 is displayed before 0.
        let order = [2, 5, 0, 3];
        table.toggle_row(2);
        table.select_range(0, &order);
        assert_eq!(table.selected_rows(), vec![0, 2, 5]);

        table.select_all(&[1, 3, 42]);
        assert_eq!(table.selected_rows(), vec![1, 3]);

        table.toggle_row(4);
        table.retain_selection(&[3, 4]);
        assert_eq!(table.selected_rows(), vec![3, 4]);
        table.retain_selection(&[0]);
        assert_eq!(table.selected_count(), 0);
        // A hidden row is not a range target.
        table.select_range(5, &[0, 1]);
        assert_eq!(table.selected_count(), 0);
    }

    #[test]
    fn test_import_replace() {
        let mut table = table_with_rows(2);
        let mut column = ColumnDef::new("col_0", "Title", ColumnType::Text);
        column.editable = false;
        let rows = vec![Row::new().with("col_0", "x")];
        let outcome = table.import_csv(vec![column], rows, true);
        assert_eq!(outcome, ImportOutcome { rows: 1, columns: 1 });
        assert_eq!(table.columns().len(), 1);
        assert!(table.columns()[0].editable);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_import_merge_empty_adopts_columns() {
        let mut table = Table::with_defaults();
        let columns = vec![ColumnDef::new("col_0", "A", ColumnType::Text)];
        table.import_csv(columns, vec![Row::new().with("col_0", "1")], false);
        assert_eq!(table.columns().len(), 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_import_merge_renames_collisions() {
        let mut table = Table::new(
            vec![
                ColumnDef::new("col_0", "A", ColumnType::Text),
                ColumnDef::new("col_0_1", "A2", ColumnType::Text),
            ],
            vec![Row::new().with("col_0", "old")],
        );
        let columns = vec![
            ColumnDef::new("col_0", "X", ColumnType::Text),
            ColumnDef::new("col_1", "Y", ColumnType::Text),
        ];
        let rows = vec![Row::new().with("col_0", "new").with("col_1", "y")];
        table.import_csv(columns, rows, false);

        let fields: Vec<_> = table.columns().iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["col_0", "col_0_1", "col_0_2", "col_1"]);
        assert_eq!(table.len(), 2);

        let old = table.row(0).unwrap();
        assert_eq!(old.display("col_0"), "old");
        assert_eq!(old.get("col_0_2"), Some(&CellValue::empty()));
        assert_eq!(old.get("col_1"), Some(&CellValue::empty()));

        let new = table.row(1).unwrap();
        assert_eq!(new.display("col_0_2"), "new");
        assert_eq!(new.display("col_1"), "y");
        assert!(new.get("col_0").is_none());
    }

    #[test]
    fn test_clear_rows_and_all() {
        let mut table = table_with_rows(3);
        table.add_column(NewColumn::new("Extra", ColumnType::Text)).unwrap();
        table.clear_rows();
        assert!(table.is_empty());
        assert_eq!(table.columns().len(), 9);

        table.clear_all(5);
        assert_eq!(table.columns().len(), 8);
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_reset_to_defaults() {
        let mut table = table_with_rows(3);
        table.add_column(NewColumn::new("Extra", ColumnType::Text)).unwrap();
        table.toggle_row(1);
        table.reset_to_defaults();
        assert!(table.is_empty());
        assert_eq!(table.columns().len(), 8);
        assert_eq!(table.selected_count(), 0);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let table = table_with_rows(2);
        let restored = Table::from_snapshot(table.snapshot());
        assert_eq!(restored.rows(), table.rows());
        assert_eq!(restored.columns(), table.columns());
    }
}
