//! Data model for the table editor.
//!
//! Rows, cell values, column definitions, filter and group configuration,
//! and the persisted snapshot documents.

mod query;
mod snapshot;
mod types;

pub use query::{FilterCondition, FilterOperator, GroupConfig, SortDirection};
pub use snapshot::{AppStateSnapshot, Snapshot};
pub use types::{
    CellValue, ColumnDef, ColumnType, Row, DEFAULT_COLUMN_WIDTH, ID_FIELD, MIN_COLUMN_WIDTH,
};
