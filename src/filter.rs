//! Row filtering.
//!
//! A filter is a conjunction of [`FilterCondition`]s. Evaluation never copies
//! or replaces rows: it yields indices into the backing row vector, so edits
//! made through a filtered view land on the real row.

use tracing::debug;

use crate::model::{CellValue, ColumnDef, ColumnType, FilterCondition, FilterOperator, Row};
use crate::table::parse_date;

/// Counts shown in the status bar while a filter is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterStats {
    pub total: usize,
    pub filtered: usize,
    pub hidden: usize,
    pub has_filters: bool,
}

/// Drop incomplete conditions: those without a field, and those without a
/// value unless the operator tests emptiness.
pub fn collect(conditions: &[FilterCondition]) -> Vec<FilterCondition> {
    conditions
        .iter()
        .filter(|c| c.is_complete())
        .cloned()
        .collect()
}

/// Indices of the rows that satisfy every condition, in row order.
///
/// With no conditions every row matches.
pub fn apply(rows: &[Row], columns: &[ColumnDef], conditions: &[FilterCondition]) -> Vec<usize> {
    let matched: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| matches_all(row, columns, conditions))
        .map(|(i, _)| i)
        .collect();
    debug!(
        conditions = conditions.len(),
        matched = matched.len(),
        total = rows.len(),
        "Applied filter"
    );
    matched
}

/// Summarize how many rows a filter hides.
pub fn stats(total: usize, filtered: usize, conditions: &[FilterCondition]) -> FilterStats {
    FilterStats {
        total,
        filtered,
        hidden: total.saturating_sub(filtered),
        has_filters: !conditions.is_empty(),
    }
}

/// Check a row against every condition.
pub fn matches_all(row: &Row, columns: &[ColumnDef], conditions: &[FilterCondition]) -> bool {
    conditions.iter().all(|condition| {
        let column_type = columns
            .iter()
            .find(|c| c.field == condition.field)
            .map(|c| c.column_type)
            .unwrap_or_default();
        matches(row.get(&condition.field), column_type, condition)
    })
}

/// Evaluate one condition against a cell. A missing cell counts as empty.
pub fn matches(cell: Option<&CellValue>, column_type: ColumnType, condition: &FilterCondition) -> bool {
    let text = cell.map(CellValue::display).unwrap_or_default();
    let value = condition.value.as_str();

    match condition.operator {
        FilterOperator::Equals => loosely_equal(&text, value),
        FilterOperator::NotEquals => !loosely_equal(&text, value),
        FilterOperator::Contains => text.to_lowercase().contains(&value.to_lowercase()),
        FilterOperator::NotContains => !text.to_lowercase().contains(&value.to_lowercase()),
        FilterOperator::StartsWith => text.to_lowercase().starts_with(&value.to_lowercase()),
        FilterOperator::EndsWith => text.to_lowercase().ends_with(&value.to_lowercase()),
        FilterOperator::GreaterThan => ordered(cell, column_type, value).is_some_and(|o| o.is_gt()),
        FilterOperator::LessThan => ordered(cell, column_type, value).is_some_and(|o| o.is_lt()),
        FilterOperator::GreaterEqual => ordered(cell, column_type, value).is_some_and(|o| o.is_ge()),
        FilterOperator::LessEqual => ordered(cell, column_type, value).is_some_and(|o| o.is_le()),
        FilterOperator::IsEmpty => cell.map_or(true, CellValue::is_empty),
        FilterOperator::IsNotEmpty => cell.is_some_and(|c| !c.is_empty()),
    }
}

/// Numeric equality when both sides are numbers, exact text otherwise.
fn loosely_equal(text: &str, value: &str) -> bool {
    match (parse_number(text), parse_number(value)) {
        (Some(a), Some(b)) => a == b,
        _ => text == value,
    }
}

fn parse_number(s: &str) -> Option<f64> {
    CellValue::text(s).as_f64()
}

/// Compare a cell with a condition value: dates on date columns, numbers
/// elsewhere. `None` when either side does not parse.
fn ordered(
    cell: Option<&CellValue>,
    column_type: ColumnType,
    value: &str,
) -> Option<std::cmp::Ordering> {
    if column_type == ColumnType::Date {
        let a = parse_date(cell)?;
        let b = parse_date(Some(&CellValue::text(value)))?;
        return Some(a.cmp(&b));
    }
    let a = cell.and_then(CellValue::as_f64)?;
    let b = parse_number(value)?;
    a.partial_cmp(&b)
}

/// Parse an imported list of conditions (a JSON array).
pub fn parse_conditions(json: &str) -> serde_json::Result<Vec<FilterCondition>> {
    serde_json::from_str(json)
}
