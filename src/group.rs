//! Row grouping.
//!
//! Grouping partitions row indices by the display value of one field. It is
//! a view over the table, rebuilt whenever rows change; only the
//! [`GroupConfig`] and the collapsed state survive a rebuild.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::model::{CellValue, ColumnDef, ColumnType, GroupConfig, Row, SortDirection};

/// Key of the group collecting rows whose value is empty.
pub const UNGROUPED: &str = "Ungrouped";

/// One partition of the rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: String,
    /// Indices into the table's row vector, in original order.
    pub rows: Vec<usize>,
    pub expanded: bool,
}

/// A line of the grouped grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupLine {
    /// Group header, carrying the group's position in [`Grouping::groups`].
    Header(usize),
    /// A member row, as an index into the table's row vector.
    Row(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCount {
    pub name: String,
    pub count: usize,
}

/// Overview of the active grouping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub field: String,
    pub sort: SortDirection,
    pub group_count: usize,
    pub total_records: usize,
    pub groups: Vec<GroupCount>,
}

/// Aggregates of one number column within a group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumberStats {
    pub sum: f64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// Per-group aggregates for the summary export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group: String,
    pub count: usize,
    pub stats: BTreeMap<String, NumberStats>,
}

/// The active grouping of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct Grouping {
    pub config: GroupConfig,
    pub groups: Vec<Group>,
}

impl Grouping {
    /// Partition `indices` (rows that passed the filter) by the configured
    /// field. Every group starts expanded.
    pub fn build(rows: &[Row], indices: &[usize], config: GroupConfig) -> Self {
        let mut buckets: HashMap<String, Vec<usize>> = HashMap::new();
        for &index in indices {
            let Some(row) = rows.get(index) else {
                continue;
            };
            let value = row.display(&config.field);
            let key = if value.is_empty() {
                UNGROUPED.to_string()
            } else {
                value
            };
            buckets.entry(key).or_default().push(index);
        }

        let mut keys: Vec<String> = buckets.keys().cloned().collect();
        sort_keys(&mut keys, config.sort);

        let groups: Vec<Group> = keys
            .into_iter()
            .map(|key| {
                let rows = buckets.remove(&key).unwrap_or_default();
                Group {
                    key,
                    rows,
                    expanded: true,
                }
            })
            .collect();
        debug!(field = %config.field, groups = groups.len(), "Built grouping");
        Self { config, groups }
    }

    /// Rebuild against changed rows, keeping collapsed groups collapsed.
    pub fn rebuild(&mut self, rows: &[Row], indices: &[usize]) {
        let collapsed: HashSet<String> = self
            .groups
            .iter()
            .filter(|g| !g.expanded)
            .map(|g| g.key.clone())
            .collect();
        let mut next = Self::build(rows, indices, self.config.clone());
        for group in &mut next.groups {
            group.expanded = !collapsed.contains(&group.key);
        }
        *self = next;
    }

    /// Flip a group between expanded and collapsed. Returns the new state.
    pub fn toggle(&mut self, group: usize) -> Option<bool> {
        let group = self.groups.get_mut(group)?;
        group.expanded = !group.expanded;
        Some(group.expanded)
    }

    pub fn set_all_expanded(&mut self, expanded: bool) {
        for group in &mut self.groups {
            group.expanded = expanded;
        }
    }

    /// Total rows across all groups.
    pub fn total_rows(&self) -> usize {
        self.groups.iter().map(|g| g.rows.len()).sum()
    }

    /// Display lines: each header followed by its rows when expanded.
    pub fn flatten(&self) -> Vec<GroupLine> {
        let mut lines = Vec::with_capacity(self.groups.len() + self.total_rows());
        for (i, group) in self.groups.iter().enumerate() {
            lines.push(GroupLine::Header(i));
            if group.expanded {
                lines.extend(group.rows.iter().map(|&r| GroupLine::Row(r)));
            }
        }
        lines
    }

    pub fn stats(&self) -> GroupStats {
        GroupStats {
            field: self.config.field.clone(),
            sort: self.config.sort,
            group_count: self.groups.len(),
            total_records: self.total_rows(),
            groups: self
                .groups
                .iter()
                .map(|g| GroupCount {
                    name: g.key.clone(),
                    count: g.rows.len(),
                })
                .collect(),
        }
    }

    /// Sum, average, min, max and count of every number column per group.
    /// Values that are not numbers count as 0.
    pub fn summary(&self, rows: &[Row], columns: &[ColumnDef]) -> Vec<GroupSummary> {
        let number_fields: Vec<&str> = columns
            .iter()
            .filter(|c| c.column_type == ColumnType::Number)
            .map(|c| c.field.as_str())
            .collect();

        self.groups
            .iter()
            .map(|group| {
                let stats = number_fields
                    .iter()
                    .map(|&field| {
                        let values: Vec<f64> = group
                            .rows
                            .iter()
                            .filter_map(|&i| rows.get(i))
                            .map(|r| r.get(field).and_then(CellValue::as_f64).unwrap_or(0.0))
                            .collect();
                        (field.to_string(), number_stats(&values))
                    })
                    .collect();
                GroupSummary {
                    group: group.key.clone(),
                    count: group.rows.len(),
                    stats,
                }
            })
            .collect()
    }
}

fn number_stats(values: &[f64]) -> NumberStats {
    let sum: f64 = values.iter().sum();
    let count = values.len();
    NumberStats {
        sum,
        avg: if count > 0 { sum / count as f64 } else { 0.0 },
        min: values.iter().copied().reduce(f64::min).unwrap_or(0.0),
        max: values.iter().copied().reduce(f64::max).unwrap_or(0.0),
        count,
    }
}

/// Numeric order when every named key is a number, case-insensitive text
/// order otherwise. [`UNGROUPED`] counts as the largest key.
fn sort_keys(keys: &mut [String], direction: SortDirection) {
    let numeric = keys
        .iter()
        .filter(|k| k.as_str() != UNGROUPED)
        .all(|k| CellValue::text(k.as_str()).as_f64().is_some());

    let compare = |a: &String, b: &String| -> Ordering {
        match (a.as_str() == UNGROUPED, b.as_str() == UNGROUPED) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (false, false) => {}
        }
        if numeric {
            let x = CellValue::text(a.as_str()).as_f64().unwrap_or(0.0);
            let y = CellValue::text(b.as_str()).as_f64().unwrap_or(0.0);
            x.total_cmp(&y)
        } else {
            a.to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b))
        }
    };

    keys.sort_by(|a, b| match direction {
        SortDirection::Asc => compare(a, b),
        SortDirection::Desc => compare(b, a),
    });
}

/// Columns that may be grouped on.
pub fn groupable_columns(columns: &[ColumnDef]) -> Vec<&ColumnDef> {
    columns
        .iter()
        .filter(|c| c.column_type.is_groupable())
        .collect()
}
