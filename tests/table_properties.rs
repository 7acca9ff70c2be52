//! End-to-end properties of the table, filter, grouping and CSV layers.

use std::collections::BTreeSet;

use lazytable::csv;
use lazytable::filter;
use lazytable::group::{Grouping, UNGROUPED};
use lazytable::model::{
    CellValue, ColumnDef, ColumnType, FilterCondition, FilterOperator, GroupConfig, Row,
    SortDirection,
};
use lazytable::table::Table;

fn sample_table(rows: usize) -> Table {
    let mut table = Table::with_defaults();
    table.generate_sample_rows(rows);
    table
}

#[test]
fn csv_round_trip_preserves_values() {
    let columns = vec![
        ColumnDef::new("a", "Name", ColumnType::Text),
        ColumnDef::new("b", "Quote, comma", ColumnType::Text),
        ColumnDef::new("c", "Note", ColumnType::Text),
    ];
    let rows = vec![
        Row::new()
            .with("a", "Ann")
            .with("b", "x,y")
            .with("c", "she said \"hi\""),
        Row::new().with("a", "Bob").with("b", "").with("c", "plain"),
    ];

    let text = csv::write(&columns, &rows);
    let document = csv::parse_document(&text, true).unwrap();
    assert_eq!(document.headers, vec!["Name", "Quote, comma", "Note"]);

    let (imported_columns, imported_rows) = document.to_table();
    assert_eq!(imported_rows.len(), rows.len());
    for (original, imported) in rows.iter().zip(&imported_rows) {
        for (column, new_column) in columns.iter().zip(&imported_columns) {
            assert_eq!(
                original.display(&column.field),
                imported.display(&new_column.field)
            );
        }
    }
}

#[test]
fn filter_is_idempotent() {
    let table = sample_table(60);
    let conditions = vec![
        FilterCondition::new("age", FilterOperator::GreaterEqual, "30"),
        FilterCondition::new("name", FilterOperator::Contains, "a"),
    ];
    let first = filter::apply(table.rows(), table.columns(), &conditions);
    let kept: Vec<Row> = first.iter().map(|&i| table.rows()[i].clone()).collect();
    let second = filter::apply(&kept, table.columns(), &conditions);
    assert_eq!(second, (0..kept.len()).collect::<Vec<_>>());
}

#[test]
fn filter_without_conditions_keeps_every_row() {
    let table = sample_table(25);
    assert_eq!(
        filter::apply(table.rows(), table.columns(), &[]),
        (0..25).collect::<Vec<_>>()
    );
}

#[test]
fn grouping_partitions_filtered_rows() {
    let mut table = sample_table(40);
    table.set_cell(3, "status", "").unwrap();
    let visible = filter::apply(
        table.rows(),
        table.columns(),
        &[FilterCondition::new("id", FilterOperator::LessEqual, "30")],
    );
    let grouping = Grouping::build(
        table.rows(),
        &visible,
        GroupConfig::new("status", SortDirection::Asc),
    );

    let mut seen = BTreeSet::new();
    for group in &grouping.groups {
        for &row in &group.rows {
            assert!(seen.insert(row), "row {} is in two groups", row);
        }
    }
    assert_eq!(seen.into_iter().collect::<Vec<_>>(), visible);
    assert!(grouping.groups.iter().any(|g| g.key == UNGROUPED));
}

#[test]
fn ids_increase_after_deletes() {
    let mut table = sample_table(5);
    table.delete_row(4).unwrap();
    assert_eq!(table.next_id(), 5);
    let index = table.add_row();
    assert_eq!(table.row(index).unwrap().id(), Some(5));
}

#[test]
fn selection_follows_deleted_rows() {
    let mut table = sample_table(6);
    table.toggle_row(1);
    table.toggle_row(4);
    table.delete_row(2).unwrap();
    assert_eq!(table.selected_rows(), vec![1, 3]);
}

#[test]
fn merge_import_renames_colliding_fields() {
    let mut table = Table::new(
        vec![ColumnDef::new("col_0", "Existing", ColumnType::Text)],
        vec![Row::new().with("col_0", "kept")],
    );
    let document = csv::parse_document("City\nOslo\nRome\n", true).unwrap();
    let (columns, rows) = document.to_table();
    let outcome = table.import_csv(columns, rows, false);

    assert_eq!(outcome.rows, 2);
    assert_eq!(table.len(), 3);
    assert_eq!(table.row(0).unwrap().display("col_0"), "kept");
    assert_eq!(table.row(0).unwrap().get("col_0_1"), Some(&CellValue::empty()));
    assert_eq!(table.row(2).unwrap().display("col_0_1"), "Rome");
}
