//! Persistence through the file-backed store.

use lazytable::model::{AppStateSnapshot, FilterCondition, FilterOperator, Row};
use lazytable::storage::{
    resolve_table, StorageError, StorageManager, StoredTable, TABLE_DATA_KEY,
};
use lazytable::table::{default_columns, Table};
use tempfile::TempDir;

const QUOTA: u64 = 5 * 1024 * 1024;

#[test]
fn table_survives_save_and_load() {
    let dir = TempDir::new().unwrap();
    let storage = StorageManager::with_dir(dir.path(), QUOTA);
    let mut table = Table::with_defaults();
    table.generate_sample_rows(12);
    table.set_cell(0, "name", "Zed").unwrap();
    storage.save_table(&table.snapshot()).unwrap();

    let (columns, rows) = resolve_table(storage.load_table(), default_columns).unwrap();
    let reloaded = Table::new(columns, rows);
    assert_eq!(reloaded.columns(), table.columns());
    assert_eq!(reloaded.rows(), table.rows());
}

#[test]
fn app_state_survives_save_and_load() {
    let dir = TempDir::new().unwrap();
    let storage = StorageManager::with_dir(dir.path(), QUOTA);
    let state = AppStateSnapshot::now(
        vec![FilterCondition::new("name", FilterOperator::StartsWith, "A")],
        None,
    );
    storage.save_app_state(&state).unwrap();
    assert_eq!(storage.load_app_state(), Some(state));
}

#[test]
fn legacy_row_array_uses_default_columns() {
    let dir = TempDir::new().unwrap();
    let storage = StorageManager::with_dir(dir.path(), QUOTA);
    storage
        .set_item(TABLE_DATA_KEY, r#"[{"id":1,"name":"Ann"},{"id":2,"name":"Bob"}]"#)
        .unwrap();

    let stored = storage.load_table();
    assert!(matches!(stored, StoredTable::Legacy(ref rows) if rows.len() == 2));
    let (columns, rows) = resolve_table(stored, default_columns).unwrap();
    assert_eq!(columns, default_columns());
    assert_eq!(rows[1], Row::new().with("id", 2u64).with("name", "Bob"));
}

#[test]
fn unknown_shape_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let storage = StorageManager::with_dir(dir.path(), QUOTA);
    storage.set_item(TABLE_DATA_KEY, r#"{"rows":[]}"#).unwrap();
    let (columns, rows) = resolve_table(storage.load_table(), default_columns).unwrap();
    assert_eq!(columns, default_columns());
    assert!(rows.is_empty());
}

#[test]
fn oversized_table_is_rejected() {
    let dir = TempDir::new().unwrap();
    let storage = StorageManager::with_dir(dir.path(), 1024);
    let mut table = Table::with_defaults();
    table.generate_sample_rows(50);

    let err = storage.save_table(&table.snapshot()).unwrap_err();
    assert!(matches!(err, StorageError::QuotaExceeded { quota: 1024, .. }));
    assert!(matches!(storage.load_table(), StoredTable::Missing));
}

#[test]
fn reset_removes_everything() {
    let dir = TempDir::new().unwrap();
    let storage = StorageManager::with_dir(dir.path(), QUOTA);
    storage.save_table(&Table::with_defaults().snapshot()).unwrap();
    storage
        .save_app_state(&AppStateSnapshot::now(Vec::new(), None))
        .unwrap();
    storage.reset().unwrap();
    assert!(matches!(storage.load_table(), StoredTable::Missing));
    assert_eq!(storage.load_app_state(), None);
    assert_eq!(storage.usage().total_bytes(), 0);
}
