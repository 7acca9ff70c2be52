//! Local key/value storage.
//!
//! Each key is one JSON file, `<data_dir>/<key>.json`. Writes are whole
//! documents (a full snapshot overwrite) and fail when the document is larger
//! than the configured quota. Two keys are used:
//! - `tableData`: the table snapshot `{data, columns, timestamp}`
//! - `appState`: the active filters and grouping

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::model::{AppStateSnapshot, ColumnDef, Row, Snapshot};

/// Key of the table snapshot.
pub const TABLE_DATA_KEY: &str = "tableData";

/// Key of the filter and grouping state.
pub const APP_STATE_KEY: &str = "appState";

/// Errors that can occur while reading or writing storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The platform has no local data directory.
    #[error("Could not determine data directory")]
    NoDataDir,

    /// File system failure.
    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// The value could not be serialized.
    #[error("Could not serialize data: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The document is larger than the quota.
    #[error("Storage quota exceeded: {size} bytes, limit {quota} bytes")]
    QuotaExceeded { size: u64, quota: u64 },
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// What was found under the `tableData` key.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredTable {
    /// A `{data, columns, timestamp}` document.
    Snapshot(Snapshot),
    /// A bare row array written by older versions; columns fall back to the
    /// defaults.
    Legacy(Vec<Row>),
    /// Nothing stored yet.
    Missing,
    /// Unreadable content; the caller falls back to defaults.
    Invalid,
}

/// Bytes used per key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageUsage {
    pub table_bytes: u64,
    pub state_bytes: u64,
    pub quota_bytes: u64,
}

impl StorageUsage {
    pub fn total_bytes(&self) -> u64 {
        self.table_bytes + self.state_bytes
    }

    /// Percentage of the quota used by the largest document.
    pub fn usage_percent(&self) -> f64 {
        if self.quota_bytes == 0 {
            0.0
        } else {
            (self.table_bytes.max(self.state_bytes) as f64 / self.quota_bytes as f64) * 100.0
        }
    }
}

/// File-backed key/value store.
#[derive(Debug, Clone)]
pub struct StorageManager {
    base_dir: PathBuf,
    quota_bytes: u64,
}

impl StorageManager {
    /// Storage in `<data_local_dir>/lazytable`.
    pub fn new(quota_bytes: u64) -> Result<Self> {
        let base_dir = dirs::data_local_dir()
            .ok_or(StorageError::NoDataDir)?
            .join("lazytable");
        Ok(Self::with_dir(base_dir, quota_bytes))
    }

    /// Storage in an explicit directory.
    pub fn with_dir(base_dir: impl Into<PathBuf>, quota_bytes: u64) -> Self {
        Self {
            base_dir: base_dir.into(),
            quota_bytes,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn quota_bytes(&self) -> u64 {
        self.quota_bytes
    }

    /// Path of the file backing a key.
    pub fn key_path(&self, key: &str) -> PathBuf {
        let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
        self.base_dir.join(format!("{}.json", safe_key))
    }

    /// Raw value of a key, `None` when unset.
    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Store a raw value, replacing any previous one.
    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let size = value.len() as u64;
        if size > self.quota_bytes {
            warn!(key, size, quota = self.quota_bytes, "Storage quota exceeded");
            return Err(StorageError::QuotaExceeded {
                size,
                quota: self.quota_bytes,
            });
        }
        fs::create_dir_all(&self.base_dir)?;

        let path = self.key_path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        trace!(key, size, "Stored item");
        Ok(())
    }

    /// Delete a key. Deleting a missing key is not an error.
    pub fn remove_item(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => {
                debug!(key, "Removed item");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let content = serde_json::to_string(value)?;
        self.set_item(key, &content)
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let content = match self.get_item(key) {
            Ok(Some(content)) => content,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Failed to read stored item");
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Stored item is not valid, ignoring it");
                None
            }
        }
    }

    /// Persist the table snapshot.
    pub fn save_table(&self, snapshot: &Snapshot) -> Result<()> {
        self.write_json(TABLE_DATA_KEY, snapshot)?;
        debug!(
            rows = snapshot.data.len(),
            columns = snapshot.columns.len(),
            "Saved table"
        );
        Ok(())
    }

    /// Load the table snapshot, accepting the legacy bare-array format.
    pub fn load_table(&self) -> StoredTable {
        let Some(value) = self.read_json::<serde_json::Value>(TABLE_DATA_KEY) else {
            return if self.key_path(TABLE_DATA_KEY).exists() {
                StoredTable::Invalid
            } else {
                StoredTable::Missing
            };
        };

        if value.is_array() {
            return match serde_json::from_value::<Vec<Row>>(value) {
                Ok(rows) => {
                    debug!(rows = rows.len(), "Loaded legacy table data");
                    StoredTable::Legacy(rows)
                }
                Err(e) => {
                    warn!(error = %e, "Legacy table data is not a row array");
                    StoredTable::Invalid
                }
            };
        }

        let has_shape = value.get("data").is_some_and(serde_json::Value::is_array)
            && value.get("columns").is_some_and(serde_json::Value::is_array);
        if !has_shape {
            warn!("Stored table data has an unknown shape, using defaults");
            return StoredTable::Invalid;
        }
        match serde_json::from_value::<Snapshot>(value) {
            Ok(snapshot) => {
                debug!(
                    rows = snapshot.data.len(),
                    columns = snapshot.columns.len(),
                    "Loaded table"
                );
                StoredTable::Snapshot(snapshot)
            }
            Err(e) => {
                warn!(error = %e, "Stored table data could not be decoded");
                StoredTable::Invalid
            }
        }
    }

    /// Persist the filter and grouping state.
    pub fn save_app_state(&self, state: &AppStateSnapshot) -> Result<()> {
        self.write_json(APP_STATE_KEY, state)?;
        debug!(filters = state.filters.len(), grouped = state.group.is_some(), "Saved app state");
        Ok(())
    }

    pub fn load_app_state(&self) -> Option<AppStateSnapshot> {
        self.read_json(APP_STATE_KEY)
    }

    /// Remove both keys.
    pub fn reset(&self) -> Result<()> {
        self.remove_item(TABLE_DATA_KEY)?;
        self.remove_item(APP_STATE_KEY)?;
        debug!("Reset storage");
        Ok(())
    }

    /// Bytes used by each key.
    pub fn usage(&self) -> StorageUsage {
        let size = |key: &str| {
            fs::metadata(self.key_path(key))
                .map(|m| m.len())
                .unwrap_or(0)
        };
        StorageUsage {
            table_bytes: size(TABLE_DATA_KEY),
            state_bytes: size(APP_STATE_KEY),
            quota_bytes: self.quota_bytes,
        }
    }
}

/// Human-readable size: `0 Bytes`, `1.5 KB`, `5 MB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

/// Resolve a stored table into columns and rows.
///
/// Legacy and unreadable data fall back to the given default columns.
pub fn resolve_table(
    stored: StoredTable,
    default_columns: impl FnOnce() -> Vec<ColumnDef>,
) -> Option<(Vec<ColumnDef>, Vec<Row>)> {
    match stored {
        StoredTable::Snapshot(snapshot) => Some((snapshot.columns, snapshot.data)),
        StoredTable::Legacy(rows) => Some((default_columns(), rows)),
        StoredTable::Invalid => Some((default_columns(), Vec::new())),
        StoredTable::Missing => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnType, FilterCondition, FilterOperator, GroupConfig, SortDirection};
    use tempfile::tempdir;

    fn create_test_storage(quota: u64) -> StorageManager {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().to_path_buf();
        // Keep the tempdir alive by leaking it (acceptable in tests)
        std::mem::forget(temp_dir);
        StorageManager::with_dir(path, quota)
    }

    fn sample_snapshot() -> Snapshot {
        Snapshot::now(
            vec![
                Row::new().with("id", 1u64).with("name", "Ann"),
                Row::new().with("id", 2u64).with("name", "Bob"),
            ],
            vec![
                ColumnDef::new("id", "ID", ColumnType::Number).read_only(),
                ColumnDef::new("name", "Name", ColumnType::Text),
            ],
        )
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 Bytes");
        assert_eq!(format_size(512), "512 Bytes");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5 MB");
    }

    #[test]
    fn test_item_round_trip() {
        let storage = create_test_storage(1024);
        assert_eq!(storage.get_item("k").unwrap(), None);
        storage.set_item("k", "value").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("value"));
        storage.remove_item("k").unwrap();
        assert_eq!(storage.get_item("k").unwrap(), None);
        storage.remove_item("k").unwrap();
    }

    #[test]
    fn test_key_path_sanitized() {
        let storage = create_test_storage(1024);
        let path = storage.key_path("a/b:c");
        assert_eq!(path.file_name().unwrap(), "a_b_c.json");
    }

    #[test]
    fn test_quota_rejected() {
        let storage = create_test_storage(8);
        storage.set_item("k", "short").unwrap();
        let err = storage.set_item("k", "much too long").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { size: 13, quota: 8 }));
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("short"));
    }

    #[test]
    fn test_table_round_trip() {
        let storage = create_test_storage(1024 * 1024);
        let snapshot = sample_snapshot();
        storage.save_table(&snapshot).unwrap();
        assert_eq!(storage.load_table(), StoredTable::Snapshot(snapshot));
    }

    #[test]
    fn test_load_missing() {
        let storage = create_test_storage(1024);
        assert_eq!(storage.load_table(), StoredTable::Missing);
        assert!(storage.load_app_state().is_none());
    }

    #[test]
    fn test_load_legacy_array() {
        let storage = create_test_storage(1024);
        storage
            .set_item(TABLE_DATA_KEY, r#"[{"id":1,"name":"Ann"}]"#)
            .unwrap();
        match storage.load_table() {
            StoredTable::Legacy(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].display("name"), "Ann");
            }
            other => panic!("expected legacy rows, got {:?}", other),
        }
    }

    #[test]
    fn test_load_invalid_shapes() {
        let storage = create_test_storage(1024);
        storage.set_item(TABLE_DATA_KEY, r#"{"rows":[]}"#).unwrap();
        assert_eq!(storage.load_table(), StoredTable::Invalid);

        storage.set_item(TABLE_DATA_KEY, "{not json").unwrap();
        assert_eq!(storage.load_table(), StoredTable::Invalid);

        storage.set_item(TABLE_DATA_KEY, "42").unwrap();
        assert_eq!(storage.load_table(), StoredTable::Invalid);
    }

    #[test]
    fn test_resolve_table() {
        let defaults = || vec![ColumnDef::new("x", "X", ColumnType::Text)];
        assert!(resolve_table(StoredTable::Missing, defaults).is_none());

        let (columns, rows) = resolve_table(StoredTable::Invalid, defaults).unwrap();
        assert_eq!(columns[0].field, "x");
        assert!(rows.is_empty());

        let legacy = vec![Row::new().with("id", 3u64)];
        let (columns, rows) = resolve_table(StoredTable::Legacy(legacy), defaults).unwrap();
        assert_eq!(columns.len(), 1);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_app_state_round_trip() {
        let storage = create_test_storage(1024);
        let state = AppStateSnapshot::now(
            vec![FilterCondition::new("name", FilterOperator::Contains, "a")],
            Some(GroupConfig::new("name", SortDirection::Asc)),
        );
        storage.save_app_state(&state).unwrap();
        assert_eq!(storage.load_app_state(), Some(state));
    }

    #[test]
    fn test_reset_and_usage() {
        let storage = create_test_storage(1024 * 1024);
        storage.save_table(&sample_snapshot()).unwrap();
        storage.save_app_state(&AppStateSnapshot::default()).unwrap();

        let usage = storage.usage();
        assert!(usage.table_bytes > 0);
        assert!(usage.state_bytes > 0);
        assert_eq!(usage.total_bytes(), usage.table_bytes + usage.state_bytes);
        assert!(usage.usage_percent() > 0.0);

        storage.reset().unwrap();
        assert_eq!(storage.load_table(), StoredTable::Missing);
        assert_eq!(storage.usage().total_bytes(), 0);
    }
}
