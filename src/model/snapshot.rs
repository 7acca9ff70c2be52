//! Persisted documents.

use serde::{Deserialize, Serialize};

use super::query::{FilterCondition, GroupConfig};
use super::types::{ColumnDef, Row};

/// The full table document stored under the `tableData` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub data: Vec<Row>,
    pub columns: Vec<ColumnDef>,
    /// RFC 3339 UTC time of the save.
    #[serde(default)]
    pub timestamp: String,
}

impl Snapshot {
    /// Create a snapshot stamped with the current time.
    pub fn now(data: Vec<Row>, columns: Vec<ColumnDef>) -> Self {
        Self {
            data,
            columns,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// The view state stored under the `appState` key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppStateSnapshot {
    #[serde(default)]
    pub filters: Vec<FilterCondition>,
    #[serde(default)]
    pub group: Option<GroupConfig>,
    #[serde(default)]
    pub timestamp: String,
}

impl AppStateSnapshot {
    pub fn now(filters: Vec<FilterCondition>, group: Option<GroupConfig>) -> Self {
        Self {
            filters,
            group,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnType, FilterOperator, SortDirection};

    #[test]
    fn test_snapshot_layout() {
        let snapshot = Snapshot::now(
            vec![Row::new().with("id", 1u64).with("name", "Ann")],
            vec![ColumnDef::new("name", "Name", ColumnType::Text)],
        );
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["data"][0]["id"], 1);
        assert_eq!(json["columns"][0]["field"], "name");
        assert!(chrono::DateTime::parse_from_rfc3339(json["timestamp"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_app_state_round_trip() {
        let state = AppStateSnapshot::now(
            vec![FilterCondition::new("age", FilterOperator::GreaterThan, "30")],
            Some(GroupConfig::new("department", SortDirection::Desc)),
        );
        let json = serde_json::to_string(&state).unwrap();
        let back: AppStateSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_app_state_null_group() {
        let state: AppStateSnapshot =
            serde_json::from_str(r#"{"filters":[],"group":null,"timestamp":"x"}"#).unwrap();
        assert!(state.group.is_none());
    }
}
