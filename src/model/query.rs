//! Filter and grouping configuration.

use serde::{Deserialize, Serialize};

use super::types::ColumnType;

/// Comparison operator of a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    GreaterEqual,
    LessEqual,
    IsEmpty,
    IsNotEmpty,
}

impl FilterOperator {
    /// Every operator, in the order text columns offer them.
    pub const ALL: [FilterOperator; 12] = [
        FilterOperator::Equals,
        FilterOperator::NotEquals,
        FilterOperator::Contains,
        FilterOperator::NotContains,
        FilterOperator::StartsWith,
        FilterOperator::EndsWith,
        FilterOperator::GreaterThan,
        FilterOperator::LessThan,
        FilterOperator::GreaterEqual,
        FilterOperator::LessEqual,
        FilterOperator::IsEmpty,
        FilterOperator::IsNotEmpty,
    ];

    /// Label shown in the filter panel.
    pub fn label(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "equals",
            FilterOperator::NotEquals => "not equals",
            FilterOperator::Contains => "contains",
            FilterOperator::NotContains => "not contains",
            FilterOperator::StartsWith => "starts with",
            FilterOperator::EndsWith => "ends with",
            FilterOperator::GreaterThan => "greater than",
            FilterOperator::LessThan => "less than",
            FilterOperator::GreaterEqual => "greater or equal",
            FilterOperator::LessEqual => "less or equal",
            FilterOperator::IsEmpty => "is empty",
            FilterOperator::IsNotEmpty => "is not empty",
        }
    }

    /// Label for image columns, where emptiness reads as presence.
    pub fn image_label(&self) -> &'static str {
        match self {
            FilterOperator::IsEmpty => "no image",
            FilterOperator::IsNotEmpty => "has image",
            other => other.label(),
        }
    }

    /// Whether the operator compares against a user-supplied value.
    pub fn needs_value(&self) -> bool {
        !matches!(self, FilterOperator::IsEmpty | FilterOperator::IsNotEmpty)
    }

    /// Operators offered for a column of the given type.
    pub fn for_column_type(column_type: ColumnType) -> &'static [FilterOperator] {
        use FilterOperator::*;
        const ORDERED: &[FilterOperator] = &[
            Equals,
            NotEquals,
            GreaterThan,
            LessThan,
            GreaterEqual,
            LessEqual,
            IsEmpty,
            IsNotEmpty,
        ];
        const SELECT: &[FilterOperator] = &[Equals, NotEquals, IsEmpty, IsNotEmpty];
        const IMAGE: &[FilterOperator] = &[IsEmpty, IsNotEmpty];

        match column_type {
            ColumnType::Number | ColumnType::Date => ORDERED,
            ColumnType::Select => SELECT,
            ColumnType::Image => IMAGE,
            ColumnType::Text | ColumnType::Email => &FilterOperator::ALL,
        }
    }
}

/// One predicate of the active filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: String,
}

impl FilterCondition {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// A condition is usable once it names a field and, for operators that
    /// compare, carries a value.
    pub fn is_complete(&self) -> bool {
        !self.field.is_empty() && (!self.operator.needs_value() || !self.value.is_empty())
    }
}

/// Sort direction for columns and group keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// The opposite direction.
    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ascending",
            SortDirection::Desc => "descending",
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortDirection::Asc => "▲",
            SortDirection::Desc => "▼",
        }
    }
}

/// Active grouping: the field to partition by and the order of group keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub field: String,
    #[serde(default)]
    pub sort: SortDirection,
}

impl GroupConfig {
    pub fn new(field: impl Into<String>, sort: SortDirection) -> Self {
        Self {
            field: field.into(),
            sort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_serde_names() {
        let json = serde_json::to_string(&FilterOperator::GreaterEqual).unwrap();
        assert_eq!(json, "\"greater_equal\"");
        let op: FilterOperator = serde_json::from_str("\"is_not_empty\"").unwrap();
        assert_eq!(op, FilterOperator::IsNotEmpty);
    }

    #[test]
    fn test_operators_per_column_type() {
        assert_eq!(FilterOperator::for_column_type(ColumnType::Text).len(), 12);
        assert_eq!(
            FilterOperator::for_column_type(ColumnType::Image),
            &[FilterOperator::IsEmpty, FilterOperator::IsNotEmpty]
        );
        let select = FilterOperator::for_column_type(ColumnType::Select);
        assert!(!select.contains(&FilterOperator::Contains));
        let number = FilterOperator::for_column_type(ColumnType::Number);
        assert!(number.contains(&FilterOperator::LessEqual));
        assert!(!number.contains(&FilterOperator::StartsWith));
    }

    #[test]
    fn test_condition_is_complete() {
        assert!(FilterCondition::new("name", FilterOperator::Contains, "a").is_complete());
        assert!(!FilterCondition::new("name", FilterOperator::Contains, "").is_complete());
        assert!(FilterCondition::new("name", FilterOperator::IsEmpty, "").is_complete());
        assert!(!FilterCondition::new("", FilterOperator::IsEmpty, "").is_complete());
    }

    #[test]
    fn test_condition_value_defaults() {
        let cond: FilterCondition =
            serde_json::from_str(r#"{"field":"avatar","operator":"is_empty"}"#).unwrap();
        assert_eq!(cond.value, "");
    }

    #[test]
    fn test_sort_direction_toggle() {
        assert_eq!(SortDirection::Asc.toggle(), SortDirection::Desc);
        assert_eq!(SortDirection::Desc.toggle(), SortDirection::Asc);
        assert_eq!(serde_json::to_string(&SortDirection::Desc).unwrap(), "\"desc\"");
    }

    #[test]
    fn test_image_labels() {
        assert_eq!(FilterOperator::IsNotEmpty.image_label(), "has image");
        assert_eq!(FilterOperator::Equals.image_label(), "equals");
    }
}
