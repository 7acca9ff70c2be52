//! Default column set and generated sample data.

use chrono::{Days, Local};
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::model::{CellValue, ColumnDef, ColumnType, Row, ID_FIELD};

const FIRST_NAMES: &[&str] = &[
    "Alice", "Bob", "Carol", "David", "Erin", "Frank", "Grace", "Heidi", "Ivan", "Judy", "Karl",
    "Laura", "Mallory", "Niaj", "Olivia", "Peggy", "Quentin", "Rupert", "Sybil", "Trent",
];

const DOMAINS: &[&str] = &["example.com", "test.com", "demo.com", "company.com"];

/// Options of the default department column.
pub const DEPARTMENTS: &[&str] = &["Engineering", "Product", "Design", "Operations", "Marketing"];

/// Options of the default status column.
pub const STATUSES: &[&str] = &["Active", "Resigned", "On leave"];

/// Name given to rows created with the add-row action.
pub const NEW_ROW_NAME: &str = "New employee";

/// Age given to rows created with the add-row action.
pub const NEW_ROW_AGE: f64 = 25.0;

/// The column set used on first launch and after a full reset.
pub fn default_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new(ID_FIELD, "ID", ColumnType::Number)
            .with_width(80)
            .read_only(),
        ColumnDef::new("name", "Name", ColumnType::Text),
        ColumnDef::new("age", "Age", ColumnType::Number).with_width(80),
        ColumnDef::new("email", "Email", ColumnType::Email).with_width(200),
        ColumnDef::new("department", "Department", ColumnType::Select)
            .with_options(DEPARTMENTS.iter().copied()),
        ColumnDef::new("joinDate", "Join date", ColumnType::Date),
        ColumnDef::new("status", "Status", ColumnType::Select)
            .with_width(100)
            .with_options(STATUSES.iter().copied()),
        ColumnDef::new("avatar", "Avatar", ColumnType::Image).with_width(100),
    ]
}

/// Today's date in `YYYY-MM-DD` form.
pub fn today() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Generate `count` employee rows with ids `1..=count`.
///
/// Select values are drawn from the options of the matching column so every
/// generated value is valid for editing.
pub fn sample_rows(columns: &[ColumnDef], count: usize) -> Vec<Row> {
    let mut rng = rand::rng();
    let options_of = |field: &str, fallback: &'static [&'static str]| -> Vec<String> {
        columns
            .iter()
            .find(|c| c.field == field && !c.options.is_empty())
            .map(|c| c.options.clone())
            .unwrap_or_else(|| fallback.iter().map(|s| s.to_string()).collect())
    };
    let departments = options_of("department", DEPARTMENTS);
    let statuses = options_of("status", STATUSES);
    let today = Local::now().date_naive();

    (1..=count)
        .map(|i| {
            let first = FIRST_NAMES.choose(&mut rng).copied().unwrap_or("Alice");
            let name = if i > FIRST_NAMES.len() {
                format!("{} {}", first, i)
            } else {
                first.to_string()
            };
            let domain = DOMAINS.choose(&mut rng).copied().unwrap_or("example.com");
            let joined = today
                .checked_sub_days(Days::new(rng.random_range(0..730)))
                .unwrap_or(today)
                .format("%Y-%m-%d")
                .to_string();

            Row::new()
                .with(ID_FIELD, i as u64)
                .with("name", name)
                .with("age", rng.random_range(20u32..60) as f64)
                .with("email", format!("user{}@{}", i, domain))
                .with(
                    "department",
                    departments.choose(&mut rng).cloned().unwrap_or_default(),
                )
                .with("joinDate", joined)
                .with(
                    "status",
                    statuses.choose(&mut rng).cloned().unwrap_or_default(),
                )
                .with("avatar", CellValue::empty())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_default_columns() {
        let columns = default_columns();
        assert_eq!(columns.len(), 8);
        assert_eq!(columns[0].field, "id");
        assert!(!columns[0].editable);
        assert!(columns[1..].iter().all(|c| c.editable));
        assert_eq!(columns[4].options.len(), 5);
        assert_eq!(columns[7].column_type, ColumnType::Image);
    }

    #[test]
    fn test_sample_rows_shape() {
        let columns = default_columns();
        let rows = sample_rows(&columns, 30);
        assert_eq!(rows.len(), 30);

        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.id(), Some(i as u64 + 1));
            let age = row.get("age").and_then(CellValue::as_f64).unwrap();
            assert!((20.0..60.0).contains(&age));
            assert!(row.display("email").starts_with(&format!("user{}@", i + 1)));
            assert!(DEPARTMENTS.contains(&row.display("department").as_str()));
            assert!(STATUSES.contains(&row.display("status").as_str()));
            assert!(NaiveDate::parse_from_str(&row.display("joinDate"), "%Y-%m-%d").is_ok());
            assert!(row.get("avatar").unwrap().is_empty());
        }
    }

    #[test]
    fn test_sample_rows_zero() {
        assert!(sample_rows(&default_columns(), 0).is_empty());
    }
}
