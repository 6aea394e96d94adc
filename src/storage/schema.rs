//! Database schema definitions
//!
//! Single table, fixed at version 1. Column metadata lives here so the
//! store, the selection builders and the CLI agree on names and kinds.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the books table
pub const TABLE_NAME: &str = "books";

/// Path segment that addresses the books collection in a resource URI
pub const PATH_BOOKS: &str = "books";

/// Schema version stamped into `PRAGMA user_version`
pub const SCHEMA_VERSION: i64 = 1;

/// SQL to create the books table
pub const CREATE_BOOKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS books (
    _id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_name TEXT NOT NULL,
    price INTEGER NOT NULL,
    quantity INTEGER NOT NULL,
    supplier_name TEXT,
    supplier_phone_number TEXT
)
"#;

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![CREATE_BOOKS_TABLE]
}

/// Kind of value a column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    /// Integer that must never be negative
    NonNegativeInteger,
}

/// A column of the books table.
///
/// Ordering follows the table definition, which is also the default
/// projection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Column {
    Id,
    Name,
    Price,
    Quantity,
    SupplierName,
    SupplierPhone,
}

impl Column {
    /// Every column, in table order
    pub const ALL: [Column; 6] = [
        Column::Id,
        Column::Name,
        Column::Price,
        Column::Quantity,
        Column::SupplierName,
        Column::SupplierPhone,
    ];

    /// Column name as stored in SQLite
    pub fn sql_name(&self) -> &'static str {
        match self {
            Column::Id => "_id",
            Column::Name => "product_name",
            Column::Price => "price",
            Column::Quantity => "quantity",
            Column::SupplierName => "supplier_name",
            Column::SupplierPhone => "supplier_phone_number",
        }
    }

    /// Field name reported in validation errors and JSON output
    pub fn field_name(&self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::Name => "name",
            Column::Price => "price",
            Column::Quantity => "quantity",
            Column::SupplierName => "supplierName",
            Column::SupplierPhone => "supplierPhone",
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Id | Column::Price | Column::Quantity => ColumnKind::NonNegativeInteger,
            Column::Name | Column::SupplierName | Column::SupplierPhone => ColumnKind::Text,
        }
    }

    /// Whether an insert must supply this column.
    pub fn is_required(&self) -> bool {
        matches!(self, Column::Name | Column::Price | Column::Quantity)
    }

    /// Whether the column accepts NULL.
    pub fn is_nullable(&self) -> bool {
        matches!(self, Column::SupplierName | Column::SupplierPhone)
    }

    /// Whether callers may write this column. `_id` is owned by the store.
    pub fn is_writable(&self) -> bool {
        !matches!(self, Column::Id)
    }
}

impl FromStr for Column {
    type Err = Error;

    /// Accepts either the SQL column name or the field name.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Column::ALL
            .iter()
            .copied()
            .find(|c| c.sql_name().eq_ignore_ascii_case(s) || c.field_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::validation("column", format!("unknown column: {}", s)))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_parse_from_sql_and_field_names() {
        assert_eq!("product_name".parse::<Column>().unwrap(), Column::Name);
        assert_eq!("name".parse::<Column>().unwrap(), Column::Name);
        assert_eq!("supplierPhone".parse::<Column>().unwrap(), Column::SupplierPhone);
        assert_eq!("supplier_phone_number".parse::<Column>().unwrap(), Column::SupplierPhone);
        assert_eq!("_ID".parse::<Column>().unwrap(), Column::Id);
        assert!("isbn".parse::<Column>().is_err());
    }

    #[test]
    fn test_required_columns() {
        let required: Vec<_> = Column::ALL.iter().filter(|c| c.is_required()).collect();
        assert_eq!(required, vec![&Column::Name, &Column::Price, &Column::Quantity]);
        assert!(!Column::Id.is_writable());
    }

    #[test]
    fn test_schema_creates_books_table() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        for stmt in all_schema_statements() {
            conn.execute(stmt, []).unwrap();
            // Idempotent
            conn.execute(stmt, []).unwrap();
        }

        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('books')").unwrap();
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        let expected: Vec<&str> = Column::ALL.iter().map(|c| c.sql_name()).collect();
        assert_eq!(names, expected);
    }
}
