//! Book records and field values
//!
//! - `Value`: a single cell (`Null`, `Integer`, `Text`)
//! - `FieldSet`: sparse set of column assignments used by insert and update
//! - `Book`: a full snapshot of one stored record
//!
//! A `FieldSet` distinguishes "not supplied" (column absent) from "set to
//! empty/zero" (column present with `Text("")` or `Integer(0)`), which is
//! what partial updates rely on.

use crate::storage::schema::{Column, ColumnKind};
use crate::{Error, Result};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single column value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(n) => ToSqlOutput::Borrowed(ValueRef::Integer(*n)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Value::Null),
            ValueRef::Integer(n) => Ok(Value::Integer(n)),
            ValueRef::Text(_) => value.as_str().map(|s| Value::Text(s.to_string())),
            ValueRef::Real(_) | ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}

/// Checks one value against its column's constraints.
pub(crate) fn validate_value(column: Column, value: &Value) -> Result<()> {
    let field = column.field_name();

    if !column.is_writable() {
        return Err(Error::validation(field, "is assigned by the store and cannot be written"));
    }

    match (column.kind(), value) {
        (_, Value::Null) if column.is_nullable() => Ok(()),
        (_, Value::Null) => Err(Error::validation(field, "is required")),
        (ColumnKind::NonNegativeInteger, Value::Integer(n)) if *n < 0 => {
            Err(Error::validation(field, format!("must not be negative (got {})", n)))
        }
        (ColumnKind::NonNegativeInteger, Value::Integer(_)) => Ok(()),
        (ColumnKind::NonNegativeInteger, Value::Text(_)) => {
            Err(Error::validation(field, "must be an integer"))
        }
        (ColumnKind::Text, Value::Text(s)) if column == Column::Name && s.trim().is_empty() => {
            Err(Error::validation(field, "must not be empty"))
        }
        (ColumnKind::Text, Value::Text(_)) => Ok(()),
        (ColumnKind::Text, Value::Integer(_)) => Err(Error::validation(field, "must be text")),
    }
}

/// Sparse set of column assignments.
///
/// Iteration order is table order, so validation reports the same first
/// error for the same input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSet {
    values: BTreeMap<Column, Value>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`FieldSet::set`]
    pub fn with(mut self, column: Column, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn with_text(self, column: Column, value: impl Into<String>) -> Self {
        self.with(column, Value::Text(value.into()))
    }

    pub fn with_integer(self, column: Column, value: i64) -> Self {
        self.with(column, Value::Integer(value))
    }

    /// Assigns a column, replacing any earlier assignment.
    pub fn set(&mut self, column: Column, value: impl Into<Value>) {
        self.values.insert(column, value.into());
    }

    pub fn remove(&mut self, column: Column) -> Option<Value> {
        self.values.remove(&column)
    }

    pub fn get(&self, column: Column) -> Option<&Value> {
        self.values.get(&column)
    }

    pub fn contains(&self, column: Column) -> bool {
        self.values.contains_key(&column)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Column, &Value)> {
        self.values.iter().map(|(c, v)| (*c, v))
    }

    /// Validates a complete record for insertion.
    ///
    /// Every supplied value must satisfy its column, and every required
    /// column must be present.
    pub fn validate_for_insert(&self) -> Result<()> {
        for (column, value) in self.iter() {
            validate_value(column, value)?;
        }
        for column in Column::ALL.iter().filter(|c| c.is_required()) {
            if !self.contains(*column) {
                return Err(Error::validation(column.field_name(), "is required"));
            }
        }
        Ok(())
    }

    /// Validates only the supplied values.
    pub fn validate_for_update(&self) -> Result<()> {
        for (column, value) in self.iter() {
            validate_value(column, value)?;
        }
        Ok(())
    }
}

impl FromIterator<(Column, Value)> for FieldSet {
    fn from_iter<I: IntoIterator<Item = (Column, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// A stored book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub quantity: i64,
    pub supplier_name: Option<String>,
    pub supplier_phone: Option<String>,
}

impl Book {
    /// Writable fields of this book, ready to insert as a new record.
    pub fn to_fields(&self) -> FieldSet {
        FieldSet::new()
            .with_text(Column::Name, self.name.clone())
            .with_integer(Column::Price, self.price)
            .with_integer(Column::Quantity, self.quantity)
            .with(Column::SupplierName, self.supplier_name.clone())
            .with(Column::SupplierPhone, self.supplier_phone.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dune() -> FieldSet {
        FieldSet::new()
            .with_text(Column::Name, "Dune")
            .with_integer(Column::Price, 15)
            .with_integer(Column::Quantity, 3)
            .with_text(Column::SupplierName, "Ace")
            .with_text(Column::SupplierPhone, "555-0100")
    }

    #[test]
    fn test_complete_record_validates() {
        assert!(dune().validate_for_insert().is_ok());
    }

    #[test]
    fn test_supplier_fields_are_optional() {
        let mut fields = dune();
        fields.remove(Column::SupplierName);
        fields.set(Column::SupplierPhone, Value::Null);
        assert!(fields.validate_for_insert().is_ok());

        let fields = dune().with_text(Column::SupplierName, "");
        assert!(fields.validate_for_insert().is_ok());
    }

    #[test]
    fn test_missing_mandatory_field() {
        let mut fields = dune();
        fields.remove(Column::Quantity);
        let err = fields.validate_for_insert().unwrap_err();
        assert_eq!(err.field(), Some("quantity"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = dune().with_text(Column::Name, "").validate_for_insert().unwrap_err();
        assert_eq!(err.field(), Some("name"));

        let err = dune().with_text(Column::Name, "   ").validate_for_insert().unwrap_err();
        assert_eq!(err.field(), Some("name"));
    }

    #[test]
    fn test_negative_numbers_rejected() {
        let err = dune().with_integer(Column::Price, -1).validate_for_insert().unwrap_err();
        assert_eq!(err.field(), Some("price"));

        let update = FieldSet::new().with_integer(Column::Quantity, -5);
        let err = update.validate_for_update().unwrap_err();
        assert_eq!(err.field(), Some("quantity"));

        // Zero is a valid quantity
        let update = FieldSet::new().with_integer(Column::Quantity, 0);
        assert!(update.validate_for_update().is_ok());
    }

    #[test]
    fn test_wrong_kinds_are_not_coerced() {
        let err = dune().with_text(Column::Price, "58").validate_for_insert().unwrap_err();
        assert_eq!(err.field(), Some("price"));

        let err = dune().with_integer(Column::Name, 7).validate_for_insert().unwrap_err();
        assert_eq!(err.field(), Some("name"));
    }

    #[test]
    fn test_id_cannot_be_written() {
        let err = dune().with_integer(Column::Id, 9).validate_for_insert().unwrap_err();
        assert_eq!(err.field(), Some("id"));

        let update = FieldSet::new().with_integer(Column::Id, 9);
        assert!(update.validate_for_update().is_err());
    }

    #[test]
    fn test_update_validates_only_supplied_fields() {
        let update = FieldSet::new().with_integer(Column::Quantity, 2);
        assert!(update.validate_for_update().is_ok());
        assert!(update.validate_for_insert().is_err());

        // Explicit null on a mandatory column is still rejected
        let update = FieldSet::new().with(Column::Name, Value::Null);
        assert_eq!(update.validate_for_update().unwrap_err().field(), Some("name"));
    }

    #[test]
    fn test_value_serializes_untagged() {
        let json = serde_json::to_string(&vec![Value::Null, Value::Integer(3), Value::from("x")]).unwrap();
        assert_eq!(json, r#"[null,3,"x"]"#);
    }
}
