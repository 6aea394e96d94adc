//! Query results
//!
//! A `Cursor` owns the rows that matched when the query executed. Later
//! writes never show up in it, and it can be walked exactly once.

use super::schema::Column;
use crate::book::{Book, Value};
use crate::{Error, Result};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// One result row, restricted to the query's projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    cells: Vec<(Column, Value)>,
}

impl Row {
    pub(crate) fn new(cells: Vec<(Column, Value)>) -> Self {
        Self { cells }
    }

    /// Value of a column, `None` when the column was not projected
    pub fn get(&self, column: Column) -> Option<&Value> {
        self.cells.iter().find(|(c, _)| *c == column).map(|(_, v)| v)
    }

    pub fn get_i64(&self, column: Column) -> Option<i64> {
        self.get(column).and_then(Value::as_i64)
    }

    pub fn get_str(&self, column: Column) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.cells.iter().map(|(c, _)| *c)
    }

    pub fn cells(&self) -> &[(Column, Value)] {
        &self.cells
    }

    /// Converts a row that carries every mandatory column into a `Book`.
    pub fn to_book(&self) -> Result<Book> {
        let int = |column: Column| {
            self.get_i64(column).ok_or_else(|| {
                Error::validation(column.field_name(), "not present in this row")
            })
        };
        let text = |column: Column| self.get_str(column).map(str::to_string);

        Ok(Book {
            id: int(Column::Id)?,
            name: text(Column::Name).ok_or_else(|| {
                Error::validation(Column::Name.field_name(), "not present in this row")
            })?,
            price: int(Column::Price)?,
            quantity: int(Column::Quantity)?,
            supplier_name: text(Column::SupplierName),
            supplier_phone: text(Column::SupplierPhone),
        })
    }
}

impl Serialize for Row {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (column, value) in &self.cells {
            map.serialize_entry(column.field_name(), value)?;
        }
        map.end()
    }
}

/// Forward-only, one-shot iterator over a query snapshot.
///
/// The cursor may be handed to another thread, but it is not `Clone` and
/// only one consumer can advance it.
#[derive(Debug)]
pub struct Cursor {
    columns: Vec<Column>,
    rows: std::vec::IntoIter<Row>,
}

impl Cursor {
    pub(crate) fn new(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows: rows.into_iter(),
        }
    }

    /// Columns every row carries, in projection order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Rows not yet consumed
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    /// Drains the cursor into `Book`s. Requires a projection that includes
    /// every mandatory column.
    pub fn into_books(self) -> Result<Vec<Book>> {
        self.map(|row| row.to_book()).collect()
    }
}

impl Iterator for Cursor {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.rows.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for Cursor {}
