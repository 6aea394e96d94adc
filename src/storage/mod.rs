//! Storage Layer - SQLite-backed persistence
//!
//! System of record is a single SQLite table:
//! - books(_id, product_name, price, quantity, supplier_name, supplier_phone_number)
//!
//! Reads return `Cursor` snapshots shaped by a `Projection`, an optional
//! `Filter` and an optional `SortOrder`.

pub mod cursor;
pub mod schema;
pub mod selection;
pub mod sqlite;

pub use cursor::{Cursor, Row};
pub use selection::{Direction, Filter, Projection, SortOrder};
pub use sqlite::{BookStore, DEFAULT_READ_CONNECTIONS};
