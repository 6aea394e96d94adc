//! SQLite storage implementation

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, ErrorCode, OpenFlags, params_from_iter};

use super::cursor::{Cursor, Row};
use super::schema::{self, SCHEMA_VERSION, TABLE_NAME};
use super::selection::{Filter, Projection, SortOrder};
use crate::book::{FieldSet, Value};
use crate::{Error, Result};

/// Read-only connections opened next to the writer for file-backed stores
pub const DEFAULT_READ_CONNECTIONS: usize = 4;

/// SQLite-backed store for the books table.
///
/// All writes go through a single connection behind a mutex; the guard is
/// held for exactly one statement and released on every exit path.
/// File-backed stores run in WAL mode with a pool of read-only
/// connections so reads never queue behind each other or behind a write.
/// In-memory stores read through the writer.
pub struct BookStore {
    location: String,
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    read_cursor: AtomicUsize,
}

impl BookStore {
    /// Open a database file (creates it and missing parent directories)
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_readers(path, DEFAULT_READ_CONNECTIONS)
    }

    /// Open a database file with `read_connections` read-only connections.
    ///
    /// Zero routes every read through the writer.
    pub fn open_with_readers(path: &Path, read_connections: usize) -> Result<Self> {
        let location = path.display().to_string();
        let unavailable = |reason: String| Error::StorageUnavailable {
            location: location.clone(),
            reason,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| unavailable(e.to_string()))?;
            }
        }

        let conn = Connection::open(path).map_err(|e| unavailable(e.to_string()))?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))
            .map_err(|e| unavailable(e.to_string()))?;
        Self::initialize_schema(&conn, &location)?;

        let mut readers = Vec::with_capacity(read_connections);
        for _ in 0..read_connections {
            let reader = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(|e| unavailable(e.to_string()))?;
            readers.push(Mutex::new(reader));
        }

        tracing::info!("Opened book store at {} ({} read connections)", location, read_connections);
        Ok(Self {
            location,
            writer: Mutex::new(conn),
            readers,
            read_cursor: AtomicUsize::new(0),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let location = ":memory:".to_string();
        let conn = Connection::open_in_memory().map_err(|e| Error::StorageUnavailable {
            location: location.clone(),
            reason: e.to_string(),
        })?;
        Self::initialize_schema(&conn, &location)?;
        Ok(Self {
            location,
            writer: Mutex::new(conn),
            readers: Vec::new(),
            read_cursor: AtomicUsize::new(0),
        })
    }

    /// Create the table if absent and stamp the schema version.
    ///
    /// A database carrying any other version is refused.
    fn initialize_schema(conn: &Connection, location: &str) -> Result<()> {
        let unavailable = |reason: String| Error::StorageUnavailable {
            location: location.to_string(),
            reason,
        };

        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(|e| unavailable(e.to_string()))?;
        if version != 0 && version != SCHEMA_VERSION {
            return Err(unavailable(format!(
                "unsupported schema version {} (expected {})",
                version, SCHEMA_VERSION
            )));
        }

        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, []).map_err(|e| unavailable(e.to_string()))?;
        }
        if version == 0 {
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)
                .map_err(|e| unavailable(e.to_string()))?;
            tracing::debug!("Created books table (schema version {})", SCHEMA_VERSION);
        }
        Ok(())
    }

    /// Where this store lives (`:memory:` for in-memory stores)
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Schema version recorded in the database
    pub fn schema_version(&self) -> Result<i64> {
        self.with_reader(|conn| Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?))
    }

    fn writer(&self) -> Result<MutexGuard<'_, Connection>> {
        self.writer.lock().map_err(|_| Error::StorageUnavailable {
            location: self.location.clone(),
            reason: "write connection lock poisoned".to_string(),
        })
    }

    /// Run a read against the next pooled reader (round-robin).
    fn with_reader<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        if self.readers.is_empty() {
            let conn = self.writer()?;
            return f(&conn);
        }
        let index = self.read_cursor.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[index].lock().map_err(|_| Error::StorageUnavailable {
            location: self.location.clone(),
            reason: "read connection lock poisoned".to_string(),
        })?;
        f(&conn)
    }

    // ========== Query Operations ==========

    /// Run a query and snapshot the matching rows into a cursor
    pub fn query_all(
        &self,
        projection: &Projection,
        filter: Option<&Filter>,
        sort_order: Option<&SortOrder>,
    ) -> Result<Cursor> {
        let columns = projection.columns();
        let mut sql = format!("SELECT {} FROM {}", projection.to_sql(), TABLE_NAME);
        let mut args: &[Value] = &[];
        if let Some(filter) = filter {
            filter.validate()?;
            sql.push_str(" WHERE ");
            sql.push_str(filter.clause());
            args = filter.args();
        }
        if let Some(order) = sort_order {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.to_sql());
        }
        tracing::debug!("query: {}", sql);

        let rows = self.with_reader(|conn| {
            let mut stmt = conn.prepare(&sql).map_err(|e| classify(e, filter))?;
            let rows = stmt
                .query_map(params_from_iter(args.iter()), |row| {
                    let mut cells = Vec::with_capacity(columns.len());
                    for (i, column) in columns.iter().enumerate() {
                        cells.push((*column, row.get::<_, Value>(i)?));
                    }
                    Ok(Row::new(cells))
                })
                .map_err(|e| classify(e, filter))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        Ok(Cursor::new(columns, rows))
    }

    /// Get a single book by id
    pub fn query_one(&self, id: i64, projection: &Projection) -> Result<Row> {
        self.query_all(projection, Some(&Filter::by_id(id)), None)?
            .next()
            .ok_or_else(|| Error::NotFound(format!("{}/{}", TABLE_NAME, id)))
    }

    /// Count all books
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self.with_reader(|conn| {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", TABLE_NAME), [], |row| row.get(0))?)
        })?;
        Ok(count as usize)
    }

    // ========== Write Operations ==========

    /// Insert a new book and return its id
    pub fn insert(&self, fields: &FieldSet) -> Result<i64> {
        fields.validate_for_insert()?;

        let columns: Vec<&str> = fields.iter().map(|(c, _)| c.sql_name()).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            TABLE_NAME,
            columns.join(", "),
            placeholders
        );

        let conn = self.writer()?;
        conn.execute(&sql, params_from_iter(fields.iter().map(|(_, v)| v)))?;
        let id = conn.last_insert_rowid();
        tracing::debug!("Inserted book {}", id);
        Ok(id)
    }

    /// Update one book by id
    pub fn update(&self, id: i64, fields: &FieldSet) -> Result<usize> {
        self.update_where(fields, Some(&Filter::by_id(id)))
    }

    /// Update every book matching `filter` (all books when `None`).
    ///
    /// Only supplied fields are validated and written. An empty field set
    /// is a no-op that reports zero rows.
    pub fn update_where(&self, fields: &FieldSet, filter: Option<&Filter>) -> Result<usize> {
        if fields.is_empty() {
            return Ok(0);
        }
        fields.validate_for_update()?;

        let assignments: Vec<String> = fields
            .iter()
            .map(|(c, _)| format!("{} = ?", c.sql_name()))
            .collect();
        let mut sql = format!("UPDATE {} SET {}", TABLE_NAME, assignments.join(", "));
        let mut args: Vec<&Value> = fields.iter().map(|(_, v)| v).collect();
        if let Some(filter) = filter {
            filter.validate()?;
            sql.push_str(" WHERE ");
            sql.push_str(filter.clause());
            args.extend(filter.args());
        }
        tracing::debug!("update: {}", sql);

        let conn = self.writer()?;
        let rows = conn
            .execute(&sql, params_from_iter(args))
            .map_err(|e| classify(e, filter))?;
        Ok(rows)
    }

    /// Delete one book by id
    pub fn delete_one(&self, id: i64) -> Result<usize> {
        self.delete_where(Some(&Filter::by_id(id)))
    }

    /// Delete every book
    pub fn delete_all(&self) -> Result<usize> {
        self.delete_where(None)
    }

    /// Delete every book matching `filter` (all books when `None`)
    pub fn delete_where(&self, filter: Option<&Filter>) -> Result<usize> {
        let mut sql = format!("DELETE FROM {}", TABLE_NAME);
        let mut args: &[Value] = &[];
        if let Some(filter) = filter {
            filter.validate()?;
            sql.push_str(" WHERE ");
            sql.push_str(filter.clause());
            args = filter.args();
        }
        tracing::debug!("delete: {}", sql);

        let conn = self.writer()?;
        let rows = conn
            .execute(&sql, params_from_iter(args.iter()))
            .map_err(|e| classify(e, filter))?;
        Ok(rows)
    }
}

/// Blame a malformed caller filter on the filter rather than on storage.
///
/// Every other statement fragment is built from schema columns, so a
/// generic SQL error with a caller filter present comes from the filter.
fn classify(err: rusqlite::Error, filter: Option<&Filter>) -> Error {
    if filter.is_some() {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg) if e.code == ErrorCode::Unknown => {
                let reason = msg.clone().unwrap_or_else(|| e.to_string());
                return Error::validation("filter", reason);
            }
            rusqlite::Error::MultipleStatement => {
                return Error::validation("filter", "must be a single expression");
            }
            rusqlite::Error::InvalidParameterCount(given, expected) => {
                return Error::validation(
                    "filter",
                    format!("clause binds {} parameter(s) but {} argument(s) were given", expected, given),
                );
            }
            rusqlite::Error::InvalidParameterName(name) => {
                return Error::validation("filter", format!("unknown parameter '{}'", name));
            }
            _ => {}
        }
    }
    Error::Storage(err)
}
