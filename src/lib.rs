//! # Stockroom - Resource-addressed inventory store
//!
//! A URI-routed CRUD provider over a single SQLite table of books.
//!
//! Stockroom provides:
//! - A fixed single-table schema (`storage::schema`)
//! - A record store with validation, projections, filters and sort orders
//! - Tagged resource identifiers (`content://<authority>/books[/<id>]`)
//! - A provider that routes identifiers to store operations
//! - A change notifier that signals subscribers after every committed mutation
//! - The `Inventory` facade, the only entry point external callers need
//!
//! ```no_run
//! use stockroom::{FieldSet, Inventory, QueryArgs};
//!
//! let inventory = Inventory::in_memory()?;
//! let books = inventory.collection_uri().to_string();
//!
//! let fields = FieldSet::new()
//!     .with_text(stockroom::Column::Name, "Dune")
//!     .with_integer(stockroom::Column::Price, 15)
//!     .with_integer(stockroom::Column::Quantity, 3);
//! let uri = inventory.insert(&books, &fields)?;
//!
//! for row in inventory.query(&uri.to_string(), QueryArgs::default())? {
//!     println!("{:?}", row.to_book()?);
//! }
//! # Ok::<(), stockroom::Error>(())
//! ```

pub mod book;
pub mod config;
pub mod inventory;
pub mod notify;
pub mod provider;
pub mod storage;
pub mod ui;
pub mod uri;

// Re-exports for convenient access
pub use book::{Book, FieldSet, Value};
pub use inventory::{Inventory, InventoryStats, QueryArgs};
pub use notify::{Change, ChangeKind, ChangeNotifier, Subscriber, SubscriptionId};
pub use provider::BookProvider;
pub use storage::schema::Column;
pub use storage::{BookStore, Cursor, Filter, Projection, Row, SortOrder};
pub use uri::{ResourceKind, ResourceTarget, ResourceUri};

/// Result type alias for Stockroom operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Stockroom operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Unrecognized resource: {0}")]
    UnrecognizedResource(String),

    #[error("Unsupported operation: cannot {operation} {uri}")]
    UnsupportedOperation { operation: &'static str, uri: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage unavailable at {location}: {reason}")]
    StorageUnavailable { location: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Field name for validation errors, `None` for every other variant
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}
