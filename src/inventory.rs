//! Access facade
//!
//! `Inventory` is the single entry point for callers. It parses URI
//! strings, hands them to the provider and passes results and errors
//! through untouched.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::book::FieldSet;
use crate::config::InventoryConfig;
use crate::notify::ChangeNotifier;
use crate::provider::BookProvider;
use crate::storage::{BookStore, Cursor, Filter, Projection, SortOrder};
use crate::uri::{DEFAULT_AUTHORITY, ResourceKind, ResourceUri};
use crate::Result;

/// Query parameters besides the URI
#[derive(Debug, Clone, Default)]
pub struct QueryArgs {
    pub projection: Projection,
    pub filter: Option<Filter>,
    pub sort_order: Option<SortOrder>,
}

impl QueryArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn sort_order(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = Some(sort_order);
        self
    }
}

/// Snapshot of store metadata
#[derive(Debug, Clone, Serialize)]
pub struct InventoryStats {
    pub books: usize,
    pub location: String,
    pub authority: String,
    pub schema_version: i64,
}

pub struct Inventory {
    provider: BookProvider,
}

impl Inventory {
    pub fn new(provider: BookProvider) -> Self {
        Self { provider }
    }

    /// Open the store described by `config`, relative paths resolved
    /// against the working directory
    pub fn open(config: &InventoryConfig) -> Result<Self> {
        let base = std::env::current_dir()?;
        Self::open_in(config, &base)
    }

    /// Open the store described by `config`, relative paths resolved
    /// against `base`
    pub fn open_in(config: &InventoryConfig, base: &Path) -> Result<Self> {
        let path = config.database_path_in(base);
        let store = BookStore::open_with_readers(&path, config.read_connections())?;
        Ok(Self::with_store(store, config.authority()))
    }

    /// Fresh in-memory store under the default authority
    pub fn in_memory() -> Result<Self> {
        Ok(Self::with_store(BookStore::open_in_memory()?, DEFAULT_AUTHORITY))
    }

    pub fn with_store(store: BookStore, authority: &str) -> Self {
        let provider = BookProvider::new(authority, Arc::new(store), Arc::new(ChangeNotifier::new()));
        Self::new(provider)
    }

    pub fn authority(&self) -> &str {
        self.provider.authority()
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        self.provider.notifier()
    }

    pub fn collection_uri(&self) -> ResourceUri {
        ResourceUri::collection(self.authority())
    }

    pub fn item_uri(&self, id: i64) -> ResourceUri {
        ResourceUri::item(self.authority(), id)
    }

    pub fn query(&self, uri: &str, args: QueryArgs) -> Result<Cursor> {
        let uri = self.provider.resolve(uri)?;
        self.provider
            .query(&uri, &args.projection, args.filter, args.sort_order.as_ref())
    }

    pub fn insert(&self, uri: &str, fields: &FieldSet) -> Result<ResourceUri> {
        let uri = self.provider.resolve(uri)?;
        self.provider.insert(&uri, fields)
    }

    pub fn update(&self, uri: &str, fields: &FieldSet, filter: Option<Filter>) -> Result<usize> {
        let uri = self.provider.resolve(uri)?;
        self.provider.update(&uri, fields, filter)
    }

    pub fn delete(&self, uri: &str, filter: Option<Filter>) -> Result<usize> {
        let uri = self.provider.resolve(uri)?;
        self.provider.delete(&uri, filter)
    }

    pub fn resource_type(&self, uri: &str) -> Result<ResourceKind> {
        self.provider.resource_type(uri)
    }

    pub fn mime_type(&self, uri: &str) -> Result<String> {
        self.provider.mime_type(uri)
    }

    pub fn stats(&self) -> Result<InventoryStats> {
        let store = self.provider.store();
        Ok(InventoryStats {
            books: store.count()?,
            location: store.location().to_string(),
            authority: self.authority().to_string(),
            schema_version: store.schema_version()?,
        })
    }
}
