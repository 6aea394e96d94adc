//! Resource routing
//!
//! `BookProvider` turns a parsed `ResourceUri` into store calls and
//! publishes a `Change` for every mutation that touched at least one row.
//! Notification runs after the store call has returned, so the write lock
//! is never held while subscribers execute.

use std::sync::Arc;

use crate::book::FieldSet;
use crate::notify::{Change, ChangeKind, ChangeNotifier};
use crate::storage::{BookStore, Cursor, Filter, Projection, SortOrder};
use crate::uri::{ResourceKind, ResourceTarget, ResourceUri};
use crate::{Error, Result};

pub struct BookProvider {
    authority: String,
    store: Arc<BookStore>,
    notifier: Arc<ChangeNotifier>,
}

impl BookProvider {
    pub fn new(authority: impl Into<String>, store: Arc<BookStore>, notifier: Arc<ChangeNotifier>) -> Self {
        Self {
            authority: authority.into(),
            store,
            notifier,
        }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn store(&self) -> &BookStore {
        &self.store
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Parse a URI string against this provider's authority
    pub fn resolve(&self, uri: &str) -> Result<ResourceUri> {
        ResourceUri::parse(uri, &self.authority)
    }

    /// Kind of resource a URI names. Touches no storage.
    pub fn resource_type(&self, uri: &str) -> Result<ResourceKind> {
        Ok(self.resolve(uri)?.kind())
    }

    /// Content type of the resource a URI names
    pub fn mime_type(&self, uri: &str) -> Result<String> {
        Ok(self.resource_type(uri)?.mime_type(&self.authority))
    }

    fn check(&self, uri: &ResourceUri) -> Result<()> {
        if uri.authority != self.authority {
            return Err(Error::UnrecognizedResource(format!(
                "{} (unknown authority '{}')",
                uri, uri.authority
            )));
        }
        Ok(())
    }

    /// Item URIs narrow the caller filter to that id. The caller filter is
    /// validated on its own first, since a clause like `1) OR (1` only
    /// balances once wrapped.
    fn scope(uri: &ResourceUri, filter: Option<Filter>) -> Result<Option<Filter>> {
        if let Some(filter) = &filter {
            filter.validate()?;
        }
        Ok(match uri.target {
            ResourceTarget::Collection => filter,
            ResourceTarget::Item(id) => Some(Filter::by_id(id).and_then(filter)),
        })
    }

    /// Query the collection, or a single book.
    ///
    /// An item query that matches nothing fails with `NotFound`.
    pub fn query(
        &self,
        uri: &ResourceUri,
        projection: &Projection,
        filter: Option<Filter>,
        sort_order: Option<&SortOrder>,
    ) -> Result<Cursor> {
        self.check(uri)?;
        let filter = Self::scope(uri, filter)?;
        let cursor = self.store.query_all(projection, filter.as_ref(), sort_order)?;
        if uri.id().is_some() && cursor.len() == 0 {
            return Err(Error::NotFound(uri.to_string()));
        }
        Ok(cursor)
    }

    /// Insert into the collection and return the new book's URI
    pub fn insert(&self, uri: &ResourceUri, fields: &FieldSet) -> Result<ResourceUri> {
        self.check(uri)?;
        if uri.id().is_some() {
            return Err(Error::UnsupportedOperation {
                operation: "insert",
                uri: uri.to_string(),
            });
        }

        let id = self.store.insert(fields)?;
        let new_uri = uri.with_appended_id(id);
        self.publish(new_uri.clone(), ChangeKind::Inserted, 1);
        Ok(new_uri)
    }

    /// Update the addressed books. Zero rows matched is not an error.
    pub fn update(&self, uri: &ResourceUri, fields: &FieldSet, filter: Option<Filter>) -> Result<usize> {
        self.check(uri)?;
        let filter = Self::scope(uri, filter)?;
        let rows = self.store.update_where(fields, filter.as_ref())?;
        self.publish(uri.clone(), ChangeKind::Updated, rows);
        Ok(rows)
    }

    /// Delete the addressed books. Zero rows matched is not an error.
    pub fn delete(&self, uri: &ResourceUri, filter: Option<Filter>) -> Result<usize> {
        self.check(uri)?;
        let filter = Self::scope(uri, filter)?;
        let rows = self.store.delete_where(filter.as_ref())?;
        self.publish(uri.clone(), ChangeKind::Deleted, rows);
        Ok(rows)
    }

    fn publish(&self, uri: ResourceUri, kind: ChangeKind, rows: usize) {
        if rows == 0 {
            return;
        }
        let change = Change { uri, kind, rows };
        let delivered = self.notifier.notify(&change);
        tracing::debug!("{:?} {} ({} rows, {} deliveries)", kind, change.uri, rows, delivered);
    }
}
