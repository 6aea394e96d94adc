//! Resource URI - addresses the books collection or a single book
//!
//! Format: `content://<authority>/books` or `content://<authority>/books/<id>`
//!
//! The `content://` scheme is optional on input and always present on output.
//!
//! Examples:
//! - `content://com.example.android.gwg_project7_inventoryapp/books`
//! - `com.example.android.gwg_project7_inventoryapp/books/42`

use crate::storage::schema::PATH_BOOKS;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// URI scheme prefix
pub const SCHEME: &str = "content://";

/// Authority used when no configuration overrides it
pub const DEFAULT_AUTHORITY: &str = "com.example.android.gwg_project7_inventoryapp";

/// What a resource URI points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceTarget {
    /// Every book
    Collection,
    /// One book by id
    Item(i64),
}

impl ResourceTarget {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceTarget::Collection => ResourceKind::Collection,
            ResourceTarget::Item(_) => ResourceKind::Item,
        }
    }

    pub fn id(&self) -> Option<i64> {
        match self {
            ResourceTarget::Collection => None,
            ResourceTarget::Item(id) => Some(*id),
        }
    }
}

/// Shape of a resource URI, without the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Collection,
    Item,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Collection => "collection",
            ResourceKind::Item => "item",
        }
    }

    /// Content type for URIs of this kind under `authority`.
    ///
    /// `vnd.android.cursor.dir/<authority>/books` for the collection,
    /// `vnd.android.cursor.item/<authority>/books` for a single book.
    pub fn mime_type(&self, authority: &str) -> String {
        let base = match self {
            ResourceKind::Collection => "vnd.android.cursor.dir",
            ResourceKind::Item => "vnd.android.cursor.item",
        };
        format!("{}/{}/{}", base, authority, PATH_BOOKS)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parsed resource URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceUri {
    /// Provider authority
    pub authority: String,
    /// Collection or item
    pub target: ResourceTarget,
}

impl ResourceUri {
    /// URI of the whole collection
    pub fn collection(authority: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            target: ResourceTarget::Collection,
        }
    }

    /// URI of a single book
    pub fn item(authority: impl Into<String>, id: i64) -> Self {
        Self {
            authority: authority.into(),
            target: ResourceTarget::Item(id),
        }
    }

    /// Parse a URI that must belong to `authority`.
    pub fn parse(uri: &str, authority: &str) -> Result<Self> {
        let parsed = Self::parse_any(uri)?;
        if parsed.authority != authority {
            return Err(Error::UnrecognizedResource(format!(
                "{} (unknown authority '{}')",
                uri, parsed.authority
            )));
        }
        Ok(parsed)
    }

    /// Parse a URI under any authority.
    ///
    /// Expected format: `[content://]<authority>/books[/<id>]`
    pub fn parse_any(uri: &str) -> Result<Self> {
        let unrecognized = |why: &str| Error::UnrecognizedResource(format!("{} ({})", uri, why));

        let rest = uri.strip_prefix(SCHEME).unwrap_or(uri);
        let segments: Vec<&str> = rest.split('/').collect();

        let (authority, path, id) = match segments.as_slice() {
            [authority, path] => (*authority, *path, None),
            [authority, path, id] => (*authority, *path, Some(*id)),
            _ => return Err(unrecognized("expected <authority>/books[/<id>]")),
        };

        if authority.is_empty() || authority.chars().any(char::is_whitespace) {
            return Err(unrecognized("missing or malformed authority"));
        }
        if path != PATH_BOOKS {
            return Err(unrecognized("unknown collection"));
        }

        let target = match id {
            None => ResourceTarget::Collection,
            Some(id) => {
                if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(unrecognized("id must be a non-negative integer"));
                }
                let id: i64 = id.parse().map_err(|_| unrecognized("id out of range"))?;
                ResourceTarget::Item(id)
            }
        };

        Ok(Self {
            authority: authority.to_string(),
            target,
        })
    }

    /// Item URI for `id` under the same authority
    pub fn with_appended_id(&self, id: i64) -> Self {
        Self::item(self.authority.clone(), id)
    }

    /// The collection this URI belongs to
    pub fn collection_uri(&self) -> Self {
        Self::collection(self.authority.clone())
    }

    pub fn kind(&self) -> ResourceKind {
        self.target.kind()
    }

    pub fn id(&self) -> Option<i64> {
        self.target.id()
    }

    /// Convert to URI string
    pub fn to_uri_string(&self) -> String {
        match self.target {
            ResourceTarget::Collection => format!("{}{}/{}", SCHEME, self.authority, PATH_BOOKS),
            ResourceTarget::Item(id) => format!("{}{}/{}/{}", SCHEME, self.authority, PATH_BOOKS, id),
        }
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uri_string())
    }
}

impl FromStr for ResourceUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_any(s)
    }
}

impl Serialize for ResourceUri {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_uri_string())
    }
}

impl<'de> Deserialize<'de> for ResourceUri {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ResourceUri::parse_any(&s).map_err(serde::de::Error::custom)
    }
}
