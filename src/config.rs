use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::DEFAULT_READ_CONNECTIONS;
use crate::uri::DEFAULT_AUTHORITY;

/// Contents of `stockroom.toml`. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct InventoryConfig {
    pub database: Option<String>,
    pub authority: Option<String>,
    pub read_connections: Option<usize>,
}

impl InventoryConfig {
    /// Config pointing at `database`, everything else defaulted
    pub fn with_database(database: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
            ..Self::default()
        }
    }

    /// Database path, relative paths resolved against `base`
    pub fn database_path_in(&self, base: &Path) -> PathBuf {
        match &self.database {
            Some(db) => base.join(db),
            None => default_database_path_in(base),
        }
    }

    pub fn authority(&self) -> &str {
        self.authority.as_deref().unwrap_or(DEFAULT_AUTHORITY)
    }

    pub fn read_connections(&self) -> usize {
        self.read_connections.unwrap_or(DEFAULT_READ_CONNECTIONS)
    }

    /// Overlay values from `other` that are set
    pub fn merge(mut self, other: InventoryConfig) -> Self {
        if other.database.is_some() {
            self.database = other.database;
        }
        if other.authority.is_some() {
            self.authority = other.authority;
        }
        if other.read_connections.is_some() {
            self.read_connections = other.read_connections;
        }
        self
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("stockroom.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".stockroom").join("books.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<InventoryConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: InventoryConfig = toml::from_str(&contents)?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &InventoryConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
