//! Process-wide table key-schema cache.
//!
//! Maps table name to its key attribute names. Populated from the live table
//! description, read by every keyed operation and invalidated on delete.
//! Concurrent writers race last-writer-wins; a lost update only costs an
//! extra describe call.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use tokio::sync::RwLock;

/// Key attribute names of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableKeys {
    pub partition_key: String,
    pub sort_key: Option<String>,
}

impl TableKeys {
    pub fn new(partition_key: impl Into<String>, sort_key: Option<&str>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.map(str::to_string),
        }
    }
}

static GLOBAL: LazyLock<Arc<KeySchemaCache>> = LazyLock::new(|| Arc::new(KeySchemaCache::new()));

/// Concurrent table-name to [`TableKeys`] map.
#[derive(Debug, Default)]
pub struct KeySchemaCache {
    entries: RwLock<HashMap<String, TableKeys>>,
}

impl KeySchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache shared by every table capability in the process.
    pub fn global() -> Arc<Self> {
        GLOBAL.clone()
    }

    pub async fn get(&self, table: &str) -> Option<TableKeys> {
        self.entries.read().await.get(table).cloned()
    }

    pub async fn insert(&self, table: &str, keys: TableKeys) {
        self.entries.write().await.insert(table.to_string(), keys);
    }

    pub async fn invalidate(&self, table: &str) {
        self.entries.write().await.remove(table);
    }
}
