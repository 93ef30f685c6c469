//! In-memory NoSQL tables.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{not_found, rejected};
use crate::capability::{AttrValue, CapabilityError, Item, NoSqlTable, Result};
use crate::validation::{validate_key, validate_name, validate_optional_key};

type PrimaryKey = (String, Option<String>);

struct MockTable {
    partition_key: String,
    sort_key: Option<String>,
    items: HashMap<PrimaryKey, Item>,
}

impl MockTable {
    fn primary_key_of(&self, table: &str, item: &Item) -> Result<PrimaryKey> {
        let pk = key_attribute(table, item, &self.partition_key, "partition")?;
        let sk = match &self.sort_key {
            Some(name) => Some(key_attribute(table, item, name, "sort")?),
            None => None,
        };
        Ok((pk, sk))
    }

    fn lookup_key(&self, table: &str, pk: &str, sk: Option<&str>) -> Result<PrimaryKey> {
        match (&self.sort_key, sk) {
            (Some(_), Some(sk)) => Ok((pk.to_string(), Some(sk.to_string()))),
            (None, None) => Ok((pk.to_string(), None)),
            (Some(name), None) => Err(CapabilityError::InvalidArgument(format!(
                "table '{table}' requires sort key '{name}'"
            ))),
            (None, Some(_)) => Err(CapabilityError::InvalidArgument(format!(
                "table '{table}' has no sort key"
            ))),
        }
    }
}

/// Key attributes are string-typed, as the provider creates them.
fn key_attribute(table: &str, item: &Item, name: &str, role: &str) -> Result<String> {
    match item.get(name) {
        Some(AttrValue::String(value)) => Ok(value.clone()),
        Some(other) => Err(rejected(
            "put_item",
            table,
            format!("{role} key '{name}' must be a string, got {other:?}"),
        )),
        None => Err(rejected(
            "put_item",
            table,
            format!("missing {role} key '{name}'"),
        )),
    }
}

/// Tables keyed by string partition and optional sort key.
#[derive(Default)]
pub struct MockNoSqlTable {
    tables: RwLock<HashMap<String, MockTable>>,
}

impl MockNoSqlTable {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NoSqlTable for MockNoSqlTable {
    async fn ensure_table(
        &self,
        table: &str,
        partition_key: &str,
        sort_key: Option<&str>,
    ) -> Result<()> {
        validate_name("table", table)?;
        validate_key("partition key", partition_key)?;
        validate_optional_key("sort key", sort_key)?;

        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_insert_with(|| MockTable {
                partition_key: partition_key.to_string(),
                sort_key: sort_key.map(str::to_string),
                items: HashMap::new(),
            });
        Ok(())
    }

    async fn delete_table(&self, table: &str) -> Result<()> {
        validate_name("table", table)?;
        self.tables.write().await.remove(table);
        Ok(())
    }

    async fn put_item(&self, table: &str, item: &Item) -> Result<()> {
        validate_name("table", table)?;
        let mut tables = self.tables.write().await;
        let data = tables
            .get_mut(table)
            .ok_or_else(|| not_found("put_item", table))?;
        let key = data.primary_key_of(table, item)?;
        data.items.insert(key, item.clone());
        Ok(())
    }

    async fn get_item(
        &self,
        table: &str,
        partition_value: &str,
        sort_value: Option<&str>,
    ) -> Result<Option<Item>> {
        validate_name("table", table)?;
        validate_key("partition value", partition_value)?;
        validate_optional_key("sort value", sort_value)?;

        let tables = self.tables.read().await;
        let Some(data) = tables.get(table) else {
            return Ok(None);
        };
        let key = data.lookup_key(table, partition_value, sort_value)?;
        Ok(data.items.get(&key).cloned())
    }

    async fn delete_item(
        &self,
        table: &str,
        partition_value: &str,
        sort_value: Option<&str>,
    ) -> Result<()> {
        validate_name("table", table)?;
        validate_key("partition value", partition_value)?;
        validate_optional_key("sort value", sort_value)?;

        let mut tables = self.tables.write().await;
        if let Some(data) = tables.get_mut(table) {
            let key = data.lookup_key(table, partition_value, sort_value)?;
            data.items.remove(&key);
        }
        Ok(())
    }

    async fn scan(&self, table: &str) -> Result<Vec<Item>> {
        validate_name("table", table)?;
        Ok(self
            .tables
            .read()
            .await
            .get(table)
            .map(|data| data.items.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn query(&self, table: &str, partition_value: &str) -> Result<Vec<Item>> {
        validate_name("table", table)?;
        validate_key("partition value", partition_value)?;

        let tables = self.tables.read().await;
        let data = tables
            .get(table)
            .ok_or_else(|| CapabilityError::UnknownTable(table.to_string()))?;
        Ok(data
            .items
            .iter()
            .filter(|((pk, _), _)| pk == partition_value)
            .map(|(_, item)| item.clone())
            .collect())
    }
}
