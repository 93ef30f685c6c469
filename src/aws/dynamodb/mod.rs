//! DynamoDB table capability.
//!
//! Tables are created on demand with on-demand billing and string-typed key
//! attributes. Keyed operations look up the key attribute names in a shared
//! [`KeySchemaCache`], describing the table on a miss.

mod marshal;
mod schema_cache;

pub use marshal::{from_attribute, parse_number, to_attribute};
pub use schema_cache::{KeySchemaCache, TableKeys};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType,
    ScalarAttributeType, TableDescription, TableStatus,
};
use aws_sdk_dynamodb::Client;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::clients::AwsClients;
use super::error::provider_error;
use crate::capability::{CapabilityError, ErrorKind, Item, NoSqlTable, Result};
use crate::utils::retry::{TABLE_ACTIVE_TIMEOUT, TABLE_POLL_INTERVAL};
use crate::validation::{validate_key, validate_name, validate_optional_key};
use marshal::{from_item, to_item, WireItem};

/// DynamoDB implementation of [`NoSqlTable`].
pub struct DynamoTable {
    clients: Arc<AwsClients>,
    client: OnceCell<Client>,
    schemas: Arc<KeySchemaCache>,
}

impl DynamoTable {
    pub fn new(clients: Arc<AwsClients>, schemas: Arc<KeySchemaCache>) -> Self {
        Self {
            clients,
            client: OnceCell::new(),
            schemas,
        }
    }

    async fn client(&self) -> Result<&Client> {
        self.client.get_or_try_init(|| self.clients.dynamodb()).await
    }

    /// Table description, or `None` if the table does not exist.
    async fn describe(&self, table: &str) -> Result<Option<TableDescription>> {
        let client = self.client().await?;
        match client.describe_table().table_name(table).send().await {
            Ok(output) => Ok(output.table),
            Err(e) => {
                let err = provider_error("describe_table", table, e);
                if err.is_not_found() {
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Key names from the cache, describing the table on a miss.
    async fn resolve_keys(&self, table: &str) -> Result<Option<TableKeys>> {
        if let Some(keys) = self.schemas.get(table).await {
            return Ok(Some(keys));
        }

        let Some(keys) = self.describe(table).await?.as_ref().and_then(keys_of) else {
            return Ok(None);
        };
        self.schemas.insert(table, keys.clone()).await;
        Ok(Some(keys))
    }

    /// Poll until the table reports ACTIVE, bounded by [`TABLE_ACTIVE_TIMEOUT`].
    ///
    /// A table that is missing (never created, or finished deleting while we
    /// waited) is created with the given keys.
    async fn wait_until_active(
        &self,
        table: &str,
        partition_key: &str,
        sort_key: Option<&str>,
    ) -> Result<TableDescription> {
        let deadline = Instant::now() + TABLE_ACTIVE_TIMEOUT;

        loop {
            match self.describe(table).await {
                Ok(Some(desc)) if desc.table_status() == Some(&TableStatus::Active) => {
                    return Ok(desc);
                }
                Ok(Some(desc)) => {
                    debug!(table = %table, status = ?desc.table_status(), "Waiting for table");
                }
                Ok(None) => self.create_table(table, partition_key, sort_key).await?,
                Err(e) if e.is_retryable() => {
                    warn!(table = %table, error = %e, "Transient error waiting for table");
                }
                Err(e) => return Err(e),
            }

            if Instant::now() + TABLE_POLL_INTERVAL >= deadline {
                return Err(CapabilityError::NotActive {
                    table: table.to_string(),
                    waited: TABLE_ACTIVE_TIMEOUT,
                });
            }
            tokio::time::sleep(TABLE_POLL_INTERVAL).await;
        }
    }

    async fn create_table(
        &self,
        table: &str,
        partition_key: &str,
        sort_key: Option<&str>,
    ) -> Result<()> {
        let mut definitions = vec![string_attribute(partition_key)?];
        let mut schema = vec![key_element(partition_key, KeyType::Hash)?];
        if let Some(sk) = sort_key {
            definitions.push(string_attribute(sk)?);
            schema.push(key_element(sk, KeyType::Range)?);
        }

        let client = self.client().await?;
        match client
            .create_table()
            .table_name(table)
            .set_attribute_definitions(Some(definitions))
            .set_key_schema(Some(schema))
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
        {
            Ok(_) => {
                info!(table = %table, partition_key = %partition_key, sort_key = ?sort_key, "Created DynamoDB table");
                Ok(())
            }
            Err(e) => {
                let err = provider_error("create_table", table, e);
                if err.kind() == Some(ErrorKind::AlreadyExists) {
                    debug!(table = %table, "Table created concurrently");
                    Ok(())
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Primary key attributes for a keyed call.
    fn key_map(
        table: &str,
        keys: &TableKeys,
        partition_value: &str,
        sort_value: Option<&str>,
    ) -> Result<WireItem> {
        let mut key = HashMap::new();
        key.insert(
            keys.partition_key.clone(),
            AttributeValue::S(partition_value.to_string()),
        );

        match (&keys.sort_key, sort_value) {
            (Some(name), Some(value)) => {
                key.insert(name.clone(), AttributeValue::S(value.to_string()));
            }
            (None, None) => {}
            (Some(name), None) => {
                return Err(CapabilityError::InvalidArgument(format!(
                    "table '{table}' requires sort key '{name}'"
                )))
            }
            (None, Some(_)) => {
                return Err(CapabilityError::InvalidArgument(format!(
                    "table '{table}' has no sort key"
                )))
            }
        }
        Ok(key)
    }
}

fn keys_of(desc: &TableDescription) -> Option<TableKeys> {
    let mut partition = None;
    let mut sort = None;
    for element in desc.key_schema() {
        match element.key_type() {
            KeyType::Hash => partition = Some(element.attribute_name().to_string()),
            KeyType::Range => sort = Some(element.attribute_name().to_string()),
            _ => {}
        }
    }
    partition.map(|pk| TableKeys {
        partition_key: pk,
        sort_key: sort,
    })
}

fn string_attribute(name: &str) -> Result<AttributeDefinition> {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(ScalarAttributeType::S)
        .build()
        .map_err(|e| CapabilityError::InvalidArgument(e.to_string()))
}

fn key_element(name: &str, key_type: KeyType) -> Result<KeySchemaElement> {
    KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
        .map_err(|e| CapabilityError::InvalidArgument(e.to_string()))
}

#[async_trait]
impl NoSqlTable for DynamoTable {
    async fn ensure_table(
        &self,
        table: &str,
        partition_key: &str,
        sort_key: Option<&str>,
    ) -> Result<()> {
        validate_name("table", table)?;
        validate_key("partition key", partition_key)?;
        validate_optional_key("sort key", sort_key)?;

        let desc = match self.describe(table).await? {
            Some(desc) if desc.table_status() == Some(&TableStatus::Active) => desc,
            _ => self.wait_until_active(table, partition_key, sort_key).await?,
        };

        let keys = keys_of(&desc).unwrap_or_else(|| TableKeys::new(partition_key, sort_key));
        if keys.partition_key != partition_key {
            debug!(
                table = %table,
                requested = %partition_key,
                actual = %keys.partition_key,
                "Existing table has a different partition key"
            );
        }
        self.schemas.insert(table, keys).await;
        Ok(())
    }

    async fn delete_table(&self, table: &str) -> Result<()> {
        validate_name("table", table)?;
        self.schemas.invalidate(table).await;

        let client = self.client().await?;
        match client.delete_table().table_name(table).send().await {
            Ok(_) => {
                info!(table = %table, "Deleted DynamoDB table");
                Ok(())
            }
            Err(e) => {
                let err = provider_error("delete_table", table, e);
                if err.is_not_found() {
                    Ok(())
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn put_item(&self, table: &str, item: &Item) -> Result<()> {
        validate_name("table", table)?;
        let wire = to_item(item)?;

        let client = self.client().await?;
        client
            .put_item()
            .table_name(table)
            .set_item(Some(wire))
            .send()
            .await
            .map_err(|e| provider_error("put_item", table, e))?;

        debug!(table = %table, attributes = item.len(), "Stored item");
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

        let Some(keys) = self.resolve_keys(table).await? else {
            return Ok(None);
        };
        let key = Self::key_map(table, &keys, partition_value, sort_value)?;

        let client = self.client().await?;
        match client
            .get_item()
            .table_name(table)
            .set_key(Some(key))
            .consistent_read(true)
            .send()
            .await
        {
            Ok(output) => Ok(output.item.map(from_item)),
            Err(e) => {
                let err = provider_error("get_item", table, e);
                if err.is_not_found() {
                    self.schemas.invalidate(table).await;
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
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

        let Some(keys) = self.resolve_keys(table).await? else {
            return Ok(());
        };
        let key = Self::key_map(table, &keys, partition_value, sort_value)?;

        let client = self.client().await?;
        match client
            .delete_item()
            .table_name(table)
            .set_key(Some(key))
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                let err = provider_error("delete_item", table, e);
                if err.is_not_found() {
                    self.schemas.invalidate(table).await;
                    Ok(())
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn scan(&self, table: &str) -> Result<Vec<Item>> {
        validate_name("table", table)?;
        let client = self.client().await?;

        let mut items = Vec::new();
        let mut start_key: Option<WireItem> = None;
        let mut first_page = true;

        loop {
            let output = match client
                .scan()
                .table_name(table)
                .consistent_read(true)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
            {
                Ok(output) => output,
                Err(e) => {
                    let err = provider_error("scan", table, e);
                    if first_page && err.is_not_found() {
                        return Ok(Vec::new());
                    }
                    return Err(CapabilityError::IncompleteRead {
                        operation: "scan",
                        resource: table.to_string(),
                        source: Box::new(err),
                    });
                }
            };
            first_page = false;

            items.extend(output.items.unwrap_or_default().into_iter().map(from_item));

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        debug!(table = %table, count = items.len(), "Scanned table");
        Ok(items)
    }

    async fn query(&self, table: &str, partition_value: &str) -> Result<Vec<Item>> {
        validate_name("table", table)?;
        validate_key("partition value", partition_value)?;

        let keys = self
            .resolve_keys(table)
            .await?
            .ok_or_else(|| CapabilityError::UnknownTable(table.to_string()))?;
        let client = self.client().await?;

        let mut items = Vec::new();
        let mut start_key: Option<WireItem> = None;
        let mut first_page = true;

        loop {
            let output = match client
                .query()
                .table_name(table)
                .key_condition_expression("#pk = :v")
                .expression_attribute_names("#pk", &keys.partition_key)
                .expression_attribute_values(":v", AttributeValue::S(partition_value.to_string()))
                .consistent_read(true)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
            {
                Ok(output) => output,
                Err(e) => {
                    let err = provider_error("query", table, e);
                    if first_page && err.is_not_found() {
                        self.schemas.invalidate(table).await;
                        return Ok(Vec::new());
                    }
                    return Err(CapabilityError::IncompleteRead {
                        operation: "query",
                        resource: table.to_string(),
                        source: Box::new(err),
                    });
                }
            };
            first_page = false;

            items.extend(output.items.unwrap_or_default().into_iter().map(from_item));

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        debug!(table = %table, count = items.len(), "Queried table");
        Ok(items)
    }
}
