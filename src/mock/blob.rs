//! In-memory blob storage.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::not_found;
use crate::capability::{BlobStorage, Result};
use crate::validation::{validate_key, validate_name};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
}

/// Buckets of objects held in memory.
#[derive(Default)]
pub struct MockBlobStorage {
    buckets: RwLock<HashMap<String, BTreeMap<String, StoredObject>>>,
}

impl MockBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content type recorded for an object.
    pub async fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        self.buckets
            .read()
            .await
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|o| o.content_type.clone())
    }
}

#[async_trait]
impl BlobStorage for MockBlobStorage {
    async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        validate_name("bucket", bucket)?;
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default();
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        validate_name("bucket", bucket)?;
        self.buckets.write().await.remove(bucket);
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        validate_name("bucket", bucket)?;
        validate_key("key", key)?;

        let mut buckets = self.buckets.write().await;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| not_found("put_object", bucket))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        validate_name("bucket", bucket)?;
        validate_key("key", key)?;
        Ok(self
            .buckets
            .read()
            .await
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|o| o.data.clone()))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        validate_name("bucket", bucket)?;
        validate_key("key", key)?;
        if let Some(objects) = self.buckets.write().await.get_mut(bucket) {
            objects.remove(key);
        }
        Ok(())
    }

    async fn list_keys(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<String>> {
        validate_name("bucket", bucket)?;
        let prefix = prefix.unwrap_or("");
        Ok(self
            .buckets
            .read()
            .await
            .get(bucket)
            .map(|objects| {
                objects
                    .keys()
                    .filter(|k| k.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        validate_name("bucket", bucket)?;
        validate_key("key", key)?;
        Ok(self
            .buckets
            .read()
            .await
            .get(bucket)
            .is_some_and(|objects| objects.contains_key(key)))
    }
}
