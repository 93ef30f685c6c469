//! Provider-neutral capability contracts.
//!
//! Four families: [`BlobStorage`], [`Queue`], [`PubSub`] and [`NoSqlTable`].
//! Each provider supplies one implementation per family, handed out by a
//! [`CloudAdapter`](crate::adapter::CloudAdapter) as `Arc<dyn Trait>`.
//!
//! Shared rules for every implementation:
//! - Blank identifiers fail with [`CapabilityError::InvalidArgument`] before
//!   any provider call.
//! - Provider "not found" is never raised: reads return `None` or an empty
//!   list, deletes are no-ops, `ensure_*` creates.
//! - Any other provider failure propagates with operation, resource and
//!   provider code attached.

use std::time::Duration;

use async_trait::async_trait;

mod error;
mod item;

pub use error::{CapabilityError, ErrorKind, Result};
pub use item::{item, AttrValue, Item};

/// Default wait for [`Queue::receive`] and [`PubSub::receive`]: a single
/// non-blocking poll.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::ZERO;

/// Object storage: buckets of byte blobs addressed by key.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Create the bucket if it does not exist.
    async fn ensure_bucket(&self, bucket: &str) -> Result<()>;

    /// Delete every object, then the bucket. No-op if the bucket is absent.
    async fn delete_bucket(&self, bucket: &str) -> Result<()>;

    /// Store `data` under `key`, overwriting any previous object.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<()>;

    /// Object bytes, or `None` if the bucket or key does not exist.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// All keys under `prefix` (all keys when `None` or empty).
    async fn list_keys(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<String>>;

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool>;

    /// Store a JSON document with `application/json` content type.
    async fn put_json(&self, bucket: &str, key: &str, json: &str) -> Result<()> {
        self.put_object(bucket, key, json.as_bytes().to_vec(), "application/json")
            .await
    }

    /// Object decoded as UTF-8 (lossy), or `None` if absent.
    async fn get_string(&self, bucket: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .get_object(bucket, key)
            .await?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }
}

/// Point-to-point queue with delete-on-receive consumption.
#[async_trait]
pub trait Queue: Send + Sync {
    async fn ensure_queue(&self, queue: &str) -> Result<()>;

    /// No-op if the queue is absent.
    async fn delete_queue(&self, queue: &str) -> Result<()>;

    async fn send(&self, queue: &str, body: &str) -> Result<()>;

    /// One non-blocking poll.
    async fn receive(&self, queue: &str) -> Result<Option<String>> {
        self.receive_timeout(queue, DEFAULT_RECEIVE_TIMEOUT).await
    }

    /// Wait up to `timeout` for one message. The message is deleted before
    /// its body is returned.
    async fn receive_timeout(&self, queue: &str, timeout: Duration) -> Result<Option<String>>;
}

/// Topics fanning out to queue subscriptions.
#[async_trait]
pub trait PubSub: Send + Sync {
    async fn ensure_topic(&self, topic: &str) -> Result<()>;

    /// No-op if the topic is absent.
    async fn delete_topic(&self, topic: &str) -> Result<()>;

    /// Deliver messages published to `topic` into `queue`, creating either
    /// when missing. Safe to repeat.
    async fn ensure_subscription(&self, topic: &str, queue: &str) -> Result<()>;

    async fn publish(&self, topic: &str, body: &str) -> Result<()>;

    /// Receive from a subscribed queue; same semantics as [`Queue::receive`].
    async fn receive(&self, queue: &str) -> Result<Option<String>> {
        self.receive_timeout(queue, DEFAULT_RECEIVE_TIMEOUT).await
    }

    async fn receive_timeout(&self, queue: &str, timeout: Duration) -> Result<Option<String>>;
}

/// Key-value/document tables with a partition key and optional sort key.
#[async_trait]
pub trait NoSqlTable: Send + Sync {
    /// Create the table if absent and wait until it is usable.
    ///
    /// For an existing table the live key schema wins over the arguments.
    async fn ensure_table(
        &self,
        table: &str,
        partition_key: &str,
        sort_key: Option<&str>,
    ) -> Result<()>;

    async fn delete_table(&self, table: &str) -> Result<()>;

    /// Write `item`, replacing any item with the same primary key.
    async fn put_item(&self, table: &str, item: &Item) -> Result<()>;

    async fn get_item(
        &self,
        table: &str,
        partition_value: &str,
        sort_value: Option<&str>,
    ) -> Result<Option<Item>>;

    async fn delete_item(
        &self,
        table: &str,
        partition_value: &str,
        sort_value: Option<&str>,
    ) -> Result<()>;

    /// Every item in the table, in no particular order.
    async fn scan(&self, table: &str) -> Result<Vec<Item>>;

    /// Every item whose partition key equals `partition_value`.
    async fn query(&self, table: &str, partition_value: &str) -> Result<Vec<Item>>;
}
