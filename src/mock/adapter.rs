//! In-memory adapter.

use std::sync::{Arc, RwLock};

use super::{MockBlobStorage, MockNoSqlTable, MockPubSub, MockQueue};
use crate::adapter::{check_provider, CloudAdapter};
use crate::capability::{BlobStorage, CapabilityError, NoSqlTable, PubSub, Queue, Result};
use crate::config::{CloudConfig, CloudProvider};

/// Adapter backed entirely by memory, posing as `provider`.
///
/// Capability state survives re-initialization; create a new adapter for a
/// clean slate.
pub struct MockCloudAdapter {
    provider: CloudProvider,
    config: RwLock<Option<CloudConfig>>,
    blobs: Arc<MockBlobStorage>,
    queue: Arc<MockQueue>,
    pubsub: Arc<MockPubSub>,
    tables: Arc<MockNoSqlTable>,
}

impl MockCloudAdapter {
    pub fn new(provider: CloudProvider) -> Self {
        let queue = Arc::new(MockQueue::new());
        Self {
            provider,
            config: RwLock::new(None),
            blobs: Arc::new(MockBlobStorage::new()),
            pubsub: Arc::new(MockPubSub::new(queue.clone())),
            queue,
            tables: Arc::new(MockNoSqlTable::new()),
        }
    }

    /// The configuration most recently passed to `initialize`.
    pub fn config(&self) -> Option<CloudConfig> {
        self.config
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn require_initialized(&self) -> Result<()> {
        if self.config.read().unwrap_or_else(|e| e.into_inner()).is_none() {
            return Err(CapabilityError::NotInitialized);
        }
        Ok(())
    }
}

impl CloudAdapter for MockCloudAdapter {
    fn provider(&self) -> CloudProvider {
        self.provider
    }

    fn initialize(&self, config: CloudConfig) -> Result<()> {
        check_provider(self.provider, &config)?;
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = Some(config);
        Ok(())
    }

    fn blob_storage(&self) -> Result<Option<Arc<dyn BlobStorage>>> {
        self.require_initialized()?;
        let capability: Arc<dyn BlobStorage> = self.blobs.clone();
        Ok(Some(capability))
    }

    fn queue(&self) -> Result<Option<Arc<dyn Queue>>> {
        self.require_initialized()?;
        let capability: Arc<dyn Queue> = self.queue.clone();
        Ok(Some(capability))
    }

    fn pub_sub(&self) -> Result<Option<Arc<dyn PubSub>>> {
        self.require_initialized()?;
        let capability: Arc<dyn PubSub> = self.pubsub.clone();
        Ok(Some(capability))
    }

    fn no_sql_table(&self) -> Result<Option<Arc<dyn NoSqlTable>>> {
        self.require_initialized()?;
        let capability: Arc<dyn NoSqlTable> = self.tables.clone();
        Ok(Some(capability))
    }
}
