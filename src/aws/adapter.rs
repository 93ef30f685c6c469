//! AWS adapter.

use std::sync::{Arc, RwLock};

use crate::adapter::{check_provider, CloudAdapter};
use crate::capability::{BlobStorage, CapabilityError, NoSqlTable, PubSub, Queue, Result};
use crate::config::{CloudConfig, CloudProvider};
use crate::emulator::localstack::shared_localstack;
use crate::emulator::EmulatorHolder;
use crate::registry::AdapterRegistration;

use super::{AwsClients, DynamoTable, KeySchemaCache, S3BlobStorage, SnsPubSub, SqsQueue};

/// Supplies S3, SQS, SNS and DynamoDB capabilities.
pub struct AwsCloudAdapter {
    emulator: Arc<EmulatorHolder>,
    schemas: Arc<KeySchemaCache>,
    clients: RwLock<Option<Arc<AwsClients>>>,
}

impl AwsCloudAdapter {
    /// Adapter using the process-wide LocalStack holder and schema cache.
    pub fn new() -> Self {
        Self::with_shared_state(shared_localstack(), KeySchemaCache::global())
    }

    pub fn with_shared_state(emulator: Arc<EmulatorHolder>, schemas: Arc<KeySchemaCache>) -> Self {
        Self {
            emulator,
            schemas,
            clients: RwLock::new(None),
        }
    }

    fn clients(&self) -> Result<Arc<AwsClients>> {
        let guard = self.clients.read().unwrap_or_else(|e| e.into_inner());
        guard.clone().ok_or(CapabilityError::NotInitialized)
    }
}

impl Default for AwsCloudAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl CloudAdapter for AwsCloudAdapter {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Aws
    }

    fn initialize(&self, config: CloudConfig) -> Result<()> {
        check_provider(CloudProvider::Aws, &config)?;
        tracing::debug!(mode = %config.mode(), region = %config.region_or_default(), "Initializing AWS adapter");

        let clients = Arc::new(AwsClients::new(config, self.emulator.clone()));
        *self.clients.write().unwrap_or_else(|e| e.into_inner()) = Some(clients);
        Ok(())
    }

    fn blob_storage(&self) -> Result<Option<Arc<dyn BlobStorage>>> {
        let blobs: Arc<dyn BlobStorage> = Arc::new(S3BlobStorage::new(self.clients()?));
        Ok(Some(blobs))
    }

    fn queue(&self) -> Result<Option<Arc<dyn Queue>>> {
        let queue: Arc<dyn Queue> = Arc::new(SqsQueue::new(self.clients()?));
        Ok(Some(queue))
    }

    fn pub_sub(&self) -> Result<Option<Arc<dyn PubSub>>> {
        let pubsub: Arc<dyn PubSub> = Arc::new(SnsPubSub::new(self.clients()?));
        Ok(Some(pubsub))
    }

    fn no_sql_table(&self) -> Result<Option<Arc<dyn NoSqlTable>>> {
        let tables: Arc<dyn NoSqlTable> =
            Arc::new(DynamoTable::new(self.clients()?, self.schemas.clone()));
        Ok(Some(tables))
    }
}

fn create_aws_adapter() -> Arc<dyn CloudAdapter> {
    Arc::new(AwsCloudAdapter::new())
}

inventory::submit! {
    AdapterRegistration {
        provider: CloudProvider::Aws,
        factory: create_aws_adapter,
    }
}
