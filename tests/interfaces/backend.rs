//! Backend factory for contract tests.
//!
//! Provides capability handles for the backend selected by `CLOUD_BACKEND`.

use std::env;
use std::sync::Arc;

use cloud_testkit::adapter::CloudAdapter;
use cloud_testkit::capability::{BlobStorage, NoSqlTable, PubSub, Queue};
use cloud_testkit::config::{CloudConfig, CloudProvider};
use cloud_testkit::mock::MockCloudAdapter;

/// Capability backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudBackend {
    Mock,
    LocalStack,
}

impl CloudBackend {
    pub fn from_env() -> Self {
        match env::var("CLOUD_BACKEND")
            .unwrap_or_else(|_| "mock".to_string())
            .to_lowercase()
            .as_str()
        {
            "localstack" | "aws" => CloudBackend::LocalStack,
            _ => CloudBackend::Mock,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CloudBackend::Mock => "mock",
            CloudBackend::LocalStack => "localstack",
        }
    }
}

/// Holds the adapter for a backend, plus a per-scenario name suffix so
/// scenarios sharing one emulator never see each other's resources.
pub struct CloudContext {
    adapter: Arc<dyn CloudAdapter>,
    suffix: String,
}

impl std::fmt::Debug for CloudContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudContext")
            .field("provider", &self.adapter.provider())
            .field("suffix", &self.suffix)
            .finish()
    }
}

impl CloudContext {
    pub fn new(backend: CloudBackend) -> Self {
        let adapter = match backend {
            CloudBackend::Mock => Self::create_mock(),
            CloudBackend::LocalStack => Self::create_localstack(),
        };
        let suffix = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        Self { adapter, suffix }
    }

    fn create_mock() -> Arc<dyn CloudAdapter> {
        let adapter = Arc::new(MockCloudAdapter::new(CloudProvider::Aws));
        adapter
            .initialize(CloudConfig::default())
            .expect("Failed to initialize mock adapter");
        adapter
    }

    #[cfg(feature = "aws")]
    fn create_localstack() -> Arc<dyn CloudAdapter> {
        let config = CloudConfig::builder()
            .provider(CloudProvider::Aws)
            .mode(cloud_testkit::config::CloudMode::Emulator)
            .build();
        cloud_testkit::registry::AdapterRegistry::global()
            .get(CloudProvider::Aws, config)
            .expect("Failed to initialize AWS adapter")
    }

    #[cfg(not(feature = "aws"))]
    fn create_localstack() -> Arc<dyn CloudAdapter> {
        panic!("CLOUD_BACKEND=localstack requires the aws feature")
    }

    /// Scenario-unique resource name for `logical`. Blank names stay blank.
    pub fn name(&self, logical: &str) -> String {
        if logical.trim().is_empty() {
            return logical.to_string();
        }
        format!("{}-{}", logical, self.suffix)
    }

    pub fn blob_storage(&self) -> Arc<dyn BlobStorage> {
        self.adapter
            .blob_storage()
            .expect("Adapter not initialized")
            .expect("Backend has no blob storage")
    }

    pub fn queue(&self) -> Arc<dyn Queue> {
        self.adapter
            .queue()
            .expect("Adapter not initialized")
            .expect("Backend has no queue")
    }

    pub fn pub_sub(&self) -> Arc<dyn PubSub> {
        self.adapter
            .pub_sub()
            .expect("Adapter not initialized")
            .expect("Backend has no pub/sub")
    }

    pub fn no_sql_table(&self) -> Arc<dyn NoSqlTable> {
        self.adapter
            .no_sql_table()
            .expect("Adapter not initialized")
            .expect("Backend has no NoSQL table")
    }
}
