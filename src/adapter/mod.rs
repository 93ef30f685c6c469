//! Per-provider adapter contract.
//!
//! An adapter is initialized with a [`CloudConfig`] and hands out capability
//! handles bound to it. Accessors return `Ok(None)` for capabilities the
//! provider does not support and [`CapabilityError::NotInitialized`] before
//! [`CloudAdapter::initialize`] has been called.

use std::sync::Arc;

use crate::capability::{BlobStorage, CapabilityError, NoSqlTable, PubSub, Queue, Result};
use crate::config::{CloudConfig, CloudProvider};

/// Provider entry point used by the [`AdapterRegistry`](crate::registry::AdapterRegistry).
pub trait CloudAdapter: Send + Sync {
    fn provider(&self) -> CloudProvider;

    /// Bind the adapter to `config`, replacing any previous binding.
    fn initialize(&self, config: CloudConfig) -> Result<()>;

    fn blob_storage(&self) -> Result<Option<Arc<dyn BlobStorage>>>;

    fn queue(&self) -> Result<Option<Arc<dyn Queue>>>;

    fn pub_sub(&self) -> Result<Option<Arc<dyn PubSub>>>;

    fn no_sql_table(&self) -> Result<Option<Arc<dyn NoSqlTable>>>;
}

/// Reject a config meant for another provider.
pub fn check_provider(expected: CloudProvider, config: &CloudConfig) -> Result<()> {
    if config.provider() != expected {
        return Err(CapabilityError::InvalidArgument(format!(
            "{} adapter cannot be initialized with a {} configuration",
            expected,
            config.provider()
        )));
    }
    Ok(())
}
