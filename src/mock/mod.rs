//! In-memory capability implementations for testing.
//!
//! Same contracts as the provider implementations (idempotent provisioning,
//! not-found normalization, delete-on-receive) without any network or
//! container. State lives for the lifetime of the adapter.

mod adapter;
mod blob;
mod pubsub;
mod queue;
mod table;

pub use adapter::MockCloudAdapter;
pub use blob::MockBlobStorage;
pub use pubsub::MockPubSub;
pub use queue::MockQueue;
pub use table::MockNoSqlTable;

use crate::capability::{CapabilityError, ErrorKind};

/// Provider-style failure for a resource that does not exist.
fn not_found(operation: &'static str, resource: &str) -> CapabilityError {
    CapabilityError::Provider {
        operation,
        resource: resource.to_string(),
        kind: ErrorKind::NotFound,
        code: Some("ResourceNotFound".to_string()),
        message: format!("{resource} does not exist"),
        source: None,
    }
}

/// Provider-style rejection of a malformed request.
fn rejected(operation: &'static str, resource: &str, message: String) -> CapabilityError {
    CapabilityError::Provider {
        operation,
        resource: resource.to_string(),
        kind: ErrorKind::Argument,
        code: Some("ValidationException".to_string()),
        message,
        source: None,
    }
}
