//! cloud-testkit - provider-agnostic cloud capabilities for tests
//!
//! Exercises blob storage, point-to-point queues, publish/subscribe and
//! NoSQL tables against either a local emulator or a live cloud account
//! without changing test code.
//!
//! ```no_run
//! # async fn demo() -> Result<(), cloud_testkit::capability::CapabilityError> {
//! use cloud_testkit::config::{CloudConfig, CloudMode, CloudProvider};
//! use cloud_testkit::registry::AdapterRegistry;
//!
//! let config = CloudConfig::builder()
//!     .provider(CloudProvider::Aws)
//!     .mode(CloudMode::Emulator)
//!     .build();
//! let adapter = AdapterRegistry::global().get(CloudProvider::Aws, config)?;
//! let queue = adapter.queue()?.expect("aws supports queues");
//! queue.ensure_queue("orders").await?;
//! queue.send("orders", "A").await?;
//! assert_eq!(queue.receive("orders").await?.as_deref(), Some("A"));
//! # Ok(())
//! # }
//! ```

pub mod adapter;
#[cfg(feature = "aws")]
pub mod aws;
pub mod capability;
pub mod config;
pub mod emulator;
pub mod mock;
pub mod registry;
pub mod utils;
pub mod validation;
