//! Bootstrap utilities for test binaries.
//!
//! Shared initialization code for the contract and integration suites.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LOG_ENV_VAR;

/// Initialize tracing with the CLOUD_TESTKIT_LOG environment variable.
///
/// Defaults to "info" level if CLOUD_TESTKIT_LOG is not set. Safe to call
/// from every test: only the first call installs a subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
