//! Retry utilities: backoff builders and provisioning deadlines.
//!
//! Uses `backon` for exponential backoff with jitter. Provisioning calls
//! (queue lookup and creation) retry transient failures until a fixed
//! deadline, then make one last attempt to resolve the resource.

use std::time::Duration;

use backon::ExponentialBuilder;
use tokio::time::Instant;

/// Total time budget for retrying a transient provisioning failure.
pub const PROVISIONING_DEADLINE: Duration = Duration::from_secs(15);

/// Poll interval while waiting for a table to become active.
pub const TABLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Maximum time to wait for a table to become active.
pub const TABLE_ACTIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Backoff for resource provisioning against an emulator or live account.
///
/// - Min delay: 100ms
/// - Max delay: 2s
/// - Max attempts: 64 (in practice bounded by [`PROVISIONING_DEADLINE`])
/// - Jitter enabled
pub fn provisioning_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_secs(2))
        .with_max_times(64)
        .with_jitter()
}

/// Stand-in deadline for timeouts too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Wall-clock deadline `timeout` from now.
///
/// Timeouts that overflow the clock, such as `Duration::MAX`, wait
/// effectively forever instead of panicking.
pub fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}
