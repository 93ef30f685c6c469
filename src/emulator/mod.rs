//! Process-wide emulator bootstrap.
//!
//! One emulator instance backs every emulated service. It is started lazily
//! on first use and never restarted or stopped by the holder; the owning
//! process is responsible for teardown.
//!
//! Concurrent first callers may each launch an instance. Exactly one wins the
//! publish into the holder; every loser stops its own instance and waits,
//! with a bounded number of polls, for the winner to become visible. A winner
//! that never appears is reported as [`EmulatorError::RaceUnresolved`], which
//! indicates a bug rather than a transient condition.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{OnceCell, SetError};
use tracing::{debug, info, warn};

#[cfg(feature = "aws")]
pub mod localstack;

/// Polls a losing caller makes while waiting for the winner.
pub const DEFAULT_RACE_ATTEMPTS: u32 = 50;
/// Delay between those polls.
pub const DEFAULT_RACE_INTERVAL: Duration = Duration::from_millis(10);

/// Fixed credentials accepted by local emulators.
pub const EMULATOR_ACCESS_KEY: &str = "test";
pub const EMULATOR_SECRET_KEY: &str = "test";

/// Errors from emulator lifecycle management.
#[derive(Debug, thiserror::Error)]
pub enum EmulatorError {
    #[error("Failed to start emulator: {0}")]
    Launch(String),

    #[error("Failed to stop emulator: {0}")]
    Stop(String),

    #[error("Emulator start race unresolved: winner not visible after {attempts} polls ({waited:?})")]
    RaceUnresolved { attempts: u32, waited: Duration },
}

/// Handle that can tear down whatever backs an [`EmulatorInstance`].
#[async_trait]
pub trait ContainerGuard: Send + Sync {
    async fn stop(self: Box<Self>) -> Result<(), EmulatorError>;
}

/// Starts a fresh emulator.
#[async_trait]
pub trait EmulatorLauncher: Send + Sync {
    async fn launch(&self) -> Result<EmulatorInstance, EmulatorError>;
}

/// A running emulator: where to reach it and which credentials to present.
pub struct EmulatorInstance {
    endpoint: String,
    region: String,
    access_key: String,
    secret_key: String,
    guard: Option<Box<dyn ContainerGuard>>,
}

impl EmulatorInstance {
    pub fn new(
        endpoint: impl Into<String>,
        region: impl Into<String>,
        guard: Option<Box<dyn ContainerGuard>>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            region: region.into(),
            access_key: EMULATOR_ACCESS_KEY.to_string(),
            secret_key: EMULATOR_SECRET_KEY.to_string(),
            guard,
        }
    }

    /// An emulator managed outside this process (no guard).
    pub fn external(endpoint: impl Into<String>, region: impl Into<String>) -> Self {
        Self::new(endpoint, region, None)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    /// Tear down the backing container, if this instance owns one.
    pub async fn stop(self) -> Result<(), EmulatorError> {
        match self.guard {
            Some(guard) => guard.stop().await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for EmulatorInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmulatorInstance")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("owned", &self.guard.is_some())
            .finish()
    }
}

/// Init-once holder for the shared emulator instance.
pub struct EmulatorHolder {
    launcher: Box<dyn EmulatorLauncher>,
    instance: OnceCell<Arc<EmulatorInstance>>,
    race_attempts: u32,
    race_interval: Duration,
}

impl EmulatorHolder {
    pub fn new(launcher: impl EmulatorLauncher + 'static) -> Self {
        Self {
            launcher: Box::new(launcher),
            instance: OnceCell::new(),
            race_attempts: DEFAULT_RACE_ATTEMPTS,
            race_interval: DEFAULT_RACE_INTERVAL,
        }
    }

    /// Override how long a losing caller waits for the winner.
    pub fn with_race_wait(mut self, attempts: u32, interval: Duration) -> Self {
        self.race_attempts = attempts;
        self.race_interval = interval;
        self
    }

    /// The running instance, if one has been published.
    pub fn current(&self) -> Option<Arc<EmulatorInstance>> {
        self.instance.get().cloned()
    }

    pub async fn ensure_started_s3(&self) -> Result<Arc<EmulatorInstance>, EmulatorError> {
        self.ensure_started().await
    }

    pub async fn ensure_started_sqs(&self) -> Result<Arc<EmulatorInstance>, EmulatorError> {
        self.ensure_started().await
    }

    pub async fn ensure_started_sns(&self) -> Result<Arc<EmulatorInstance>, EmulatorError> {
        self.ensure_started().await
    }

    pub async fn ensure_started_dynamodb(&self) -> Result<Arc<EmulatorInstance>, EmulatorError> {
        self.ensure_started().await
    }

    /// Start the shared instance if needed and return it.
    pub async fn ensure_started(&self) -> Result<Arc<EmulatorInstance>, EmulatorError> {
        if let Some(existing) = self.instance.get() {
            return Ok(existing.clone());
        }

        let launched = Arc::new(self.launcher.launch().await?);
        let endpoint = launched.endpoint().to_string();

        let mine = match self.instance.set(launched) {
            Ok(()) => {
                info!(endpoint = %endpoint, "Emulator started");
                return self.await_winner().await;
            }
            Err(SetError::AlreadyInitializedError(mine)) | Err(SetError::InitializingError(mine)) => {
                mine
            }
        };

        debug!(endpoint = %endpoint, "Lost emulator start race, stopping own instance");
        match Arc::try_unwrap(mine) {
            Ok(own) => {
                if let Err(e) = own.stop().await {
                    warn!(endpoint = %endpoint, error = %e, "Failed to stop losing emulator instance");
                }
            }
            Err(_) => warn!(endpoint = %endpoint, "Losing emulator instance still shared, not stopped"),
        }

        self.await_winner().await
    }

    async fn await_winner(&self) -> Result<Arc<EmulatorInstance>, EmulatorError> {
        for attempt in 0..=self.race_attempts {
            if let Some(winner) = self.instance.get() {
                return Ok(winner.clone());
            }
            if attempt < self.race_attempts {
                tokio::time::sleep(self.race_interval).await;
            }
        }
        Err(EmulatorError::RaceUnresolved {
            attempts: self.race_attempts,
            waited: self.race_interval * self.race_attempts,
        })
    }
}
