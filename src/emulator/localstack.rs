//! LocalStack launcher backed by testcontainers.
//!
//! One container runs S3, SQS, SNS and DynamoDB behind the edge port. The
//! image reference comes from `LOCALSTACK_IMAGE` when set.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};
use tracing::info;

use super::{ContainerGuard, EmulatorError, EmulatorHolder, EmulatorInstance, EmulatorLauncher};
use crate::config::DEFAULT_REGION;

/// Environment variable overriding the LocalStack image reference.
pub const IMAGE_ENV_VAR: &str = "LOCALSTACK_IMAGE";
pub const DEFAULT_IMAGE: &str = "localstack/localstack:2.3";
/// LocalStack edge port serving every service.
pub const EDGE_PORT: u16 = 4566;

const SERVICES: &str = "s3,sqs,sns,dynamodb";
const STARTUP_TIMEOUT: Duration = Duration::from_secs(180);

static SHARED: LazyLock<Arc<EmulatorHolder>> =
    LazyLock::new(|| Arc::new(EmulatorHolder::new(LocalStackLauncher::from_env())));

/// Process-wide LocalStack holder.
pub fn shared_localstack() -> Arc<EmulatorHolder> {
    SHARED.clone()
}

/// Starts LocalStack containers.
#[derive(Debug, Clone)]
pub struct LocalStackLauncher {
    image: String,
    tag: String,
    region: String,
}

impl LocalStackLauncher {
    /// Launcher for `image_ref` (`name[:tag]`, tag defaults to `latest`).
    pub fn new(image_ref: &str) -> Self {
        let (image, tag) = split_image_ref(image_ref);
        Self {
            image,
            tag,
            region: DEFAULT_REGION.to_string(),
        }
    }

    /// Launcher for `LOCALSTACK_IMAGE`, falling back to [`DEFAULT_IMAGE`].
    pub fn from_env() -> Self {
        let image_ref = std::env::var(IMAGE_ENV_VAR)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_IMAGE.to_string());
        Self::new(&image_ref)
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

#[async_trait]
impl EmulatorLauncher for LocalStackLauncher {
    async fn launch(&self) -> Result<EmulatorInstance, EmulatorError> {
        info!(image = %self.image, tag = %self.tag, "Starting LocalStack container");

        let container = GenericImage::new(self.image.clone(), self.tag.clone())
            .with_exposed_port(EDGE_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stdout("Ready."))
            .with_env_var("SERVICES", SERVICES)
            .with_env_var("AWS_DEFAULT_REGION", self.region.clone())
            .with_env_var("EAGER_SERVICE_LOADING", "1")
            .with_env_var("DISABLE_EVENTS", "1")
            .with_env_var("SKIP_INFRA_DOWNLOADS", "1")
            .with_startup_timeout(STARTUP_TIMEOUT)
            .start()
            .await
            .map_err(|e| EmulatorError::Launch(e.to_string()))?;

        let host = container
            .get_host()
            .await
            .map_err(|e| EmulatorError::Launch(e.to_string()))?;
        let port = container
            .get_host_port_ipv4(EDGE_PORT)
            .await
            .map_err(|e| EmulatorError::Launch(e.to_string()))?;

        let endpoint = format!("http://{}:{}", host, port);
        info!(endpoint = %endpoint, "LocalStack available");

        Ok(EmulatorInstance::new(
            endpoint,
            self.region.clone(),
            Some(Box::new(container)),
        ))
    }
}

#[async_trait]
impl ContainerGuard for ContainerAsync<GenericImage> {
    async fn stop(self: Box<Self>) -> Result<(), EmulatorError> {
        (*self)
            .rm()
            .await
            .map_err(|e| EmulatorError::Stop(e.to_string()))
    }
}

/// Split `name[:tag]`. A colon inside a registry host (`host:5000/name`) is
/// not a tag separator.
fn split_image_ref(image_ref: &str) -> (String, String) {
    match image_ref.rsplit_once(':') {
        Some((name, tag)) if !tag.contains('/') => (name.to_string(), tag.to_string()),
        _ => (image_ref.to_string(), "latest".to_string()),
    }
}
