//! AWS client factory.
//!
//! Emulator mode binds every client to the shared LocalStack instance (or the
//! `emulator.endpoint` override) with fixed test credentials. Live mode uses
//! the default credential chain and the configured region.

use std::sync::Arc;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::capability::Result;
use crate::config::{
    CloudConfig, CloudMode, OVERRIDE_EMULATOR_ENDPOINT, OVERRIDE_EMULATOR_REGION,
};
use crate::emulator::{EmulatorHolder, EmulatorInstance, EMULATOR_ACCESS_KEY, EMULATOR_SECRET_KEY};

const CREDENTIALS_PROVIDER: &str = "cloud-testkit";

#[derive(Debug, Clone, Copy)]
enum Service {
    S3,
    Sqs,
    Sns,
    DynamoDb,
}

/// Builds SDK clients for one configuration.
pub struct AwsClients {
    config: CloudConfig,
    emulator: Arc<EmulatorHolder>,
    sdk: OnceCell<SdkConfig>,
}

impl AwsClients {
    pub fn new(config: CloudConfig, emulator: Arc<EmulatorHolder>) -> Self {
        Self {
            config,
            emulator,
            sdk: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    fn is_emulator(&self) -> bool {
        self.config.mode() == CloudMode::Emulator
    }

    pub async fn s3(&self) -> Result<aws_sdk_s3::Client> {
        let sdk = self.sdk_config(Service::S3).await?;
        let s3_config = aws_sdk_s3::config::Builder::from(sdk)
            .force_path_style(self.is_emulator())
            .build();
        Ok(aws_sdk_s3::Client::from_conf(s3_config))
    }

    pub async fn sqs(&self) -> Result<aws_sdk_sqs::Client> {
        Ok(aws_sdk_sqs::Client::new(self.sdk_config(Service::Sqs).await?))
    }

    pub async fn sns(&self) -> Result<aws_sdk_sns::Client> {
        Ok(aws_sdk_sns::Client::new(self.sdk_config(Service::Sns).await?))
    }

    pub async fn dynamodb(&self) -> Result<aws_sdk_dynamodb::Client> {
        Ok(aws_sdk_dynamodb::Client::new(
            self.sdk_config(Service::DynamoDb).await?,
        ))
    }

    /// Region the clients are bound to.
    pub async fn region(&self) -> Result<String> {
        let sdk = self.sdk_config(Service::S3).await?;
        Ok(sdk
            .region()
            .map(|r| r.as_ref().to_string())
            .unwrap_or_else(|| self.config.region_or_default().to_string()))
    }

    async fn sdk_config(&self, service: Service) -> Result<&SdkConfig> {
        self.sdk.get_or_try_init(|| self.load(service)).await
    }

    async fn load(&self, service: Service) -> Result<SdkConfig> {
        match self.config.mode() {
            CloudMode::Live => {
                let region = self.config.region_or_default().to_string();
                debug!(region = %region, "Loading live AWS configuration");
                Ok(aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(region))
                    .load()
                    .await)
            }
            CloudMode::Emulator => {
                let (endpoint, region, access_key, secret_key) =
                    match self.config.override_value(OVERRIDE_EMULATOR_ENDPOINT) {
                        Some(endpoint) => (
                            endpoint.to_string(),
                            self.emulator_region(None),
                            EMULATOR_ACCESS_KEY.to_string(),
                            EMULATOR_SECRET_KEY.to_string(),
                        ),
                        None => {
                            let instance = self.start_emulator(service).await?;
                            (
                                instance.endpoint().to_string(),
                                self.emulator_region(Some(&instance)),
                                instance.access_key().to_string(),
                                instance.secret_key().to_string(),
                            )
                        }
                    };

                debug!(endpoint = %endpoint, region = %region, ?service, "Binding clients to emulator");
                let credentials =
                    Credentials::new(access_key, secret_key, None, None, CREDENTIALS_PROVIDER);

                Ok(aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(region))
                    .endpoint_url(endpoint)
                    .credentials_provider(credentials)
                    .load()
                    .await)
            }
        }
    }

    async fn start_emulator(&self, service: Service) -> Result<Arc<EmulatorInstance>> {
        let instance = match service {
            Service::S3 => self.emulator.ensure_started_s3().await?,
            Service::Sqs => self.emulator.ensure_started_sqs().await?,
            Service::Sns => self.emulator.ensure_started_sns().await?,
            Service::DynamoDb => self.emulator.ensure_started_dynamodb().await?,
        };
        Ok(instance)
    }

    /// `emulator.region` override, else configured region, else the instance's.
    fn emulator_region(&self, instance: Option<&EmulatorInstance>) -> String {
        if let Some(region) = self.config.override_value(OVERRIDE_EMULATOR_REGION) {
            return region.to_string();
        }
        match (self.config.region(), instance) {
            (Some(r), _) if !r.trim().is_empty() => r.to_string(),
            (_, Some(instance)) => instance.region().to_string(),
            _ => self.config.region_or_default().to_string(),
        }
    }
}
