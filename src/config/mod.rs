//! Harness configuration.
//!
//! A [`CloudConfig`] selects the provider, whether capabilities talk to a
//! local emulator or a live account, the region, and free-form named
//! overrides. It is immutable once built and can be loaded from YAML files
//! or environment variables.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "CLOUD_TESTKIT";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "CLOUD_TESTKIT_LOG";
/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Override: endpoint of an externally managed emulator (skips container start).
pub const OVERRIDE_EMULATOR_ENDPOINT: &str = "emulator.endpoint";
/// Override: region reported to emulator-bound clients.
pub const OVERRIDE_EMULATOR_REGION: &str = "emulator.region";

/// Errors raised while building or loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown cloud provider: {0}")]
    UnknownProvider(String),

    #[error("Unknown cloud mode: {0}")]
    UnknownMode(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Supported cloud providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    #[default]
    Aws,
    Azure,
    #[serde(alias = "google")]
    Gcp,
}

impl CloudProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "aws",
            CloudProvider::Azure => "azure",
            CloudProvider::Gcp => "gcp",
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CloudProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aws" => Ok(CloudProvider::Aws),
            "azure" => Ok(CloudProvider::Azure),
            // "google" kept as an alias for older scenario files
            "gcp" | "google" => Ok(CloudProvider::Gcp),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }
}

/// Whether capabilities target a local emulator or the real service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudMode {
    #[default]
    Emulator,
    Live,
}

impl fmt::Display for CloudMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudMode::Emulator => f.write_str("emulator"),
            CloudMode::Live => f.write_str("live"),
        }
    }
}

impl FromStr for CloudMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "emulator" => Ok(CloudMode::Emulator),
            "live" => Ok(CloudMode::Live),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

/// Immutable configuration consumed by provider adapters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    provider: CloudProvider,
    mode: CloudMode,
    /// AWS region, Azure location, or GCP region/zone.
    region: Option<String>,
    /// GCP project id, AWS account alias, or Azure subscription alias.
    project: Option<String>,
    overrides: BTreeMap<String, String>,
}

impl CloudConfig {
    pub fn builder() -> CloudConfigBuilder {
        CloudConfigBuilder::default()
    }

    pub fn provider(&self) -> CloudProvider {
        self.provider
    }

    pub fn mode(&self) -> CloudMode {
        self.mode
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Configured region, or [`DEFAULT_REGION`] when unset or blank.
    pub fn region_or_default(&self) -> &str {
        match self.region.as_deref() {
            Some(r) if !r.trim().is_empty() => r,
            _ => DEFAULT_REGION,
        }
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    pub fn overrides(&self) -> &BTreeMap<String, String> {
        &self.overrides
    }

    pub fn override_value(&self, key: &str) -> Option<&str> {
        self.overrides.get(key).map(String::as_str)
    }

    /// Load configuration from a YAML file and environment.
    ///
    /// Sources, later overriding earlier:
    /// 1. The YAML file at `path`
    /// 2. Environment variables with the `CLOUD_TESTKIT__` prefix
    ///    (e.g. `CLOUD_TESTKIT__MODE=live`)
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let config = ConfigLib::builder()
            .add_source(File::new(path, FileFormat::Yaml).required(true))
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Parse configuration from an in-memory YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, File, FileFormat};

        let config = ConfigLib::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Builder for [`CloudConfig`].
#[derive(Debug, Clone, Default)]
pub struct CloudConfigBuilder {
    inner: CloudConfig,
}

impl CloudConfigBuilder {
    pub fn provider(mut self, provider: CloudProvider) -> Self {
        self.inner.provider = provider;
        self
    }

    pub fn mode(mut self, mode: CloudMode) -> Self {
        self.inner.mode = mode;
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.inner.region = Some(region.into());
        self
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.inner.project = Some(project.into());
        self
    }

    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.overrides.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> CloudConfig {
        self.inner
    }
}
