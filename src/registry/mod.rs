//! Adapter discovery and caching.
//!
//! Provider modules register a factory at link time with
//! `inventory::submit!`. The registry creates one adapter per provider on
//! first request, caches it, and re-initializes it with every supplied
//! configuration.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};

use tracing::debug;

use crate::adapter::CloudAdapter;
use crate::capability::{CapabilityError, Result};
use crate::config::{CloudConfig, CloudProvider};

/// Link-time registration of an adapter factory.
pub struct AdapterRegistration {
    pub provider: CloudProvider,
    pub factory: fn() -> Arc<dyn CloudAdapter>,
}

inventory::collect!(AdapterRegistration);

static GLOBAL: LazyLock<AdapterRegistry> = LazyLock::new(AdapterRegistry::new);

/// Caches one adapter per provider.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Mutex<HashMap<CloudProvider, Arc<dyn CloudAdapter>>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static AdapterRegistry {
        &GLOBAL
    }

    /// Providers with a link-time registration.
    pub fn registered_providers() -> Vec<CloudProvider> {
        inventory::iter::<AdapterRegistration>
            .into_iter()
            .map(|r| r.provider)
            .collect()
    }

    fn discover(provider: CloudProvider) -> Option<Arc<dyn CloudAdapter>> {
        inventory::iter::<AdapterRegistration>
            .into_iter()
            .find(|r| r.provider == provider)
            .map(|r| (r.factory)())
    }

    /// Cached adapter for `provider`, initialized with `config`.
    pub fn get(&self, provider: CloudProvider, config: CloudConfig) -> Result<Arc<dyn CloudAdapter>> {
        let mut adapters = self.adapters.lock().unwrap_or_else(|e| e.into_inner());

        let adapter = match adapters.get(&provider) {
            Some(adapter) => adapter.clone(),
            None => {
                let adapter = Self::discover(provider).ok_or(CapabilityError::NoAdapter(provider))?;
                debug!(provider = %provider, "Discovered cloud adapter");
                adapters.insert(provider, adapter.clone());
                adapter
            }
        };

        adapter.initialize(config)?;
        Ok(adapter)
    }

    /// A fresh, uninitialized adapter for `provider`, if one is registered.
    pub fn try_get(&self, provider: CloudProvider) -> Option<Arc<dyn CloudAdapter>> {
        Self::discover(provider)
    }

    /// Cache `adapter` for its provider, replacing any discovered one.
    pub fn register(&self, adapter: Arc<dyn CloudAdapter>) {
        let provider = adapter.provider();
        self.adapters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(provider, adapter);
    }
}
