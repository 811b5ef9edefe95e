//! Application state.

use std::sync::Arc;

use retouch_store::RocksStore;

use crate::config::{ProviderKind, ServiceConfig};
use crate::jobs::JobRegistry;
use crate::provider::{DirectProvider, EditProvider, ReplicateProvider};
use crate::storage::{BucketStorage, ObjectStorage};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Storage layer.
    pub store: Arc<RocksStore>,

    /// Service configuration.
    pub config: Arc<ServiceConfig>,

    /// AI edit provider backend.
    pub provider: Arc<dyn EditProvider>,

    /// Durable image storage.
    pub storage: Arc<dyn ObjectStorage>,

    /// In-flight edit jobs.
    pub jobs: JobRegistry,
}

impl AppState {
    /// Create application state with explicitly injected collaborators.
    #[must_use]
    pub fn new(
        store: Arc<RocksStore>,
        config: ServiceConfig,
        provider: Arc<dyn EditProvider>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            store,
            config: Arc::new(config),
            provider,
            storage,
            jobs: JobRegistry::new(),
        }
    }

    /// Create application state from configuration, selecting the
    /// provider backend and building the real HTTP collaborators.
    #[must_use]
    pub fn from_config(store: Arc<RocksStore>, config: ServiceConfig) -> Self {
        let provider: Arc<dyn EditProvider> = match config.provider {
            ProviderKind::Replicate => Arc::new(ReplicateProvider::new(
                config.provider_api_url.clone(),
                config.provider_api_token.clone(),
                config.provider_model.clone(),
            )),
            ProviderKind::Direct => Arc::new(DirectProvider::new(
                config.provider_api_url.clone(),
                config.provider_api_token.clone(),
            )),
        };

        let storage = Arc::new(BucketStorage::new(
            config.storage_api_url.clone(),
            config.storage_api_key.clone(),
        ));

        Self::new(store, config, provider, storage)
    }
}
