use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use log::debug;

use crate::{
    provider_type::{KEY_VALUE_ONLINE, LOCAL_ONLINE, MEMORY_OFFLINE},
    InMemoryKeyValueClient, KeyValueFactory, LocalOnlineBackend, MemoryOfflineBackend, Provider,
    ProviderError, ProviderType, SerializedConfig,
};

/**
 * Builds a live provider connection from its serialized connection parameters
 */
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    async fn create(&self, config: &SerializedConfig) -> Result<Box<dyn Provider>, ProviderError>;
}

/**
 * Resolves provider type tags to live provider connections
 */
#[derive(Default)]
pub struct ProviderRegistry {
    factories: RwLock<HashMap<ProviderType, Arc<dyn ProviderFactory>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /**
     * Registry with the in-process backends bound, every connection made
     * through it shares the same backend state
     */
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        let defaults: Vec<(&str, Arc<dyn ProviderFactory>)> = vec![
            (MEMORY_OFFLINE, Arc::new(MemoryOfflineBackend::default())),
            (LOCAL_ONLINE, Arc::new(LocalOnlineBackend::default())),
            (
                KEY_VALUE_ONLINE,
                Arc::new(KeyValueFactory::new(Arc::new(
                    InMemoryKeyValueClient::default(),
                ))),
            ),
        ];
        if let Ok(mut factories) = registry.factories.write() {
            for (provider_type, factory) in defaults {
                factories.insert(provider_type.into(), factory);
            }
        }
        registry
    }

    pub fn register<T>(
        &self,
        provider_type: T,
        factory: Arc<dyn ProviderFactory>,
    ) -> Result<(), ProviderError>
    where
        T: Into<ProviderType>,
    {
        let provider_type = provider_type.into();
        let mut factories = self.factories.write()?;
        if factories.contains_key(&provider_type) {
            return Err(ProviderError::DuplicateProvider(provider_type));
        }
        debug!("Registering provider factory {}", provider_type);
        factories.insert(provider_type, factory);
        Ok(())
    }

    /**
     * Connect to the backend named by `provider_type`
     */
    pub async fn get(
        &self,
        provider_type: &ProviderType,
        config: &SerializedConfig,
    ) -> Result<Box<dyn Provider>, ProviderError> {
        let factory = self
            .factories
            .read()?
            .get(provider_type)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownProviderType(provider_type.clone()))?;
        debug!("Connecting to provider {}", provider_type);
        factory.create(config).await
    }

    pub fn provider_types(&self) -> Vec<ProviderType> {
        let mut types: Vec<ProviderType> = self
            .factories
            .read()
            .map(|f| f.keys().cloned().collect())
            .unwrap_or_default();
        types.sort();
        types
    }
}
