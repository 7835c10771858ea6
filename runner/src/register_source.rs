use async_trait::async_trait;
use featureform_provider::{
    OfflineResourceType, OfflineStore, ProviderError, ProviderRegistry, ProviderType,
    ResourceId, ResourceSchema, SerializedConfig,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    job::offline_store, CompletionWatcher, Config, JobConfig, JobError, JobType, Runner,
    RunnerFactory, SyncWatcher,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSourceConfig {
    pub offline_type: ProviderType,
    pub offline_config: SerializedConfig,
    pub resource_id: ResourceId,
    pub source_table_name: String,
}

/**
 * Registers an externally produced table as a primary or transformation source
 */
pub struct RegisterSourceRunner {
    offline: Box<dyn OfflineStore>,
    resource_id: ResourceId,
    source_table_name: String,
}

impl RegisterSourceRunner {
    async fn register(&self) -> Result<(), ProviderError> {
        match self.resource_id.resource_type {
            OfflineResourceType::Transformation => {
                let schema = ResourceSchema {
                    source_table: self.source_table_name.clone(),
                    ..Default::default()
                };
                self.offline
                    .register_resource_from_source_table(&self.resource_id, &schema)
                    .await?;
            }
            _ => {
                self.offline
                    .register_primary_from_source_table(&self.resource_id, &self.source_table_name)
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Runner for RegisterSourceRunner {
    async fn run(self: Box<Self>) -> Result<Box<dyn CompletionWatcher>, JobError> {
        info!(
            "Registering {} from source table '{}'",
            self.resource_id, self.source_table_name
        );
        let result = self.register().await.map_err(|e| {
            JobError::execution(JobType::RegisterSource, &self.resource_id, e)
        });
        Ok(Box::new(SyncWatcher::new(result)))
    }
}

pub struct RegisterSourceFactory;

#[async_trait]
impl RunnerFactory for RegisterSourceFactory {
    async fn create(
        &self,
        providers: &ProviderRegistry,
        config: &Config,
    ) -> Result<Box<dyn Runner>, JobError> {
        let config = RegisterSourceConfig::from_config(config)?;
        debug!("Register source config: {:?}", config);
        let offline = offline_store(providers, &config.offline_type, &config.offline_config).await?;
        Ok(Box::new(RegisterSourceRunner {
            offline,
            resource_id: config.resource_id,
            source_table_name: config.source_table_name,
        }))
    }
}
