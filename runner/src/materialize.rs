use async_trait::async_trait;
use featureform_provider::{
    OfflineStore, OnlineStore, ProviderError, ProviderRegistry, ProviderType, ResourceId,
    SerializedConfig, ValueType,
};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    copy::{chunk_count, copy_chunk},
    job::{offline_store, online_store},
    AsyncWatcher, CompletionWatcher, Config, JobConfig, JobError, JobType, Runner, RunnerFactory,
};

fn default_chunk_size() -> u64 {
    1024
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializeConfig {
    pub online_type: ProviderType,
    pub offline_type: ProviderType,
    pub online_config: SerializedConfig,
    pub offline_config: SerializedConfig,
    pub resource_id: ResourceId,
    pub value_type: ValueType,
    #[serde(default)]
    pub is_update: bool,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
}

/**
 * Snapshots a feature in the offline store and loads it into the online store
 */
pub struct MaterializeRunner {
    online: Box<dyn OnlineStore>,
    offline: Box<dyn OfflineStore>,
    resource_id: ResourceId,
    value_type: ValueType,
    is_update: bool,
    chunk_size: u64,
}

impl MaterializeRunner {
    async fn materialize(&self) -> Result<(), ProviderError> {
        let materialization = if self.is_update {
            self.offline.update_materialization(&self.resource_id).await?
        } else {
            self.offline.create_materialization(&self.resource_id).await?
        };
        let (name, variant) = (&self.resource_id.name, &self.resource_id.variant);
        let table = match self.online.create_table(name, variant, self.value_type).await {
            Ok(table) => table,
            Err(ProviderError::TableAlreadyExists { .. }) if self.is_update => {
                self.online.get_table(name, variant).await?
            }
            Err(e) => return Err(e),
        };
        let chunks = chunk_count(materialization.num_rows().await?, self.chunk_size);
        let mut copied = 0;
        for chunk_idx in 0..chunks {
            copied += copy_chunk(
                materialization.as_ref(),
                table.as_ref(),
                self.chunk_size,
                chunk_idx,
            )
            .await?;
        }
        info!(
            "Materialized {} rows of {} in {} chunks",
            copied, self.resource_id, chunks
        );
        Ok(())
    }
}

#[async_trait]
impl Runner for MaterializeRunner {
    async fn run(self: Box<Self>) -> Result<Box<dyn CompletionWatcher>, JobError> {
        if self.chunk_size == 0 {
            return Err(JobError::InvalidArguments(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        let resource = self.resource_id.to_string();
        let task_resource = resource.clone();
        Ok(Box::new(AsyncWatcher::spawn(
            JobType::Materialize,
            resource,
            async move {
                self.materialize()
                    .await
                    .map_err(|e| JobError::execution(JobType::Materialize, task_resource, e))
            },
        )))
    }
}

pub struct MaterializeFactory;

#[async_trait]
impl RunnerFactory for MaterializeFactory {
    async fn create(
        &self,
        providers: &ProviderRegistry,
        config: &Config,
    ) -> Result<Box<dyn Runner>, JobError> {
        let config = MaterializeConfig::from_config(config)?;
        let offline = offline_store(providers, &config.offline_type, &config.offline_config).await?;
        let online = online_store(providers, &config.online_type, &config.online_config).await?;
        Ok(Box::new(MaterializeRunner {
            online,
            offline,
            resource_id: config.resource_id,
            value_type: config.value_type,
            is_update: config.is_update,
            chunk_size: config.chunk_size,
        }))
    }
}
