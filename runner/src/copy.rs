use async_trait::async_trait;
use featureform_provider::{
    Materialization, MaterializationId, OfflineStore, OnlineStore, OnlineStoreTable,
    ProviderError, ProviderRegistry, ProviderType, ResourceId, SerializedConfig,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    job::{offline_store, online_store},
    AsyncWatcher, CompletionWatcher, Config, JobConfig, JobError, JobType, Runner, RunnerFactory,
};

/**
 * Number of `chunk_size` chunks covering `num_rows` rows
 */
pub(crate) fn chunk_count(num_rows: u64, chunk_size: u64) -> u64 {
    num_rows / chunk_size + u64::from(num_rows % chunk_size != 0)
}

/**
 * Copy rows `[chunk_idx * chunk_size, (chunk_idx + 1) * chunk_size)` of the
 * materialization into the online table, returns the number of rows copied
 */
pub(crate) async fn copy_chunk(
    materialization: &dyn Materialization,
    table: &dyn OnlineStoreTable,
    chunk_size: u64,
    chunk_idx: u64,
) -> Result<u64, ProviderError> {
    let num_rows = materialization.num_rows().await?;
    let begin = chunk_idx.saturating_mul(chunk_size);
    if begin >= num_rows {
        debug!(
            "Chunk {} of {} is past the last row",
            chunk_idx,
            materialization.id()
        );
        return Ok(0);
    }
    let end = begin.saturating_add(chunk_size).min(num_rows);
    let mut rows = materialization.iterate_segment(begin, end).await?;
    let mut copied = 0;
    while let Some(record) = rows.next().await? {
        table.set(&record.entity, record.value).await?;
        copied += 1;
    }
    debug!(
        "Copied rows [{}, {}) of {}",
        begin,
        end,
        materialization.id()
    );
    Ok(copied)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyToOnlineConfig {
    pub online_type: ProviderType,
    pub offline_type: ProviderType,
    pub online_config: SerializedConfig,
    pub offline_config: SerializedConfig,
    pub materialization_id: MaterializationId,
    pub resource_id: ResourceId,
    pub chunk_size: u64,
    pub chunk_idx: u64,
}

/**
 * Copies one chunk of a materialization into the online table of its feature
 */
pub struct CopyToOnlineRunner {
    online: Box<dyn OnlineStore>,
    offline: Box<dyn OfflineStore>,
    materialization_id: MaterializationId,
    resource_id: ResourceId,
    chunk_size: u64,
    chunk_idx: u64,
}

impl CopyToOnlineRunner {
    async fn copy(&self) -> Result<(), ProviderError> {
        let materialization = self
            .offline
            .get_materialization(&self.materialization_id)
            .await?;
        let table = self
            .online
            .get_table(&self.resource_id.name, &self.resource_id.variant)
            .await?;
        let copied = copy_chunk(
            materialization.as_ref(),
            table.as_ref(),
            self.chunk_size,
            self.chunk_idx,
        )
        .await?;
        info!(
            "Copied {} rows of chunk {} into {}",
            copied, self.chunk_idx, self.resource_id
        );
        Ok(())
    }
}

#[async_trait]
impl Runner for CopyToOnlineRunner {
    async fn run(self: Box<Self>) -> Result<Box<dyn CompletionWatcher>, JobError> {
        if self.chunk_size == 0 {
            return Err(JobError::InvalidArguments(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        let resource = self.resource_id.to_string();
        let task_resource = resource.clone();
        Ok(Box::new(AsyncWatcher::spawn(
            JobType::CopyToOnline,
            resource,
            async move {
                self.copy()
                    .await
                    .map_err(|e| JobError::execution(JobType::CopyToOnline, task_resource, e))
            },
        )))
    }
}

pub struct CopyToOnlineFactory;

#[async_trait]
impl RunnerFactory for CopyToOnlineFactory {
    async fn create(
        &self,
        providers: &ProviderRegistry,
        config: &Config,
    ) -> Result<Box<dyn Runner>, JobError> {
        let config = CopyToOnlineConfig::from_config(config)?;
        let offline = offline_store(providers, &config.offline_type, &config.offline_config).await?;
        let online = online_store(providers, &config.online_type, &config.online_config).await?;
        Ok(Box::new(CopyToOnlineRunner {
            online,
            offline,
            materialization_id: config.materialization_id,
            resource_id: config.resource_id,
            chunk_size: config.chunk_size,
            chunk_idx: config.chunk_idx,
        }))
    }
}
