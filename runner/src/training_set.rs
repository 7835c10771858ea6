use async_trait::async_trait;
use featureform_provider::{
    OfflineStore, ProviderRegistry, ProviderType, SerializedConfig, TrainingSetDef,
};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    job::offline_store, CompletionWatcher, Config, JobConfig, JobError, JobType, Runner,
    RunnerFactory, SyncWatcher,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTrainingSetConfig {
    pub offline_type: ProviderType,
    pub offline_config: SerializedConfig,
    pub def: TrainingSetDef,
    #[serde(default)]
    pub is_update: bool,
}

pub struct CreateTrainingSetRunner {
    offline: Box<dyn OfflineStore>,
    def: TrainingSetDef,
    is_update: bool,
}

#[async_trait]
impl Runner for CreateTrainingSetRunner {
    async fn run(self: Box<Self>) -> Result<Box<dyn CompletionWatcher>, JobError> {
        info!("Building training set {}", self.def.id);
        let result = if self.is_update {
            self.offline.update_training_set(&self.def).await
        } else {
            self.offline.create_training_set(&self.def).await
        };
        let result =
            result.map_err(|e| JobError::execution(JobType::CreateTrainingSet, &self.def.id, e));
        Ok(Box::new(SyncWatcher::new(result)))
    }
}

pub struct CreateTrainingSetFactory;

#[async_trait]
impl RunnerFactory for CreateTrainingSetFactory {
    async fn create(
        &self,
        providers: &ProviderRegistry,
        config: &Config,
    ) -> Result<Box<dyn Runner>, JobError> {
        let config = CreateTrainingSetConfig::from_config(config)?;
        let offline = offline_store(providers, &config.offline_type, &config.offline_config).await?;
        Ok(Box::new(CreateTrainingSetRunner {
            offline,
            def: config.def,
            is_update: config.is_update,
        }))
    }
}
