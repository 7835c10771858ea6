use async_trait::async_trait;
use featureform_provider::{
    OfflineStore, ProviderRegistry, ProviderType, SerializedConfig, TransformationConfig,
};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    job::offline_store, CompletionWatcher, Config, JobConfig, JobError, JobType, Runner,
    RunnerFactory, SyncWatcher,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTransformationConfig {
    pub offline_type: ProviderType,
    pub offline_config: SerializedConfig,
    pub transformation: TransformationConfig,
    #[serde(default)]
    pub is_update: bool,
}

pub struct CreateTransformationRunner {
    offline: Box<dyn OfflineStore>,
    transformation: TransformationConfig,
    is_update: bool,
}

#[async_trait]
impl Runner for CreateTransformationRunner {
    async fn run(self: Box<Self>) -> Result<Box<dyn CompletionWatcher>, JobError> {
        let target = &self.transformation.target_table_id;
        info!(
            "{} transformation {}",
            if self.is_update { "Updating" } else { "Creating" },
            target
        );
        let result = if self.is_update {
            self.offline.update_transformation(&self.transformation).await
        } else {
            self.offline.create_transformation(&self.transformation).await
        };
        let result =
            result.map_err(|e| JobError::execution(JobType::CreateTransformation, target, e));
        Ok(Box::new(SyncWatcher::new(result)))
    }
}

pub struct CreateTransformationFactory;

#[async_trait]
impl RunnerFactory for CreateTransformationFactory {
    async fn create(
        &self,
        providers: &ProviderRegistry,
        config: &Config,
    ) -> Result<Box<dyn Runner>, JobError> {
        let config = CreateTransformationConfig::from_config(config)?;
        let offline = offline_store(providers, &config.offline_type, &config.offline_config).await?;
        Ok(Box::new(CreateTransformationRunner {
            offline,
            transformation: config.transformation,
            is_update: config.is_update,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use featureform_provider::{
        mock::MockOfflineFactory,
        provider_type::{MEMORY_OFFLINE, MOCK_OFFLINE},
        OfflineResourceType, ProviderError, ResourceId, TransformationType,
    };

    use super::*;
    use crate::JobRegistry;

    fn config(offline_type: &str, is_update: bool) -> Config {
        CreateTransformationConfig {
            offline_type: offline_type.into(),
            offline_config: SerializedConfig::default(),
            transformation: TransformationConfig {
                transformation_type: TransformationType::Sql,
                target_table_id: ResourceId::new(
                    "avg_tx",
                    "v1",
                    OfflineResourceType::Transformation,
                ),
                query: "SELECT user, avg(amount) FROM {{transactions.v1}} GROUP BY user"
                    .to_string(),
                source_mapping: vec![],
            },
            is_update,
        }
        .to_config()
        .unwrap()
    }

    #[tokio::test]
    async fn create_and_update_on_mock() {
        let mock = MockOfflineFactory::default();
        let providers = ProviderRegistry::new();
        providers.register(MOCK_OFFLINE, Arc::new(mock.clone())).unwrap();
        let registry = JobRegistry::with_defaults(Arc::new(providers));
        for is_update in [false, true] {
            let runner = registry
                .create(JobType::CreateTransformation, &config(MOCK_OFFLINE, is_update))
                .await
                .unwrap();
            runner.run().await.unwrap().wait().await.unwrap();
        }
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn unsupported_backend_fails_in_watcher() {
        let registry = JobRegistry::with_defaults(Arc::new(ProviderRegistry::with_defaults()));
        let runner = registry
            .create(JobType::CreateTransformation, &config(MEMORY_OFFLINE, false))
            .await
            .unwrap();
        let err = runner.run().await.unwrap().wait().await.unwrap_err();
        assert!(matches!(
            err,
            JobError::JobExecutionFailure {
                job: JobType::CreateTransformation,
                source: ProviderError::Unsupported(_),
                ..
            }
        ));
    }
}
