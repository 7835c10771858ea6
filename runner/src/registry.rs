use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use featureform_provider::ProviderRegistry;
use log::{debug, info};

use crate::{
    Config, CopyToOnlineFactory, CreateTrainingSetFactory, CreateTransformationFactory, JobError,
    JobType, MaterializeFactory, RegisterSourceFactory, Runner, RunnerFactory,
};

/**
 * Maps job types to the factories building their runners
 */
pub struct JobRegistry {
    factories: Mutex<HashMap<JobType, Arc<dyn RunnerFactory>>>,
    providers: Arc<ProviderRegistry>,
}

impl JobRegistry {
    pub fn new(providers: Arc<ProviderRegistry>) -> Self {
        Self {
            factories: Default::default(),
            providers,
        }
    }

    /**
     * Registry with every built-in job type bound
     */
    pub fn with_defaults(providers: Arc<ProviderRegistry>) -> Self {
        let registry = Self::new(providers);
        let defaults: Vec<(JobType, Arc<dyn RunnerFactory>)> = vec![
            (JobType::RegisterSource, Arc::new(RegisterSourceFactory)),
            (
                JobType::CreateTransformation,
                Arc::new(CreateTransformationFactory),
            ),
            (JobType::CreateTrainingSet, Arc::new(CreateTrainingSetFactory)),
            (JobType::Materialize, Arc::new(MaterializeFactory)),
            (JobType::CopyToOnline, Arc::new(CopyToOnlineFactory)),
        ];
        if let Ok(mut factories) = registry.factories.lock() {
            factories.extend(defaults);
        }
        registry
    }

    pub fn providers(&self) -> &Arc<ProviderRegistry> {
        &self.providers
    }

    pub fn register_factory(
        &self,
        job_type: JobType,
        factory: Arc<dyn RunnerFactory>,
    ) -> Result<(), JobError> {
        let mut factories = self.factories.lock()?;
        if factories.contains_key(&job_type) {
            return Err(JobError::DuplicateRegistration(job_type));
        }
        debug!("Registering runner factory for {}", job_type);
        factories.insert(job_type, factory);
        Ok(())
    }

    /**
     * Build the runner of `job_type` from its serialized config
     */
    pub async fn create(
        &self,
        job_type: JobType,
        config: &Config,
    ) -> Result<Box<dyn Runner>, JobError> {
        let factory = self
            .factories
            .lock()?
            .get(&job_type)
            .cloned()
            .ok_or_else(|| JobError::UnknownJobType(job_type.to_string()))?;
        info!("Creating {} runner", job_type);
        factory.create(&self.providers, config).await
    }

    /// Returns `true` if `job_type` was bound
    pub fn remove(&self, job_type: JobType) -> Result<bool, JobError> {
        Ok(self.factories.lock()?.remove(&job_type).is_some())
    }

    pub fn reset(&self) -> Result<(), JobError> {
        self.factories.lock()?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use featureform_provider::{
        mock::MockOfflineFactory,
        provider_type::{LOCAL_ONLINE, MOCK_OFFLINE},
        MemoryOfflineConfig, ProviderConfig, ProviderError, ResourceId, SerializedConfig,
        TrainingSetDef,
    };

    use super::*;
    use crate::{CreateTrainingSetConfig, JobConfig, JobStatus, RegisterSourceConfig};

    fn registry_with_mock(factory: MockOfflineFactory) -> JobRegistry {
        let providers = ProviderRegistry::with_defaults();
        providers.register(MOCK_OFFLINE, Arc::new(factory)).unwrap();
        JobRegistry::with_defaults(Arc::new(providers))
    }

    fn training_set_config(offline_type: &str) -> Config {
        CreateTrainingSetConfig {
            offline_type: offline_type.into(),
            offline_config: SerializedConfig::default(),
            def: TrainingSetDef::default(),
            is_update: false,
        }
        .to_config()
        .unwrap()
    }

    #[tokio::test]
    async fn empty_config_fails() {
        let registry = registry_with_mock(MockOfflineFactory::default());
        let result = registry
            .create(JobType::CreateTrainingSet, &Config::default())
            .await;
        assert!(matches!(result, Err(JobError::ConfigDeserialize(_))));
    }

    #[tokio::test]
    async fn invalid_offline_type() {
        let registry = registry_with_mock(MockOfflineFactory::default());
        let result = registry
            .create(
                JobType::CreateTrainingSet,
                &training_set_config("Invalid_Offline_type"),
            )
            .await;
        assert!(matches!(
            result,
            Err(JobError::ProviderInitialization(
                _,
                ProviderError::UnknownProviderType(_)
            ))
        ));
    }

    #[tokio::test]
    async fn online_provider_as_offline_store() {
        let registry = registry_with_mock(MockOfflineFactory::default());
        let result = registry
            .create(JobType::CreateTrainingSet, &training_set_config(LOCAL_ONLINE))
            .await;
        assert!(matches!(
            result,
            Err(JobError::ProviderCapabilityMismatch(
                ProviderError::NotOfflineStore(_)
            ))
        ));
    }

    #[tokio::test]
    async fn mock_training_set_succeeds() {
        let mock = MockOfflineFactory::default();
        let registry = registry_with_mock(mock.clone());
        let runner = registry
            .create(JobType::CreateTrainingSet, &training_set_config(MOCK_OFFLINE))
            .await
            .unwrap();
        let watcher = runner.run().await.unwrap();
        assert!(watcher.wait().await.is_ok());
        assert!(watcher.wait().await.is_ok());
        assert_eq!(watcher.status(), JobStatus::Success);
        // Waiting twice doesn't run the job twice
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn mock_training_set_failure_propagates() {
        crate::tests::init_logger();
        let mock = MockOfflineFactory::failing("could not create training set");
        let registry = registry_with_mock(mock.clone());
        let runner = registry
            .create(JobType::CreateTrainingSet, &training_set_config(MOCK_OFFLINE))
            .await
            .unwrap();
        let watcher = runner.run().await.unwrap();
        let err = watcher.wait().await.unwrap_err();
        assert!(err.to_string().contains("could not create training set"));
        assert!(matches!(err, JobError::JobExecutionFailure { .. }));
        assert_eq!(watcher.wait().await.unwrap_err(), err);
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn register_source_on_mock() {
        let registry = registry_with_mock(MockOfflineFactory::default());
        let config = RegisterSourceConfig {
            offline_type: MOCK_OFFLINE.into(),
            offline_config: MemoryOfflineConfig::default().serialized(),
            resource_id: ResourceId::default(),
            source_table_name: String::new(),
        };
        let runner = registry
            .create(JobType::RegisterSource, &config.to_config().unwrap())
            .await
            .unwrap();
        runner.run().await.unwrap().wait().await.unwrap();
    }

    #[tokio::test]
    async fn register_source_failure_propagates() {
        let mock = MockOfflineFactory::failing("could not create training set");
        let registry = registry_with_mock(mock.clone());
        let config = RegisterSourceConfig {
            offline_type: MOCK_OFFLINE.into(),
            offline_config: SerializedConfig::default(),
            resource_id: ResourceId::default(),
            source_table_name: String::new(),
        };
        let runner = registry
            .create(JobType::RegisterSource, &config.to_config().unwrap())
            .await
            .unwrap();
        let watcher = runner.run().await.unwrap();
        let err = watcher.wait().await.unwrap_err();
        assert!(err.to_string().contains("could not create training set"));
        assert_eq!(watcher.status(), JobStatus::Failed);
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn duplicate_registration_and_reset() {
        let registry = registry_with_mock(MockOfflineFactory::default());
        assert_eq!(
            registry
                .register_factory(JobType::RegisterSource, Arc::new(RegisterSourceFactory))
                .unwrap_err(),
            JobError::DuplicateRegistration(JobType::RegisterSource)
        );

        assert!(registry.remove(JobType::Materialize).unwrap());
        assert!(!registry.remove(JobType::Materialize).unwrap());
        assert!(matches!(
            registry.create(JobType::Materialize, &Config::default()).await,
            Err(JobError::UnknownJobType(_))
        ));

        registry.reset().unwrap();
        assert!(matches!(
            registry
                .create(JobType::CreateTrainingSet, &training_set_config(MOCK_OFFLINE))
                .await,
            Err(JobError::UnknownJobType(_))
        ));
        registry
            .register_factory(JobType::RegisterSource, Arc::new(RegisterSourceFactory))
            .unwrap();
    }
}
