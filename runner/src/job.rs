use async_trait::async_trait;
use common_utils::Logged;
use featureform_provider::{
    OfflineStore, OnlineStore, ProviderRegistry, ProviderType, SerializedConfig,
};

use crate::{CompletionWatcher, Config, JobError};

/**
 * A unit of work bound to live provider connections
 */
#[async_trait]
pub trait Runner: Send {
    /**
     * Start the job, errors returned here mean no work was started
     */
    async fn run(self: Box<Self>) -> Result<Box<dyn CompletionWatcher>, JobError>;
}

/**
 * Turns a serialized job description into a runner, performs no work
 */
#[async_trait]
pub trait RunnerFactory: Send + Sync {
    async fn create(
        &self,
        providers: &ProviderRegistry,
        config: &Config,
    ) -> Result<Box<dyn Runner>, JobError>;
}

pub(crate) async fn offline_store(
    providers: &ProviderRegistry,
    provider_type: &ProviderType,
    config: &SerializedConfig,
) -> Result<Box<dyn OfflineStore>, JobError> {
    providers
        .get(provider_type, config)
        .await
        .log()
        .map_err(|e| JobError::ProviderInitialization(provider_type.clone(), e))?
        .into_offline_store()
        .map_err(JobError::ProviderCapabilityMismatch)
}

pub(crate) async fn online_store(
    providers: &ProviderRegistry,
    provider_type: &ProviderType,
    config: &SerializedConfig,
) -> Result<Box<dyn OnlineStore>, JobError> {
    providers
        .get(provider_type, config)
        .await
        .log()
        .map_err(|e| JobError::ProviderInitialization(provider_type.clone(), e))?
        .into_online_store()
        .map_err(JobError::ProviderCapabilityMismatch)
}
