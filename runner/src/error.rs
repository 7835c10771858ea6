use std::{fmt::Display, sync::PoisonError};

use featureform_provider::{ProviderError, ProviderType};
use thiserror::Error;

use crate::JobType;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum JobError {
    #[error("Failed to deserialize job config: {0}")]
    ConfigDeserialize(String),

    #[error("Failed to serialize job config: {0}")]
    ConfigSerialize(String),

    #[error("Unknown job type '{0}'")]
    UnknownJobType(String),

    #[error("Job type {0} is already registered")]
    DuplicateRegistration(JobType),

    #[error("Failed to initialize provider {0}: {1}")]
    ProviderInitialization(ProviderType, ProviderError),

    #[error("Provider capability mismatch: {0}")]
    ProviderCapabilityMismatch(ProviderError),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{job} job failed on {resource}: {source}")]
    JobExecutionFailure {
        job: JobType,
        resource: String,
        source: ProviderError,
    },

    #[error("{0}")]
    SyncError(String),
}

impl JobError {
    pub fn execution<T>(job: JobType, resource: T, source: ProviderError) -> Self
    where
        T: Display,
    {
        JobError::JobExecutionFailure {
            job,
            resource: resource.to_string(),
            source,
        }
    }
}

impl<Guard> From<PoisonError<Guard>> for JobError {
    fn from(e: PoisonError<Guard>) -> Self {
        JobError::SyncError(e.to_string())
    }
}
