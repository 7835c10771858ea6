use std::sync::PoisonError;

use thiserror::Error;

use crate::{MaterializationId, ProviderType, ValueType};

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ProviderError {
    #[error("Provider type '{0}' is not registered")]
    UnknownProviderType(ProviderType),

    #[error("Provider type '{0}' is already registered")]
    DuplicateProvider(ProviderType),

    #[error("Failed to deserialize {0} config: {1}")]
    ConfigDeserialize(ProviderType, String),

    #[error("Failed to initialize {0} client: {1}")]
    ClientInitialization(ProviderType, String),

    #[error("Provider {0} is not an offline store")]
    NotOfflineStore(ProviderType),

    #[error("Provider {0} is not an online store")]
    NotOnlineStore(ProviderType),

    #[error("Provider {0} connection failed: {1}")]
    Connection(ProviderType, String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Entity {0} not found")]
    EntityNotFound(String),

    #[error("Table {feature} variant {variant} not found")]
    TableNotFound { feature: String, variant: String },

    #[error("Table {feature} variant {variant} already exists")]
    TableAlreadyExists { feature: String, variant: String },

    #[error("Dataset {0} not found")]
    DatasetNotFound(String),

    #[error("Dataset {0} already exists")]
    DatasetAlreadyExists(String),

    #[error("Materialization {0} not found")]
    MaterializationNotFound(MaterializationId),

    #[error("Resource {0} has invalid type, expected {1}")]
    InvalidResourceType(String, String),

    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),

    #[error("Cannot decode '{value}' as {value_type:?}: {reason}")]
    ValueDecode {
        value: String,
        value_type: ValueType,
        reason: String,
    },

    #[error("{0} is not supported by this provider")]
    Unsupported(String),

    #[error("{0}")]
    Backend(String),

    #[error("{0}")]
    SyncError(String),
}

impl ProviderError {
    pub fn table_not_found(feature: &str, variant: &str) -> Self {
        ProviderError::TableNotFound {
            feature: feature.to_string(),
            variant: variant.to_string(),
        }
    }

    pub fn table_already_exists(feature: &str, variant: &str) -> Self {
        ProviderError::TableAlreadyExists {
            feature: feature.to_string(),
            variant: variant.to_string(),
        }
    }
}

impl<Guard> From<PoisonError<Guard>> for ProviderError {
    fn from(e: PoisonError<Guard>) -> Self {
        ProviderError::SyncError(e.to_string())
    }
}
