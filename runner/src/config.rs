use serde::{de::DeserializeOwned, Serialize};

use crate::JobError;

/**
 * Opaque serialized job description, produced by `JobConfig::to_config`
 */
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Config(Vec<u8>);

impl Config {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Config {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Config {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

pub trait JobConfig: Sized {
    fn to_config(&self) -> Result<Config, JobError>;

    fn from_config(config: &Config) -> Result<Self, JobError>;
}

impl<T> JobConfig for T
where
    T: Serialize + DeserializeOwned,
{
    fn to_config(&self) -> Result<Config, JobError> {
        serde_json::to_vec(self)
            .map(Config)
            .map_err(|e| JobError::ConfigSerialize(e.to_string()))
    }

    fn from_config(config: &Config) -> Result<Self, JobError> {
        serde_json::from_slice(config.as_bytes())
            .map_err(|e| JobError::ConfigDeserialize(e.to_string()))
    }
}
