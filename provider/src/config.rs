use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};

use crate::{ProviderError, ProviderType};

/**
 * Opaque provider connection parameters, embedded in job configs as base64
 */
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SerializedConfig(Vec<u8>);

impl SerializedConfig {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for SerializedConfig {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for SerializedConfig {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl Serialize for SerializedConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&base64::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for SerializedConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        base64::decode(s)
            .map(SerializedConfig)
            .map_err(serde::de::Error::custom)
    }
}

/**
 * Connection parameters of one provider family
 */
pub trait ProviderConfig: Serialize + DeserializeOwned + Default {
    fn serialized(&self) -> SerializedConfig {
        // Plain structs with string keys always serialize
        SerializedConfig(serde_json::to_vec(self).unwrap_or_default())
    }

    fn parse(
        provider_type: &ProviderType,
        config: &SerializedConfig,
    ) -> Result<Self, ProviderError> {
        serde_json::from_slice(config.as_bytes())
            .map_err(|e| ProviderError::ConfigDeserialize(provider_type.clone(), e.to_string()))
    }

    /**
     * Same as `parse`, but an empty payload yields the default config
     */
    fn parse_or_default(
        provider_type: &ProviderType,
        config: &SerializedConfig,
    ) -> Result<Self, ProviderError> {
        if config.is_empty() {
            Ok(Self::default())
        } else {
            Self::parse(provider_type, config)
        }
    }
}
