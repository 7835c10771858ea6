use std::fmt::Display;

use serde::{Deserialize, Serialize};

pub const MEMORY_OFFLINE: &str = "MEMORY_OFFLINE";
pub const LOCAL_ONLINE: &str = "LOCAL_ONLINE";
pub const KEY_VALUE_ONLINE: &str = "KEY_VALUE_ONLINE";
pub const MOCK_OFFLINE: &str = "MOCK_OFFLINE";

/**
 * Tag naming the backend family a serialized provider config targets
 */
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderType(String);

impl ProviderType {
    pub fn new<T>(name: T) -> Self
    where
        T: AsRef<str>,
    {
        Self(name.as_ref().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProviderType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ProviderType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<&str> for ProviderType {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
