use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    provider_type::LOCAL_ONLINE, OnlineStore, OnlineStoreTable, Provider, ProviderConfig,
    ProviderError, ProviderFactory, ProviderType, SerializedConfig, Value, ValueType,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalOnlineConfig {}

impl ProviderConfig for LocalOnlineConfig {}

#[derive(Debug, Default)]
struct LocalTable {
    value_type: ValueType,
    values: HashMap<String, Value>,
}

type LocalTables = HashMap<(String, String), LocalTable>;

/**
 * Process-local online backend, keeps every table in memory
 */
#[derive(Clone, Debug, Default)]
pub struct LocalOnlineBackend {
    tables: Arc<Mutex<LocalTables>>,
}

impl LocalOnlineBackend {
    pub fn connect(&self, config: &SerializedConfig) -> Result<LocalOnlineStore, ProviderError> {
        LocalOnlineConfig::parse_or_default(&LOCAL_ONLINE.into(), config)?;
        Ok(LocalOnlineStore {
            tables: self.tables.clone(),
            config: config.clone(),
        })
    }
}

#[async_trait]
impl ProviderFactory for LocalOnlineBackend {
    async fn create(&self, config: &SerializedConfig) -> Result<Box<dyn Provider>, ProviderError> {
        Ok(Box::new(self.connect(config)?))
    }
}

pub struct LocalOnlineStore {
    tables: Arc<Mutex<LocalTables>>,
    config: SerializedConfig,
}

#[async_trait]
impl Provider for LocalOnlineStore {
    fn provider_type(&self) -> ProviderType {
        LOCAL_ONLINE.into()
    }

    fn config(&self) -> SerializedConfig {
        self.config.clone()
    }

    async fn check_health(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }

    fn into_online_store(self: Box<Self>) -> Result<Box<dyn OnlineStore>, ProviderError> {
        Ok(self)
    }
}

impl LocalOnlineStore {
    fn table(&self, feature: &str, variant: &str) -> Box<dyn OnlineStoreTable> {
        Box::new(LocalOnlineTable {
            key: (feature.to_string(), variant.to_string()),
            tables: self.tables.clone(),
        })
    }
}

#[async_trait]
impl OnlineStore for LocalOnlineStore {
    async fn get_table(
        &self,
        feature: &str,
        variant: &str,
    ) -> Result<Box<dyn OnlineStoreTable>, ProviderError> {
        let key = (feature.to_string(), variant.to_string());
        if !self.tables.lock()?.contains_key(&key) {
            return Err(ProviderError::table_not_found(feature, variant));
        }
        Ok(self.table(feature, variant))
    }

    async fn create_table(
        &self,
        feature: &str,
        variant: &str,
        value_type: ValueType,
    ) -> Result<Box<dyn OnlineStoreTable>, ProviderError> {
        let key = (feature.to_string(), variant.to_string());
        let mut tables = self.tables.lock()?;
        if tables.contains_key(&key) {
            return Err(ProviderError::table_already_exists(feature, variant));
        }
        tables.insert(
            key,
            LocalTable {
                value_type,
                values: HashMap::new(),
            },
        );
        Ok(self.table(feature, variant))
    }

    async fn delete_table(&self, feature: &str, variant: &str) -> Result<(), ProviderError> {
        self.tables
            .lock()?
            .remove(&(feature.to_string(), variant.to_string()))
            .map(|_| ())
            .ok_or_else(|| ProviderError::table_not_found(feature, variant))
    }
}

struct LocalOnlineTable {
    key: (String, String),
    tables: Arc<Mutex<LocalTables>>,
}

impl LocalOnlineTable {
    fn not_found(&self) -> ProviderError {
        ProviderError::table_not_found(&self.key.0, &self.key.1)
    }
}

#[async_trait]
impl OnlineStoreTable for LocalOnlineTable {
    async fn set(&self, entity: &str, value: Value) -> Result<(), ProviderError> {
        let mut tables = self.tables.lock()?;
        let table = tables.get_mut(&self.key).ok_or_else(|| self.not_found())?;
        if table.value_type != ValueType::Nil && value.value_type() != table.value_type {
            return Err(ProviderError::InvalidDefinition(format!(
                "table {}:{} stores {:?}, got {:?}",
                self.key.0, self.key.1, table.value_type, value
            )));
        }
        table.values.insert(entity.to_string(), value);
        Ok(())
    }

    async fn get(&self, entity: &str) -> Result<Value, ProviderError> {
        self.tables
            .lock()?
            .get(&self.key)
            .ok_or_else(|| self.not_found())?
            .values
            .get(entity)
            .cloned()
            .ok_or_else(|| ProviderError::EntityNotFound(entity.to_string()))
    }
}
