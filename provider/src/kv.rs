use std::{
    collections::HashMap,
    str::FromStr,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use common_utils::{dur_to_string, str_to_dur, DurationError, Logged};
use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::{
    provider_type::KEY_VALUE_ONLINE, OnlineStore, OnlineStoreTable, Provider, ProviderConfig,
    ProviderError, ProviderFactory, ProviderType, SerializedConfig, Value, ValueType,
};

pub const DEFAULT_TABLE_PREFIX: &str = "Featureform_table__";
pub const METADATA_TABLE: &str = "Metadata";
const METADATA_VALUE_TYPE: &str = "ValueType";
const FEATURE_VALUE: &str = "FeatureValue";

lazy_static! {
    static ref PART_RE: Regex = Regex::new(r"[^a-zA-Z0-9_]").unwrap();
    static ref NAME_RE: Regex = Regex::new(r"[^a-zA-Z0-9_.\-]").unwrap();
}

/**
 * Backend-legal table name of a feature variant
 */
pub fn table_name(prefix: &str, feature: &str, variant: &str) -> String {
    let name = format!(
        "{}__{}__{}",
        PART_RE.replace_all(prefix, ""),
        PART_RE.replace_all(feature, ""),
        PART_RE.replace_all(variant, ""),
    );
    NAME_RE.replace_all(&name, "").to_string()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableStatus {
    Creating,
    Active,
    Deleting,
}

/// Attribute name to string value
pub type Item = HashMap<String, String>;

/**
 * Schemaless key-value backend, every table has a single string hash key
 */
#[async_trait]
pub trait KeyValueClient: Send + Sync {
    async fn create_table(&self, name: &str) -> Result<(), ProviderError>;

    /**
     * Returns `None` if the table doesn't exist
     */
    async fn describe_table(&self, name: &str) -> Result<Option<TableStatus>, ProviderError>;

    async fn delete_table(&self, name: &str) -> Result<(), ProviderError>;

    async fn list_tables(&self, limit: usize) -> Result<Vec<String>, ProviderError>;

    async fn scan(&self, table: &str, limit: usize) -> Result<Vec<Item>, ProviderError>;

    async fn get_item(&self, table: &str, key: &str) -> Result<Option<Item>, ProviderError>;

    /**
     * Set one attribute of the item, creating the item if needed
     */
    async fn update_item(
        &self,
        table: &str,
        key: &str,
        attribute: &str,
        value: &str,
    ) -> Result<(), ProviderError>;

    async fn delete_item(&self, table: &str, key: &str) -> Result<(), ProviderError>;
}

#[derive(Debug)]
struct KvTable {
    pending_describes: u32,
    items: HashMap<String, Item>,
}

impl KvTable {
    fn status(&self) -> TableStatus {
        if self.pending_describes == 0 {
            TableStatus::Active
        } else {
            TableStatus::Creating
        }
    }
}

/**
 * In-process key-value backend, new tables turn active only after being
 * described `activation_delay` times
 */
#[derive(Debug, Default)]
pub struct InMemoryKeyValueClient {
    activation_delay: u32,
    tables: Mutex<HashMap<String, KvTable>>,
}

impl InMemoryKeyValueClient {
    pub fn with_activation_delay(activation_delay: u32) -> Self {
        Self {
            activation_delay,
            tables: Default::default(),
        }
    }

    fn with_active_table<T, F>(&self, name: &str, f: F) -> Result<T, ProviderError>
    where
        F: FnOnce(&mut KvTable) -> T,
    {
        let mut tables = self.tables.lock()?;
        let table = tables
            .get_mut(name)
            .ok_or_else(|| ProviderError::Backend(format!("Requested table {} not found", name)))?;
        if table.status() != TableStatus::Active {
            return Err(ProviderError::Backend(format!(
                "Table {} is being created",
                name
            )));
        }
        Ok(f(table))
    }
}

#[async_trait]
impl KeyValueClient for InMemoryKeyValueClient {
    async fn create_table(&self, name: &str) -> Result<(), ProviderError> {
        let mut tables = self.tables.lock()?;
        if tables.contains_key(name) {
            return Err(ProviderError::Backend(format!("Table {} already exists", name)));
        }
        tables.insert(
            name.to_string(),
            KvTable {
                pending_describes: self.activation_delay,
                items: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn describe_table(&self, name: &str) -> Result<Option<TableStatus>, ProviderError> {
        Ok(self.tables.lock()?.get_mut(name).map(|t| {
            let status = t.status();
            t.pending_describes = t.pending_describes.saturating_sub(1);
            status
        }))
    }

    async fn delete_table(&self, name: &str) -> Result<(), ProviderError> {
        self.tables
            .lock()?
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ProviderError::Backend(format!("Requested table {} not found", name)))
    }

    async fn list_tables(&self, limit: usize) -> Result<Vec<String>, ProviderError> {
        let mut names: Vec<String> = self.tables.lock()?.keys().cloned().collect();
        names.sort();
        names.truncate(limit);
        Ok(names)
    }

    async fn scan(&self, table: &str, limit: usize) -> Result<Vec<Item>, ProviderError> {
        self.with_active_table(table, |t| t.items.values().take(limit).cloned().collect())
    }

    async fn get_item(&self, table: &str, key: &str) -> Result<Option<Item>, ProviderError> {
        self.with_active_table(table, |t| t.items.get(key).cloned())
    }

    async fn update_item(
        &self,
        table: &str,
        key: &str,
        attribute: &str,
        value: &str,
    ) -> Result<(), ProviderError> {
        self.with_active_table(table, |t| {
            t.items
                .entry(key.to_string())
                .or_default()
                .insert(attribute.to_string(), value.to_string());
        })
    }

    async fn delete_item(&self, table: &str, key: &str) -> Result<(), ProviderError> {
        self.with_active_table(table, |t| {
            t.items.remove(key);
        })
    }
}

fn default_table_timeout() -> String {
    "360s".to_string()
}

fn default_metadata_timeout() -> String {
    "120s".to_string()
}

fn default_poll_interval() -> String {
    "5s".to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueConfig {
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_table_timeout")]
    pub table_timeout: String,
    #[serde(default = "default_metadata_timeout")]
    pub metadata_timeout: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,
}

impl Default for KeyValueConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            table_timeout: default_table_timeout(),
            metadata_timeout: default_metadata_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

impl ProviderConfig for KeyValueConfig {}

/**
 * Connects `KEY_VALUE_ONLINE` stores to one key-value client
 */
pub struct KeyValueFactory {
    client: Arc<dyn KeyValueClient>,
}

impl KeyValueFactory {
    pub fn new(client: Arc<dyn KeyValueClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderFactory for KeyValueFactory {
    async fn create(&self, config: &SerializedConfig) -> Result<Box<dyn Provider>, ProviderError> {
        let provider_type: ProviderType = KEY_VALUE_ONLINE.into();
        let parsed = KeyValueConfig::parse(&provider_type, config)?;
        let store = KeyValueOnlineStore::connect(self.client.clone(), parsed).await?;
        Ok(Box::new(store))
    }
}

pub struct KeyValueOnlineStore {
    client: Arc<dyn KeyValueClient>,
    prefix: String,
    table_timeout: Duration,
    poll_interval: Duration,
    config: KeyValueConfig,
}

impl KeyValueOnlineStore {
    /**
     * Make sure the metadata table exists before handing out the store
     */
    pub async fn connect(
        client: Arc<dyn KeyValueClient>,
        mut config: KeyValueConfig,
    ) -> Result<Self, ProviderError> {
        let provider_type: ProviderType = KEY_VALUE_ONLINE.into();
        if config.prefix.is_empty() {
            config.prefix = DEFAULT_TABLE_PREFIX.to_string();
        }
        // Polling deadlines must fit an `Instant`
        let parse = |s: &str| {
            str_to_dur(s)
                .ok()
                .filter(|d| Instant::now().checked_add(*d).is_some())
                .ok_or_else(|| {
                    let e = DurationError(s.to_owned());
                    ProviderError::ConfigDeserialize(provider_type.clone(), e.to_string())
                })
        };
        let table_timeout = parse(&config.table_timeout)?;
        let metadata_timeout = parse(&config.metadata_timeout)?;
        let poll_interval = parse(&config.poll_interval)?;
        let store = Self {
            client,
            prefix: config.prefix.clone(),
            table_timeout,
            poll_interval,
            config,
        };
        store
            .create_metadata_table(metadata_timeout)
            .await
            .log()
            .map_err(|e| {
                ProviderError::ClientInitialization(provider_type.clone(), e.to_string())
            })?;
        Ok(store)
    }

    async fn create_metadata_table(&self, timeout: Duration) -> Result<(), ProviderError> {
        if self.client.describe_table(METADATA_TABLE).await?.is_some() {
            return self.wait_for_active(METADATA_TABLE, timeout).await;
        }
        info!("Metadata table not found, creating it");
        self.client.create_table(METADATA_TABLE).await?;
        self.wait_for_active(METADATA_TABLE, timeout).await
    }

    /**
     * Poll until the table is active, fails once `timeout` has elapsed
     */
    async fn wait_for_active(&self, name: &str, timeout: Duration) -> Result<(), ProviderError> {
        let wait_until = Instant::now().checked_add(timeout).ok_or_else(|| {
            ProviderError::ConfigDeserialize(
                KEY_VALUE_ONLINE.into(),
                format!("timeout {} is out of range", dur_to_string(timeout)),
            )
        })?;
        loop {
            let status = self.client.describe_table(name).await?;
            debug!("Table {}, status: {:?}", name, status);
            if status == Some(TableStatus::Active) {
                return Ok(());
            }
            if Instant::now() > wait_until {
                break;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        Err(ProviderError::Timeout(format!(
            "table {} not active after {}",
            name,
            dur_to_string(timeout)
        )))
    }

    /**
     * Create the backing table unless an earlier attempt already did, then wait for it
     */
    async fn create_active_table(&self, name: &str) -> Result<(), ProviderError> {
        if self.client.describe_table(name).await?.is_none() {
            self.client.create_table(name).await?;
        }
        self.wait_for_active(name, self.table_timeout).await
    }

    async fn get_value_type(&self, table: &str) -> Result<Option<ValueType>, ProviderError> {
        match self.client.get_item(METADATA_TABLE, table).await? {
            Some(item) => item
                .get(METADATA_VALUE_TYPE)
                .map(|t| ValueType::from_str(t))
                .transpose(),
            None => Ok(None),
        }
    }

    fn table(&self, name: String, value_type: ValueType) -> Box<dyn OnlineStoreTable> {
        Box::new(KeyValueOnlineTable {
            client: self.client.clone(),
            name,
            value_type,
        })
    }
}

#[async_trait]
impl Provider for KeyValueOnlineStore {
    fn provider_type(&self) -> ProviderType {
        KEY_VALUE_ONLINE.into()
    }

    fn config(&self) -> SerializedConfig {
        self.config.serialized()
    }

    async fn check_health(&self) -> Result<bool, ProviderError> {
        let tables = self.client.list_tables(1).await?;
        let first = tables.first().ok_or_else(|| {
            ProviderError::Connection(self.provider_type(), "no tables found".to_string())
        })?;
        self.client
            .scan(first, 1)
            .await
            .map_err(|e| ProviderError::Connection(self.provider_type(), e.to_string()))?;
        Ok(true)
    }

    fn into_online_store(self: Box<Self>) -> Result<Box<dyn OnlineStore>, ProviderError> {
        Ok(self)
    }
}

#[async_trait]
impl OnlineStore for KeyValueOnlineStore {
    async fn get_table(
        &self,
        feature: &str,
        variant: &str,
    ) -> Result<Box<dyn OnlineStoreTable>, ProviderError> {
        let name = table_name(&self.prefix, feature, variant);
        let value_type = self
            .get_value_type(&name)
            .await?
            .ok_or_else(|| ProviderError::table_not_found(feature, variant))?;
        Ok(self.table(name, value_type))
    }

    async fn create_table(
        &self,
        feature: &str,
        variant: &str,
        value_type: ValueType,
    ) -> Result<Box<dyn OnlineStoreTable>, ProviderError> {
        let name = table_name(&self.prefix, feature, variant);
        if self.get_value_type(&name).await?.is_some() {
            return Err(ProviderError::table_already_exists(feature, variant));
        }
        self.client
            .update_item(METADATA_TABLE, &name, METADATA_VALUE_TYPE, value_type.scalar())
            .await?;
        if let Err(e) = self.create_active_table(&name).await {
            // Drop the entry so the create can be retried
            self.client.delete_item(METADATA_TABLE, &name).await.log().ok();
            return Err(e);
        }
        debug!("Created table {} storing {:?}", name, value_type);
        Ok(self.table(name, value_type))
    }

    async fn delete_table(&self, feature: &str, variant: &str) -> Result<(), ProviderError> {
        let name = table_name(&self.prefix, feature, variant);
        self.client.delete_table(&name).await?;
        self.client.delete_item(METADATA_TABLE, &name).await
    }
}

struct KeyValueOnlineTable {
    client: Arc<dyn KeyValueClient>,
    name: String,
    value_type: ValueType,
}

#[async_trait]
impl OnlineStoreTable for KeyValueOnlineTable {
    async fn set(&self, entity: &str, value: Value) -> Result<(), ProviderError> {
        self.client
            .update_item(&self.name, entity, FEATURE_VALUE, &value.to_stored_string())
            .await
    }

    async fn get(&self, entity: &str) -> Result<Value, ProviderError> {
        let raw = self
            .client
            .get_item(&self.name, entity)
            .await?
            .and_then(|mut item| item.remove(FEATURE_VALUE))
            .ok_or_else(|| ProviderError::EntityNotFound(entity.to_string()))?;
        self.value_type.decode(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> KeyValueConfig {
        KeyValueConfig {
            prefix: String::new(),
            table_timeout: "50ms".to_string(),
            metadata_timeout: "50ms".to_string(),
            poll_interval: "1ms".to_string(),
        }
    }

    #[test]
    fn test_table_name() {
        assert_eq!(
            table_name("Featureform_table__", "avg fare!", "v1.2"),
            "Featureform_table____avgfare__v12"
        );
        assert_eq!(table_name("p", "a-b", "c/d"), "p__ab__cd");
    }

    #[tokio::test]
    async fn create_waits_for_active_table() {
        crate::tests::init_logger();
        let client = Arc::new(InMemoryKeyValueClient::with_activation_delay(3));
        let store = KeyValueOnlineStore::connect(client.clone(), fast_config())
            .await
            .unwrap();
        let table = store
            .create_table("fare", "v1", ValueType::Float32)
            .await
            .unwrap();
        table.set("trip_1", Value::Float32(12.5)).await.unwrap();
        assert_eq!(table.get("trip_1").await.unwrap(), Value::Float32(12.5));
        assert!(matches!(
            table.get("trip_2").await,
            Err(ProviderError::EntityNotFound(_))
        ));

        // The value type survives in the metadata table
        let table = store.get_table("fare", "v1").await.unwrap();
        assert_eq!(table.get("trip_1").await.unwrap(), Value::Float32(12.5));
        let metadata = client
            .get_item(METADATA_TABLE, "Featureform_table____fare__v1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(metadata.get(METADATA_VALUE_TYPE).unwrap(), "float32");

        assert!(matches!(
            store.create_table("fare", "v1", ValueType::Float32).await,
            Err(ProviderError::TableAlreadyExists { .. })
        ));
        assert!(store.check_health().await.unwrap());

        store.delete_table("fare", "v1").await.unwrap();
        assert!(matches!(
            store.get_table("fare", "v1").await,
            Err(ProviderError::TableNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn create_times_out() {
        let client = Arc::new(InMemoryKeyValueClient::default());
        let store = KeyValueOnlineStore::connect(client.clone(), fast_config())
            .await
            .unwrap();
        // Metadata is active now, tables created from here on never activate
        let slow = Arc::new(InMemoryKeyValueClient::with_activation_delay(u32::MAX));
        slow.create_table(METADATA_TABLE).await.unwrap();
        let result = KeyValueOnlineStore::connect(slow, fast_config()).await;
        assert!(matches!(
            result,
            Err(ProviderError::ClientInitialization(_, _))
        ));

        let never = Arc::new(InMemoryKeyValueClient::with_activation_delay(u32::MAX));
        let store_never = KeyValueOnlineStore {
            client: never.clone(),
            ..store
        };
        let result = store_never.create_table("fare", "v1", ValueType::Int).await;
        assert!(matches!(result, Err(ProviderError::Backend(_))));

        never.create_table("x").await.unwrap();
        let result = store_never.wait_for_active("x", Duration::from_millis(10)).await;
        assert!(matches!(result, Err(ProviderError::Timeout(_))));
    }

    #[tokio::test]
    async fn decode_failure_surfaces() {
        let client = Arc::new(InMemoryKeyValueClient::default());
        let store = KeyValueOnlineStore::connect(client.clone(), fast_config())
            .await
            .unwrap();
        let table = store.create_table("count", "v1", ValueType::Int).await.unwrap();
        table.set("a", Value::from("not a number")).await.unwrap();
        assert!(matches!(
            table.get("a").await,
            Err(ProviderError::ValueDecode { .. })
        ));
    }

    #[tokio::test]
    async fn factory_rejects_bad_config() {
        let factory = KeyValueFactory::new(Arc::new(InMemoryKeyValueClient::default()));
        let result = factory.create(&SerializedConfig::default()).await;
        assert!(matches!(result, Err(ProviderError::ConfigDeserialize(_, _))));

        let bad = KeyValueConfig {
            poll_interval: "soon".to_string(),
            ..KeyValueConfig::default()
        };
        let result = factory.create(&bad.serialized()).await;
        assert!(matches!(result, Err(ProviderError::ConfigDeserialize(_, _))));

        let store = factory.create(&KeyValueConfig::default().serialized()).await.unwrap();
        assert!(store.into_online_store().is_ok());
    }

    #[tokio::test]
    async fn factory_rejects_out_of_range_durations() {
        let factory = KeyValueFactory::new(Arc::new(InMemoryKeyValueClient::default()));
        let huge_metadata = KeyValueConfig {
            metadata_timeout: "18446744073709551615s".to_string(),
            ..fast_config()
        };
        let result = factory.create(&huge_metadata.serialized()).await;
        assert!(matches!(result, Err(ProviderError::ConfigDeserialize(_, _))));

        let huge_table = KeyValueConfig {
            table_timeout: "999999999999999999h".to_string(),
            ..fast_config()
        };
        let result = factory.create(&huge_table.serialized()).await;
        assert!(matches!(result, Err(ProviderError::ConfigDeserialize(_, _))));

        let client = Arc::new(InMemoryKeyValueClient::with_activation_delay(u32::MAX));
        let store =
            KeyValueOnlineStore::connect(Arc::new(InMemoryKeyValueClient::default()), fast_config())
                .await
                .unwrap();
        let store = KeyValueOnlineStore {
            client: client.clone(),
            ..store
        };
        client.create_table("x").await.unwrap();
        assert!(matches!(
            store.wait_for_active("x", Duration::MAX).await,
            Err(ProviderError::ConfigDeserialize(_, _))
        ));
    }

    async fn activate(client: &InMemoryKeyValueClient, name: &str) {
        while client.describe_table(name).await.unwrap() != Some(TableStatus::Active) {}
    }

    #[tokio::test]
    async fn create_can_be_retried_after_timeout() {
        let client = Arc::new(InMemoryKeyValueClient::with_activation_delay(10_000));
        client.create_table(METADATA_TABLE).await.unwrap();
        activate(&client, METADATA_TABLE).await;
        let config = KeyValueConfig {
            table_timeout: "5ms".to_string(),
            ..fast_config()
        };
        let store = KeyValueOnlineStore::connect(client.clone(), config)
            .await
            .unwrap();

        assert!(matches!(
            store.create_table("fare", "v1", ValueType::Int).await,
            Err(ProviderError::Timeout(_))
        ));
        let name = table_name(DEFAULT_TABLE_PREFIX, "fare", "v1");
        assert!(client
            .get_item(METADATA_TABLE, &name)
            .await
            .unwrap()
            .is_none());
        assert!(matches!(
            store.get_table("fare", "v1").await,
            Err(ProviderError::TableNotFound { .. })
        ));

        // The backing table from the first attempt is picked up once active
        activate(&client, &name).await;
        let table = store
            .create_table("fare", "v1", ValueType::Int)
            .await
            .unwrap();
        table.set("trip_1", Value::Int(3)).await.unwrap();
        let table = store.get_table("fare", "v1").await.unwrap();
        assert_eq!(table.get("trip_1").await.unwrap(), Value::Int(3));
    }

    #[tokio::test]
    async fn health_needs_a_table() {
        let client = Arc::new(InMemoryKeyValueClient::default());
        let store = KeyValueOnlineStore::connect(client.clone(), fast_config())
            .await
            .unwrap();
        client.delete_table(METADATA_TABLE).await.unwrap();
        assert!(matches!(
            store.check_health().await,
            Err(ProviderError::Connection(_, _))
        ));
    }
}
