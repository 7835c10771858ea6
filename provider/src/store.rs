use async_trait::async_trait;

use crate::{
    GenericRecord, MaterializationId, ProviderError, ProviderType, ResourceId, ResourceRecord,
    ResourceSchema, SerializedConfig, TableSchema, TrainingSetDef, TrainingSetRow,
    TransformationConfig, Value, ValueType,
};

/**
 * A live connection to one storage backend
 */
#[async_trait]
pub trait Provider: Send + Sync {
    fn provider_type(&self) -> ProviderType;

    fn config(&self) -> SerializedConfig;

    /**
     * Returns `Ok(true)` when the backend is reachable and usable
     */
    async fn check_health(&self) -> Result<bool, ProviderError>;

    async fn close(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /**
     * Use the connection as an offline store, fails if the backend can't host offline data
     */
    fn into_offline_store(self: Box<Self>) -> Result<Box<dyn OfflineStore>, ProviderError> {
        Err(ProviderError::NotOfflineStore(self.provider_type()))
    }

    /**
     * Use the connection as an online store, fails if the backend can't serve online data
     */
    fn into_online_store(self: Box<Self>) -> Result<Box<dyn OnlineStore>, ProviderError> {
        Err(ProviderError::NotOnlineStore(self.provider_type()))
    }
}

#[async_trait]
pub trait OfflineTable: Send + Sync {
    async fn write(&self, record: ResourceRecord) -> Result<(), ProviderError>;

    async fn write_batch(&self, records: Vec<ResourceRecord>) -> Result<(), ProviderError> {
        for record in records {
            self.write(record).await?;
        }
        Ok(())
    }

    async fn num_rows(&self) -> Result<u64, ProviderError>;
}

#[async_trait]
pub trait GenericTableIterator: Send {
    fn columns(&self) -> Vec<String>;

    async fn next(&mut self) -> Result<Option<GenericRecord>, ProviderError>;
}

#[async_trait]
pub trait PrimaryTable: Send + Sync {
    fn get_name(&self) -> String;

    async fn write(&self, record: GenericRecord) -> Result<(), ProviderError>;

    async fn num_rows(&self) -> Result<u64, ProviderError>;

    /**
     * Iterate the first `n` rows
     */
    async fn iterate_segment(&self, n: u64)
        -> Result<Box<dyn GenericTableIterator>, ProviderError>;
}

/// Result table of a transformation, read like a primary table
pub trait TransformationTable: PrimaryTable {}

#[async_trait]
pub trait FeatureIterator: Send {
    async fn next(&mut self) -> Result<Option<ResourceRecord>, ProviderError>;
}

/**
 * Point-in-time snapshot of a feature, one row per entity
 */
#[async_trait]
pub trait Materialization: Send + Sync {
    fn id(&self) -> MaterializationId;

    async fn num_rows(&self) -> Result<u64, ProviderError>;

    /**
     * Iterate rows in `[begin, end)`, bounds are clamped to the row count
     */
    async fn iterate_segment(
        &self,
        begin: u64,
        end: u64,
    ) -> Result<Box<dyn FeatureIterator>, ProviderError>;
}

#[async_trait]
pub trait TrainingSetIterator: Send {
    async fn next(&mut self) -> Result<Option<TrainingSetRow>, ProviderError>;
}

#[async_trait]
pub trait OfflineStore: Provider {
    async fn create_resource_table(
        &self,
        id: &ResourceId,
        schema: &TableSchema,
    ) -> Result<Box<dyn OfflineTable>, ProviderError>;

    async fn get_resource_table(&self, id: &ResourceId)
        -> Result<Box<dyn OfflineTable>, ProviderError>;

    async fn create_primary_table(
        &self,
        id: &ResourceId,
        schema: &TableSchema,
    ) -> Result<Box<dyn PrimaryTable>, ProviderError>;

    async fn get_primary_table(&self, id: &ResourceId)
        -> Result<Box<dyn PrimaryTable>, ProviderError>;

    /**
     * Register an existing external table as the resource table of `id`
     */
    async fn register_resource_from_source_table(
        &self,
        id: &ResourceId,
        schema: &ResourceSchema,
    ) -> Result<Box<dyn OfflineTable>, ProviderError>;

    /**
     * Register an existing external table, unmodified, as the primary table of `id`
     */
    async fn register_primary_from_source_table(
        &self,
        id: &ResourceId,
        source_name: &str,
    ) -> Result<Box<dyn PrimaryTable>, ProviderError>;

    async fn create_transformation(
        &self,
        config: &TransformationConfig,
    ) -> Result<(), ProviderError>;

    async fn update_transformation(
        &self,
        config: &TransformationConfig,
    ) -> Result<(), ProviderError>;

    async fn get_transformation_table(
        &self,
        id: &ResourceId,
    ) -> Result<Box<dyn TransformationTable>, ProviderError>;

    async fn create_materialization(
        &self,
        id: &ResourceId,
    ) -> Result<Box<dyn Materialization>, ProviderError>;

    async fn get_materialization(
        &self,
        id: &MaterializationId,
    ) -> Result<Box<dyn Materialization>, ProviderError>;

    async fn update_materialization(
        &self,
        id: &ResourceId,
    ) -> Result<Box<dyn Materialization>, ProviderError>;

    async fn delete_materialization(&self, id: &MaterializationId) -> Result<(), ProviderError>;

    async fn create_training_set(&self, def: &TrainingSetDef) -> Result<(), ProviderError>;

    async fn update_training_set(&self, def: &TrainingSetDef) -> Result<(), ProviderError>;

    async fn get_training_set(
        &self,
        id: &ResourceId,
    ) -> Result<Box<dyn TrainingSetIterator>, ProviderError>;
}

#[async_trait]
pub trait OnlineStoreTable: Send + Sync {
    async fn set(&self, entity: &str, value: Value) -> Result<(), ProviderError>;

    async fn get(&self, entity: &str) -> Result<Value, ProviderError>;
}

#[async_trait]
pub trait OnlineStore: Provider {
    async fn get_table(
        &self,
        feature: &str,
        variant: &str,
    ) -> Result<Box<dyn OnlineStoreTable>, ProviderError>;

    async fn create_table(
        &self,
        feature: &str,
        variant: &str,
        value_type: ValueType,
    ) -> Result<Box<dyn OnlineStoreTable>, ProviderError>;

    async fn delete_table(&self, feature: &str, variant: &str) -> Result<(), ProviderError>;
}

/**
 * Iterator over rows already held in memory
 */
pub struct VecIterator<T> {
    rows: std::vec::IntoIter<T>,
}

impl<T> VecIterator<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }

    pub fn next_row(&mut self) -> Option<T> {
        self.rows.next()
    }
}

#[async_trait]
impl FeatureIterator for VecIterator<ResourceRecord> {
    async fn next(&mut self) -> Result<Option<ResourceRecord>, ProviderError> {
        Ok(self.next_row())
    }
}

#[async_trait]
impl TrainingSetIterator for VecIterator<TrainingSetRow> {
    async fn next(&mut self) -> Result<Option<TrainingSetRow>, ProviderError> {
        Ok(self.next_row())
    }
}
