//! Offline store doubles for exercising job runners without a backend

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;

use crate::{
    provider_type::MOCK_OFFLINE, FeatureIterator, GenericRecord, GenericTableIterator,
    Materialization, MaterializationId, OfflineStore, OfflineTable, PrimaryTable, Provider,
    ProviderError, ProviderFactory, ProviderType, ResourceId, ResourceRecord, ResourceSchema,
    SerializedConfig, TableSchema, TrainingSetDef, TrainingSetIterator, TrainingSetRow,
    TransformationConfig, TransformationTable, VecIterator,
};

/**
 * Hands out `MockOfflineStore`s sharing one call counter, the config is ignored
 */
#[derive(Clone, Debug, Default)]
pub struct MockOfflineFactory {
    failure: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl MockOfflineFactory {
    /**
     * Every store operation fails with `ProviderError::Backend(message)`
     */
    pub fn failing<T>(message: T) -> Self
    where
        T: ToString,
    {
        Self {
            failure: Some(message.to_string()),
            calls: Default::default(),
        }
    }

    /// Number of store operations invoked so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderFactory for MockOfflineFactory {
    async fn create(&self, config: &SerializedConfig) -> Result<Box<dyn Provider>, ProviderError> {
        Ok(Box::new(MockOfflineStore {
            failure: self.failure.clone(),
            calls: self.calls.clone(),
            config: config.clone(),
        }))
    }
}

pub struct MockOfflineStore {
    failure: Option<String>,
    calls: Arc<AtomicUsize>,
    config: SerializedConfig,
}

impl MockOfflineStore {
    fn call(&self) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(ProviderError::Backend(message.clone())),
            None => Ok(()),
        }
    }

    fn table(&self, id: &ResourceId) -> Result<MockTable, ProviderError> {
        self.call()?;
        Ok(MockTable {
            name: id.name.clone(),
        })
    }

    fn materialization(
        &self,
        id: MaterializationId,
    ) -> Result<Box<dyn Materialization>, ProviderError> {
        self.call()?;
        Ok(Box::new(MockMaterialization { id }))
    }
}

#[async_trait]
impl Provider for MockOfflineStore {
    fn provider_type(&self) -> ProviderType {
        MOCK_OFFLINE.into()
    }

    fn config(&self) -> SerializedConfig {
        self.config.clone()
    }

    async fn check_health(&self) -> Result<bool, ProviderError> {
        self.call().map(|_| true)
    }

    fn into_offline_store(self: Box<Self>) -> Result<Box<dyn OfflineStore>, ProviderError> {
        Ok(self)
    }
}

#[async_trait]
impl OfflineStore for MockOfflineStore {
    async fn create_resource_table(
        &self,
        id: &ResourceId,
        _schema: &TableSchema,
    ) -> Result<Box<dyn OfflineTable>, ProviderError> {
        Ok(Box::new(self.table(id)?))
    }

    async fn get_resource_table(
        &self,
        id: &ResourceId,
    ) -> Result<Box<dyn OfflineTable>, ProviderError> {
        Ok(Box::new(self.table(id)?))
    }

    async fn create_primary_table(
        &self,
        id: &ResourceId,
        _schema: &TableSchema,
    ) -> Result<Box<dyn PrimaryTable>, ProviderError> {
        Ok(Box::new(self.table(id)?))
    }

    async fn get_primary_table(
        &self,
        id: &ResourceId,
    ) -> Result<Box<dyn PrimaryTable>, ProviderError> {
        Ok(Box::new(self.table(id)?))
    }

    async fn register_resource_from_source_table(
        &self,
        id: &ResourceId,
        _schema: &ResourceSchema,
    ) -> Result<Box<dyn OfflineTable>, ProviderError> {
        Ok(Box::new(self.table(id)?))
    }

    async fn register_primary_from_source_table(
        &self,
        id: &ResourceId,
        _source_name: &str,
    ) -> Result<Box<dyn PrimaryTable>, ProviderError> {
        Ok(Box::new(self.table(id)?))
    }

    async fn create_transformation(
        &self,
        _config: &TransformationConfig,
    ) -> Result<(), ProviderError> {
        self.call()
    }

    async fn update_transformation(
        &self,
        _config: &TransformationConfig,
    ) -> Result<(), ProviderError> {
        self.call()
    }

    async fn get_transformation_table(
        &self,
        id: &ResourceId,
    ) -> Result<Box<dyn TransformationTable>, ProviderError> {
        Ok(Box::new(self.table(id)?))
    }

    async fn create_materialization(
        &self,
        id: &ResourceId,
    ) -> Result<Box<dyn Materialization>, ProviderError> {
        self.materialization(MaterializationId::for_resource(id))
    }

    async fn get_materialization(
        &self,
        id: &MaterializationId,
    ) -> Result<Box<dyn Materialization>, ProviderError> {
        self.materialization(id.clone())
    }

    async fn update_materialization(
        &self,
        id: &ResourceId,
    ) -> Result<Box<dyn Materialization>, ProviderError> {
        self.materialization(MaterializationId::for_resource(id))
    }

    async fn delete_materialization(&self, _id: &MaterializationId) -> Result<(), ProviderError> {
        self.call()
    }

    async fn create_training_set(&self, _def: &TrainingSetDef) -> Result<(), ProviderError> {
        self.call()
    }

    async fn update_training_set(&self, _def: &TrainingSetDef) -> Result<(), ProviderError> {
        self.call()
    }

    async fn get_training_set(
        &self,
        _id: &ResourceId,
    ) -> Result<Box<dyn TrainingSetIterator>, ProviderError> {
        self.call()?;
        Ok(Box::new(VecIterator::<TrainingSetRow>::new(vec![])))
    }
}

/// Table that accepts writes and holds nothing
struct MockTable {
    name: String,
}

#[async_trait]
impl OfflineTable for MockTable {
    async fn write(&self, _record: ResourceRecord) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn num_rows(&self) -> Result<u64, ProviderError> {
        Ok(0)
    }
}

#[async_trait]
impl PrimaryTable for MockTable {
    fn get_name(&self) -> String {
        self.name.clone()
    }

    async fn write(&self, _record: GenericRecord) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn num_rows(&self) -> Result<u64, ProviderError> {
        Ok(0)
    }

    async fn iterate_segment(
        &self,
        _n: u64,
    ) -> Result<Box<dyn GenericTableIterator>, ProviderError> {
        Ok(Box::new(EmptyIterator))
    }
}

impl TransformationTable for MockTable {}

struct EmptyIterator;

#[async_trait]
impl GenericTableIterator for EmptyIterator {
    fn columns(&self) -> Vec<String> {
        vec![]
    }

    async fn next(&mut self) -> Result<Option<GenericRecord>, ProviderError> {
        Ok(None)
    }
}

struct MockMaterialization {
    id: MaterializationId,
}

#[async_trait]
impl Materialization for MockMaterialization {
    fn id(&self) -> MaterializationId {
        self.id.clone()
    }

    async fn num_rows(&self) -> Result<u64, ProviderError> {
        Ok(0)
    }

    async fn iterate_segment(
        &self,
        _begin: u64,
        _end: u64,
    ) -> Result<Box<dyn FeatureIterator>, ProviderError> {
        Ok(Box::new(VecIterator::<ResourceRecord>::new(vec![])))
    }
}
