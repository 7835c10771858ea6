use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    epoch, provider_type::MEMORY_OFFLINE, FeatureIterator, GenericRecord, GenericTableIterator,
    Materialization, MaterializationId, OfflineResourceType, OfflineStore, OfflineTable,
    PrimaryTable, Provider, ProviderConfig, ProviderError, ProviderFactory, ProviderType,
    ResourceId, ResourceRecord, ResourceSchema, SerializedConfig, TableSchema, TrainingSetDef,
    TrainingSetIterator, TrainingSetRow, TransformationConfig, TransformationTable, Value,
    VecIterator,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryOfflineConfig {
    /// Label used in log messages
    #[serde(default)]
    pub name: String,
}

impl ProviderConfig for MemoryOfflineConfig {}

#[derive(Clone, Debug)]
struct PrimaryTableData {
    name: String,
    schema: TableSchema,
    rows: Vec<GenericRecord>,
}

#[derive(Clone, Debug)]
enum ResourceTableData {
    Owned(Vec<ResourceRecord>),
    /// Registered external table, rows are read through the column mapping
    Source(ResourceSchema),
}

#[derive(Debug, Default)]
struct MemoryState {
    resource_tables: HashMap<ResourceId, ResourceTableData>,
    primary_tables: HashMap<ResourceId, PrimaryTableData>,
    source_tables: HashMap<String, PrimaryTableData>,
    materializations: HashMap<MaterializationId, Arc<Vec<ResourceRecord>>>,
    training_sets: HashMap<ResourceId, Vec<TrainingSetRow>>,
}

impl MemoryState {
    /**
     * Source table registered as the transformation `id`
     */
    fn registered_transformation(&self, id: &ResourceId) -> Option<&PrimaryTableData> {
        if id.resource_type == OfflineResourceType::Transformation {
            self.primary_tables.get(id)
        } else {
            None
        }
    }

    fn has_resource_table(&self, id: &ResourceId) -> bool {
        self.resource_tables.contains_key(id) || self.registered_transformation(id).is_some()
    }

    fn num_rows(&self, id: &ResourceId) -> Result<u64, ProviderError> {
        match self.registered_transformation(id) {
            Some(table) => Ok(table.rows.len() as u64),
            None => Ok(self.resource_records(id)?.len() as u64),
        }
    }

    fn resource_records(&self, id: &ResourceId) -> Result<Vec<ResourceRecord>, ProviderError> {
        match self.resource_tables.get(id) {
            Some(ResourceTableData::Owned(records)) => Ok(records.clone()),
            Some(ResourceTableData::Source(schema)) => self.source_records(schema),
            None => Err(ProviderError::DatasetNotFound(id.to_string())),
        }
    }

    fn source_records(
        &self,
        schema: &ResourceSchema,
    ) -> Result<Vec<ResourceRecord>, ProviderError> {
        let source = self
            .source_tables
            .get(&schema.source_table)
            .ok_or_else(|| ProviderError::DatasetNotFound(schema.source_table.clone()))?;
        let column = |name: &str| {
            source.schema.column_index(name).ok_or_else(|| {
                ProviderError::InvalidDefinition(format!(
                    "column '{}' not found in source table {}",
                    name, schema.source_table
                ))
            })
        };
        let entity_idx = column(&schema.entity)?;
        let value_idx = column(&schema.value)?;
        let ts_idx = if schema.ts.is_empty() {
            None
        } else {
            Some(column(&schema.ts)?)
        };
        source
            .rows
            .iter()
            .map(|row| {
                let ts = match ts_idx.and_then(|i| row.get(i)) {
                    Some(Value::Timestamp(ts)) => *ts,
                    Some(other) => {
                        return Err(ProviderError::InvalidDefinition(format!(
                            "timestamp column '{}' holds {:?}",
                            schema.ts, other
                        )))
                    }
                    None => epoch(),
                };
                Ok(ResourceRecord {
                    entity: row
                        .get(entity_idx)
                        .map(Value::to_stored_string)
                        .unwrap_or_default(),
                    value: row.get(value_idx).cloned().unwrap_or_default(),
                    ts,
                })
            })
            .collect()
    }
}

/**
 * Latest record of every entity, later writes win on equal timestamps
 */
fn latest_per_entity(records: Vec<ResourceRecord>) -> Vec<ResourceRecord> {
    let mut latest: HashMap<String, ResourceRecord> = HashMap::new();
    for record in records {
        match latest.get(&record.entity) {
            Some(existing) if existing.ts > record.ts => {}
            _ => {
                latest.insert(record.entity.clone(), record);
            }
        }
    }
    let mut rows: Vec<ResourceRecord> = latest.into_values().collect();
    rows.sort_by(|a, b| a.entity.cmp(&b.entity));
    rows
}

/**
 * In-process offline backend, every store created from it shares its tables
 */
#[derive(Clone, Debug, Default)]
pub struct MemoryOfflineBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryOfflineBackend {
    /**
     * Seed a table that exists outside of the feature store
     */
    pub fn add_source_table<T>(
        &self,
        name: T,
        schema: TableSchema,
        rows: Vec<GenericRecord>,
    ) -> Result<(), ProviderError>
    where
        T: AsRef<str>,
    {
        let name = name.as_ref().to_string();
        self.state.lock()?.source_tables.insert(
            name.clone(),
            PrimaryTableData { name, schema, rows },
        );
        Ok(())
    }

    pub fn connect(&self, config: &SerializedConfig) -> Result<MemoryOfflineStore, ProviderError> {
        let parsed = MemoryOfflineConfig::parse_or_default(&MEMORY_OFFLINE.into(), config)?;
        debug!("Connected to memory offline store '{}'", parsed.name);
        Ok(MemoryOfflineStore {
            state: self.state.clone(),
            config: config.clone(),
        })
    }
}

#[async_trait]
impl ProviderFactory for MemoryOfflineBackend {
    async fn create(&self, config: &SerializedConfig) -> Result<Box<dyn Provider>, ProviderError> {
        Ok(Box::new(self.connect(config)?))
    }
}

pub struct MemoryOfflineStore {
    state: Arc<Mutex<MemoryState>>,
    config: SerializedConfig,
}

#[async_trait]
impl Provider for MemoryOfflineStore {
    fn provider_type(&self) -> ProviderType {
        MEMORY_OFFLINE.into()
    }

    fn config(&self) -> SerializedConfig {
        self.config.clone()
    }

    async fn check_health(&self) -> Result<bool, ProviderError> {
        self.state
            .lock()
            .map(|_| true)
            .map_err(ProviderError::from)
    }

    fn into_offline_store(self: Box<Self>) -> Result<Box<dyn OfflineStore>, ProviderError> {
        Ok(self)
    }
}

impl MemoryOfflineStore {
    fn resource_table(&self, id: &ResourceId) -> Box<dyn OfflineTable> {
        Box::new(MemoryOfflineTable {
            id: id.clone(),
            state: self.state.clone(),
        })
    }

    fn primary_table(&self, id: &ResourceId, name: String) -> MemoryPrimaryTable {
        MemoryPrimaryTable {
            id: id.clone(),
            name,
            state: self.state.clone(),
        }
    }

    fn materialize(
        &self,
        id: &ResourceId,
        replace: bool,
    ) -> Result<Box<dyn Materialization>, ProviderError> {
        id.check(&[OfflineResourceType::Feature])?;
        let materialization_id = MaterializationId::for_resource(id);
        let mut state = self.state.lock()?;
        if !replace && state.materializations.contains_key(&materialization_id) {
            return Err(ProviderError::DatasetAlreadyExists(materialization_id.to_string()));
        }
        let rows = Arc::new(latest_per_entity(state.resource_records(id)?));
        debug!("Materialized {} with {} rows", materialization_id, rows.len());
        state
            .materializations
            .insert(materialization_id.clone(), rows.clone());
        Ok(Box::new(MemoryMaterialization {
            id: materialization_id,
            rows,
        }))
    }

    fn build_training_set(&self, def: &TrainingSetDef, replace: bool) -> Result<(), ProviderError> {
        def.check()?;
        let mut state = self.state.lock()?;
        if !replace && state.training_sets.contains_key(&def.id) {
            return Err(ProviderError::DatasetAlreadyExists(def.id.to_string()));
        }
        let mut labels = state.resource_records(&def.label)?;
        labels.sort_by(|a, b| a.ts.cmp(&b.ts));
        let features = def
            .features
            .iter()
            .map(|f| state.resource_records(f))
            .collect::<Result<Vec<_>, _>>()?;
        let rows: Vec<TrainingSetRow> = labels
            .into_iter()
            .map(|label| TrainingSetRow {
                features: features
                    .iter()
                    .map(|records| {
                        records
                            .iter()
                            .filter(|r| r.entity == label.entity && r.ts <= label.ts)
                            .fold(None::<&ResourceRecord>, |acc, r| match acc {
                                Some(a) if a.ts > r.ts => Some(a),
                                _ => Some(r),
                            })
                            .map(|r| r.value.clone())
                            .unwrap_or_default()
                    })
                    .collect(),
                label: label.value,
            })
            .collect();
        debug!("Built training set {} with {} rows", def.id, rows.len());
        state.training_sets.insert(def.id.clone(), rows);
        Ok(())
    }
}

#[async_trait]
impl OfflineStore for MemoryOfflineStore {
    async fn create_resource_table(
        &self,
        id: &ResourceId,
        _schema: &TableSchema,
    ) -> Result<Box<dyn OfflineTable>, ProviderError> {
        id.check(&[OfflineResourceType::Feature, OfflineResourceType::Label])?;
        let mut state = self.state.lock()?;
        if state.resource_tables.contains_key(id) {
            return Err(ProviderError::DatasetAlreadyExists(id.to_string()));
        }
        state
            .resource_tables
            .insert(id.clone(), ResourceTableData::Owned(vec![]));
        Ok(self.resource_table(id))
    }

    async fn get_resource_table(
        &self,
        id: &ResourceId,
    ) -> Result<Box<dyn OfflineTable>, ProviderError> {
        if !self.state.lock()?.has_resource_table(id) {
            return Err(ProviderError::DatasetNotFound(id.to_string()));
        }
        Ok(self.resource_table(id))
    }

    async fn create_primary_table(
        &self,
        id: &ResourceId,
        schema: &TableSchema,
    ) -> Result<Box<dyn PrimaryTable>, ProviderError> {
        let mut state = self.state.lock()?;
        if state.primary_tables.contains_key(id) {
            return Err(ProviderError::DatasetAlreadyExists(id.to_string()));
        }
        let name = format!("featureform_primary__{}__{}", id.name, id.variant);
        state.primary_tables.insert(
            id.clone(),
            PrimaryTableData {
                name: name.clone(),
                schema: schema.clone(),
                rows: vec![],
            },
        );
        Ok(Box::new(self.primary_table(id, name)))
    }

    async fn get_primary_table(
        &self,
        id: &ResourceId,
    ) -> Result<Box<dyn PrimaryTable>, ProviderError> {
        let name = self
            .state
            .lock()?
            .primary_tables
            .get(id)
            .map(|t| t.name.clone())
            .ok_or_else(|| ProviderError::DatasetNotFound(id.to_string()))?;
        Ok(Box::new(self.primary_table(id, name)))
    }

    async fn register_resource_from_source_table(
        &self,
        id: &ResourceId,
        schema: &ResourceSchema,
    ) -> Result<Box<dyn OfflineTable>, ProviderError> {
        let mut state = self.state.lock()?;
        if state.has_resource_table(id) {
            return Err(ProviderError::DatasetAlreadyExists(id.to_string()));
        }
        let source = state
            .source_tables
            .get(&schema.source_table)
            .cloned()
            .ok_or_else(|| ProviderError::DatasetNotFound(schema.source_table.clone()))?;
        if id.resource_type == OfflineResourceType::Transformation {
            // Served as is through `get_transformation_table`
            debug!("Registered {} as transformation over {}", id, source.name);
            state.primary_tables.insert(id.clone(), source);
        } else {
            state
                .resource_tables
                .insert(id.clone(), ResourceTableData::Source(schema.clone()));
        }
        Ok(self.resource_table(id))
    }

    async fn register_primary_from_source_table(
        &self,
        id: &ResourceId,
        source_name: &str,
    ) -> Result<Box<dyn PrimaryTable>, ProviderError> {
        let mut state = self.state.lock()?;
        if state.primary_tables.contains_key(id) {
            return Err(ProviderError::DatasetAlreadyExists(id.to_string()));
        }
        let source = state
            .source_tables
            .get(source_name)
            .cloned()
            .ok_or_else(|| ProviderError::DatasetNotFound(source_name.to_string()))?;
        state.primary_tables.insert(id.clone(), source);
        Ok(Box::new(self.primary_table(id, source_name.to_string())))
    }

    async fn create_transformation(
        &self,
        config: &TransformationConfig,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported(format!(
            "Transformation {}",
            config.target_table_id
        )))
    }

    async fn update_transformation(
        &self,
        config: &TransformationConfig,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported(format!(
            "Transformation {}",
            config.target_table_id
        )))
    }

    async fn get_transformation_table(
        &self,
        id: &ResourceId,
    ) -> Result<Box<dyn TransformationTable>, ProviderError> {
        id.check(&[OfflineResourceType::Transformation])?;
        let name = self
            .state
            .lock()?
            .primary_tables
            .get(id)
            .map(|t| t.name.clone())
            .ok_or_else(|| ProviderError::DatasetNotFound(id.to_string()))?;
        Ok(Box::new(self.primary_table(id, name)))
    }

    async fn create_materialization(
        &self,
        id: &ResourceId,
    ) -> Result<Box<dyn Materialization>, ProviderError> {
        self.materialize(id, false)
    }

    async fn get_materialization(
        &self,
        id: &MaterializationId,
    ) -> Result<Box<dyn Materialization>, ProviderError> {
        let rows = self
            .state
            .lock()?
            .materializations
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::MaterializationNotFound(id.clone()))?;
        Ok(Box::new(MemoryMaterialization {
            id: id.clone(),
            rows,
        }))
    }

    async fn update_materialization(
        &self,
        id: &ResourceId,
    ) -> Result<Box<dyn Materialization>, ProviderError> {
        self.materialize(id, true)
    }

    async fn delete_materialization(&self, id: &MaterializationId) -> Result<(), ProviderError> {
        self.state
            .lock()?
            .materializations
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ProviderError::MaterializationNotFound(id.clone()))
    }

    async fn create_training_set(&self, def: &TrainingSetDef) -> Result<(), ProviderError> {
        self.build_training_set(def, false)
    }

    async fn update_training_set(&self, def: &TrainingSetDef) -> Result<(), ProviderError> {
        self.build_training_set(def, true)
    }

    async fn get_training_set(
        &self,
        id: &ResourceId,
    ) -> Result<Box<dyn TrainingSetIterator>, ProviderError> {
        let rows = self
            .state
            .lock()?
            .training_sets
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::DatasetNotFound(id.to_string()))?;
        Ok(Box::new(VecIterator::new(rows)))
    }
}

struct MemoryOfflineTable {
    id: ResourceId,
    state: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl OfflineTable for MemoryOfflineTable {
    async fn write(&self, record: ResourceRecord) -> Result<(), ProviderError> {
        let mut state = self.state.lock()?;
        if state.registered_transformation(&self.id).is_some() {
            return Err(ProviderError::Unsupported(format!(
                "Writing to registered transformation {}",
                self.id
            )));
        }
        match state.resource_tables.get_mut(&self.id) {
            Some(ResourceTableData::Owned(records)) => {
                records.push(record);
                Ok(())
            }
            Some(ResourceTableData::Source(_)) => Err(ProviderError::Unsupported(format!(
                "Writing to registered source table {}",
                self.id
            ))),
            None => Err(ProviderError::DatasetNotFound(self.id.to_string())),
        }
    }

    async fn num_rows(&self) -> Result<u64, ProviderError> {
        self.state.lock()?.num_rows(&self.id)
    }
}

struct MemoryPrimaryTable {
    id: ResourceId,
    name: String,
    state: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl PrimaryTable for MemoryPrimaryTable {
    fn get_name(&self) -> String {
        self.name.clone()
    }

    async fn write(&self, record: GenericRecord) -> Result<(), ProviderError> {
        let mut state = self.state.lock()?;
        let table = state
            .primary_tables
            .get_mut(&self.id)
            .ok_or_else(|| ProviderError::DatasetNotFound(self.id.to_string()))?;
        if record.len() != table.schema.columns.len() {
            return Err(ProviderError::InvalidDefinition(format!(
                "record has {} values, table {} has {} columns",
                record.len(),
                table.name,
                table.schema.columns.len()
            )));
        }
        table.rows.push(record);
        Ok(())
    }

    async fn num_rows(&self) -> Result<u64, ProviderError> {
        self.state
            .lock()?
            .primary_tables
            .get(&self.id)
            .map(|t| t.rows.len() as u64)
            .ok_or_else(|| ProviderError::DatasetNotFound(self.id.to_string()))
    }

    async fn iterate_segment(
        &self,
        n: u64,
    ) -> Result<Box<dyn GenericTableIterator>, ProviderError> {
        let state = self.state.lock()?;
        let table = state
            .primary_tables
            .get(&self.id)
            .ok_or_else(|| ProviderError::DatasetNotFound(self.id.to_string()))?;
        Ok(Box::new(MemoryGenericIterator {
            columns: table.schema.column_names(),
            rows: VecIterator::new(table.rows.iter().take(n as usize).cloned().collect()),
        }))
    }
}

impl TransformationTable for MemoryPrimaryTable {}

struct MemoryGenericIterator {
    columns: Vec<String>,
    rows: VecIterator<GenericRecord>,
}

#[async_trait]
impl GenericTableIterator for MemoryGenericIterator {
    fn columns(&self) -> Vec<String> {
        self.columns.clone()
    }

    async fn next(&mut self) -> Result<Option<GenericRecord>, ProviderError> {
        Ok(self.rows.next_row())
    }
}

struct MemoryMaterialization {
    id: MaterializationId,
    rows: Arc<Vec<ResourceRecord>>,
}

#[async_trait]
impl Materialization for MemoryMaterialization {
    fn id(&self) -> MaterializationId {
        self.id.clone()
    }

    async fn num_rows(&self) -> Result<u64, ProviderError> {
        Ok(self.rows.len() as u64)
    }

    async fn iterate_segment(
        &self,
        begin: u64,
        end: u64,
    ) -> Result<Box<dyn FeatureIterator>, ProviderError> {
        let end = (end as usize).min(self.rows.len());
        let begin = (begin as usize).min(end);
        Ok(Box::new(VecIterator::new(self.rows[begin..end].to_vec())))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{TableColumn, ValueType};

    fn feature(name: &str) -> ResourceId {
        ResourceId::new(name, "v1", OfflineResourceType::Feature)
    }

    async fn collect(mut it: Box<dyn FeatureIterator>) -> Vec<ResourceRecord> {
        let mut rows = vec![];
        while let Some(r) = it.next().await.unwrap() {
            rows.push(r);
        }
        rows
    }

    #[tokio::test]
    async fn materialization_keeps_latest_value() {
        let store = MemoryOfflineBackend::default()
            .connect(&SerializedConfig::default())
            .unwrap();
        let id = feature("avg_fare");
        let table = store
            .create_resource_table(&id, &TableSchema::default())
            .await
            .unwrap();
        table
            .write_batch(vec![
                ResourceRecord::new("a", Value::Int(1)).with_ts(Utc.timestamp_opt(10, 0).unwrap()),
                ResourceRecord::new("b", Value::Int(2)).with_ts(Utc.timestamp_opt(10, 0).unwrap()),
                ResourceRecord::new("a", Value::Int(3)).with_ts(Utc.timestamp_opt(20, 0).unwrap()),
                ResourceRecord::new("a", Value::Int(0)).with_ts(Utc.timestamp_opt(5, 0).unwrap()),
            ])
            .await
            .unwrap();
        assert_eq!(table.num_rows().await.unwrap(), 4);

        let mat = store.create_materialization(&id).await.unwrap();
        assert_eq!(mat.num_rows().await.unwrap(), 2);
        let rows = collect(mat.iterate_segment(0, 10).await.unwrap()).await;
        assert_eq!(
            rows.iter().map(|r| (r.entity.as_str(), r.value.clone())).collect::<Vec<_>>(),
            vec![("a", Value::Int(3)), ("b", Value::Int(2))]
        );
        assert_eq!(collect(mat.iterate_segment(1, 2).await.unwrap()).await.len(), 1);
        assert!(collect(mat.iterate_segment(5, 9).await.unwrap()).await.is_empty());

        assert!(matches!(
            store.create_materialization(&id).await,
            Err(ProviderError::DatasetAlreadyExists(_))
        ));
        store.delete_materialization(&mat.id()).await.unwrap();
        assert!(matches!(
            store.get_materialization(&mat.id()).await,
            Err(ProviderError::MaterializationNotFound(_))
        ));
    }

    #[tokio::test]
    async fn training_set_joins_point_in_time() {
        let store = MemoryOfflineBackend::default()
            .connect(&SerializedConfig::default())
            .unwrap();
        let f = feature("balance");
        let label = ResourceId::new("fraud", "v1", OfflineResourceType::Label);
        let ts = |s| Utc.timestamp_opt(s, 0).unwrap();
        let features = store
            .create_resource_table(&f, &TableSchema::default())
            .await
            .unwrap();
        features
            .write_batch(vec![
                ResourceRecord::new("u1", Value::Float64(10.0)).with_ts(ts(1)),
                ResourceRecord::new("u1", Value::Float64(20.0)).with_ts(ts(5)),
            ])
            .await
            .unwrap();
        let labels = store
            .create_resource_table(&label, &TableSchema::default())
            .await
            .unwrap();
        labels
            .write_batch(vec![
                ResourceRecord::new("u1", Value::Bool(true)).with_ts(ts(6)),
                ResourceRecord::new("u1", Value::Bool(false)).with_ts(ts(2)),
                ResourceRecord::new("u2", Value::Bool(false)).with_ts(ts(3)),
            ])
            .await
            .unwrap();
        let def = TrainingSetDef {
            id: ResourceId::new("ts", "v1", OfflineResourceType::TrainingSet),
            label,
            features: vec![f],
        };
        store.create_training_set(&def).await.unwrap();
        let mut it = store.get_training_set(&def.id).await.unwrap();
        let mut rows = vec![];
        while let Some(row) = it.next().await.unwrap() {
            rows.push(row);
        }
        assert_eq!(
            rows,
            vec![
                TrainingSetRow {
                    features: vec![Value::Float64(10.0)],
                    label: Value::Bool(false),
                },
                TrainingSetRow {
                    features: vec![Value::Nil],
                    label: Value::Bool(false),
                },
                TrainingSetRow {
                    features: vec![Value::Float64(20.0)],
                    label: Value::Bool(true),
                },
            ]
        );
        assert!(matches!(
            store.create_training_set(&def).await,
            Err(ProviderError::DatasetAlreadyExists(_))
        ));
        store.update_training_set(&def).await.unwrap();
    }

    #[tokio::test]
    async fn register_from_source_table() {
        let backend = MemoryOfflineBackend::default();
        let schema = TableSchema {
            columns: vec![
                TableColumn {
                    name: "user".to_string(),
                    value_type: ValueType::String,
                },
                TableColumn {
                    name: "amount".to_string(),
                    value_type: ValueType::Float64,
                },
            ],
        };
        backend
            .add_source_table(
                "transactions",
                schema,
                vec![
                    vec![Value::from("u1"), Value::Float64(1.5)],
                    vec![Value::from("u2"), Value::Float64(2.5)],
                ],
            )
            .unwrap();
        let store = backend.connect(&SerializedConfig::default()).unwrap();

        let primary = ResourceId::new("transactions", "v1", OfflineResourceType::Primary);
        let table = store
            .register_primary_from_source_table(&primary, "transactions")
            .await
            .unwrap();
        assert_eq!(table.get_name(), "transactions");
        assert_eq!(table.num_rows().await.unwrap(), 2);
        let mut it = table.iterate_segment(1).await.unwrap();
        assert_eq!(it.columns(), vec!["user", "amount"]);
        assert!(it.next().await.unwrap().is_some());
        assert!(it.next().await.unwrap().is_none());

        let resource = feature("amount");
        let mapped = store
            .register_resource_from_source_table(
                &resource,
                &ResourceSchema {
                    entity: "user".to_string(),
                    value: "amount".to_string(),
                    ts: String::new(),
                    source_table: "transactions".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(mapped.num_rows().await.unwrap(), 2);
        assert!(mapped.write(ResourceRecord::new("u3", Value::Nil)).await.is_err());

        let transformation =
            ResourceId::new("transactions", "v1", OfflineResourceType::Transformation);
        let schema = ResourceSchema {
            source_table: "transactions".to_string(),
            ..Default::default()
        };
        let registered = store
            .register_resource_from_source_table(&transformation, &schema)
            .await
            .unwrap();
        assert_eq!(registered.num_rows().await.unwrap(), 2);
        assert!(matches!(
            registered.write(ResourceRecord::new("u3", Value::Nil)).await,
            Err(ProviderError::Unsupported(_))
        ));
        let table = store.get_transformation_table(&transformation).await.unwrap();
        assert_eq!(table.get_name(), "transactions");
        assert_eq!(table.num_rows().await.unwrap(), 2);
        assert!(matches!(
            store
                .register_resource_from_source_table(&transformation, &schema)
                .await,
            Err(ProviderError::DatasetAlreadyExists(_))
        ));

        assert!(matches!(
            store
                .register_primary_from_source_table(&ResourceId::default(), "")
                .await,
            Err(ProviderError::DatasetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn malformed_config() {
        let result = MemoryOfflineBackend::default().connect(&b"{not json".to_vec().into());
        assert!(matches!(result, Err(ProviderError::ConfigDeserialize(_, _))));
    }
}
