use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ProviderError, Value, ValueType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfflineResourceType {
    #[serde(rename = "NONE")]
    None,
    #[serde(rename = "PRIMARY_SOURCE")]
    Primary,
    #[serde(rename = "TRANSFORMATION_SOURCE")]
    Transformation,
    #[serde(rename = "FEATURE")]
    Feature,
    #[serde(rename = "LABEL")]
    Label,
    #[serde(rename = "TRAINING_SET")]
    TrainingSet,
    #[serde(rename = "PROVIDER")]
    Provider,
    #[serde(rename = "ENTITY")]
    Entity,
    #[serde(rename = "MODEL")]
    Model,
    #[serde(rename = "USER")]
    User,
}

impl OfflineResourceType {
    pub fn get_name(&self) -> &'static str {
        match self {
            OfflineResourceType::None => "NONE",
            OfflineResourceType::Primary => "PRIMARY_SOURCE",
            OfflineResourceType::Transformation => "TRANSFORMATION_SOURCE",
            OfflineResourceType::Feature => "FEATURE",
            OfflineResourceType::Label => "LABEL",
            OfflineResourceType::TrainingSet => "TRAINING_SET",
            OfflineResourceType::Provider => "PROVIDER",
            OfflineResourceType::Entity => "ENTITY",
            OfflineResourceType::Model => "MODEL",
            OfflineResourceType::User => "USER",
        }
    }
}

impl Default for OfflineResourceType {
    fn default() -> Self {
        Self::None
    }
}

impl Display for OfflineResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get_name())
    }
}

/**
 * One versioned entity of the feature store catalog
 */
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    pub name: String,
    pub variant: String,
    pub resource_type: OfflineResourceType,
}

impl ResourceId {
    pub fn new<N, V>(name: N, variant: V, resource_type: OfflineResourceType) -> Self
    where
        N: AsRef<str>,
        V: AsRef<str>,
    {
        Self {
            name: name.as_ref().to_string(),
            variant: variant.as_ref().to_string(),
            resource_type,
        }
    }

    /**
     * Fails unless the id has one of the expected types
     */
    pub fn check(&self, expected: &[OfflineResourceType]) -> Result<(), ProviderError> {
        if expected.contains(&self.resource_type) {
            Ok(())
        } else {
            Err(ProviderError::InvalidResourceType(
                self.to_string(),
                expected
                    .iter()
                    .map(|t| t.get_name())
                    .collect::<Vec<_>>()
                    .join("|"),
            ))
        }
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} ({})", self.name, self.variant, self.resource_type)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterializationId(pub String);

impl MaterializationId {
    pub fn for_resource(id: &ResourceId) -> Self {
        Self(format!("Materialization/{}/{}", id.name, id.variant))
    }
}

impl Display for MaterializationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    pub name: String,
    pub value_type: ValueType,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Vec<TableColumn>,
}

impl TableSchema {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/**
 * Maps columns of an external source table onto entity/value/timestamp
 */
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSchema {
    pub entity: String,
    pub value: String,
    pub ts: String,
    pub source_table: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformationType {
    #[serde(rename = "SQL")]
    Sql,
    #[serde(rename = "DF")]
    Dataframe,
}

impl Default for TransformationType {
    fn default() -> Self {
        Self::Sql
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMapping {
    pub template: String,
    pub source: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationConfig {
    pub transformation_type: TransformationType,
    pub target_table_id: ResourceId,
    pub query: String,
    pub source_mapping: Vec<SourceMapping>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSetDef {
    pub id: ResourceId,
    pub label: ResourceId,
    pub features: Vec<ResourceId>,
}

impl TrainingSetDef {
    pub fn check(&self) -> Result<(), ProviderError> {
        self.id.check(&[OfflineResourceType::TrainingSet])?;
        self.label.check(&[OfflineResourceType::Label])?;
        if self.features.is_empty() {
            return Err(ProviderError::InvalidDefinition(format!(
                "training set {} has no features",
                self.id
            )));
        }
        for feature in self.features.iter() {
            feature.check(&[OfflineResourceType::Feature])?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub entity: String,
    pub value: Value,
    pub ts: DateTime<Utc>,
}

impl ResourceRecord {
    pub fn new<T>(entity: T, value: Value) -> Self
    where
        T: AsRef<str>,
    {
        Self {
            entity: entity.as_ref().to_string(),
            value,
            ts: epoch(),
        }
    }

    pub fn with_ts(mut self, ts: DateTime<Utc>) -> Self {
        self.ts = ts;
        self
    }
}

/**
 * One row of a primary table, values in schema column order
 */
pub type GenericRecord = Vec<Value>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingSetRow {
    pub features: Vec<Value>,
    pub label: Value,
}

/// Records without a timestamp sort before everything else
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::from(std::time::UNIX_EPOCH)
}
