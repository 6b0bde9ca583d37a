//! Cache definitions and the intermediate table model.
//!
//! [`CacheDefinition`] is the cluster's native view of a cache (read-only to
//! this crate). [`IntermediateTable`] is the vendor-neutral form built from it
//! by the mapper and consumed by the generator.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Default query parallelism of a cache.
pub const DEFAULT_QUERY_PARALLELISM: u32 = 1;

/// Default number of backups of a cache.
pub const DEFAULT_BACKUPS: u32 = 0;

/// Write synchronization mode of a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteSyncMode {
    /// Wait for all copies.
    FullSync,
    /// Do not wait for any copy.
    FullAsync,
    /// Wait for the primary copy only.
    #[default]
    PrimarySync,
}

impl fmt::Display for WriteSyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WriteSyncMode::FullSync => "FULL_SYNC",
            WriteSyncMode::FullAsync => "FULL_ASYNC",
            WriteSyncMode::PrimarySync => "PRIMARY_SYNC",
        };
        f.write_str(s)
    }
}

/// Atomicity mode of a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AtomicityMode {
    Atomic,
    Transactional,
    TransactionalSnapshot,
}

impl fmt::Display for AtomicityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AtomicityMode::Atomic => "ATOMIC",
            AtomicityMode::Transactional => "TRANSACTIONAL",
            AtomicityMode::TransactionalSnapshot => "TRANSACTIONAL_SNAPSHOT",
        };
        f.write_str(s)
    }
}

/// One declared field of a query entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryField {
    /// Field (column) name.
    pub name: String,

    /// Fully-qualified value class name (e.g., "java.lang.Long").
    #[serde(rename = "type")]
    pub type_name: String,
}

impl QueryField {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Row shape declared for a cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryEntity {
    /// Key class name.
    #[serde(default = "default_key_type")]
    pub key_type: String,

    /// Value class name.
    pub value_type: String,

    /// Declared SQL table name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,

    /// SQL schema the table lives in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Name of the field holding the cache key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_field_name: Option<String>,

    /// Fields in declaration order.
    #[serde(default)]
    pub fields: Vec<QueryField>,

    /// Fields declared NOT NULL.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub not_null_fields: BTreeSet<String>,

    /// Declared precision per field.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields_precision: BTreeMap<String, u32>,
}

impl QueryEntity {
    /// Create an entity with the given value type and no fields.
    pub fn new(value_type: impl Into<String>) -> Self {
        Self {
            key_type: default_key_type(),
            value_type: value_type.into(),
            table_name: None,
            schema: None,
            key_field_name: None,
            fields: Vec::new(),
            not_null_fields: BTreeSet::new(),
            fields_precision: BTreeMap::new(),
        }
    }

    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    pub fn with_key_field(mut self, name: impl Into<String>) -> Self {
        self.key_field_name = Some(name.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.fields.push(QueryField::new(name, type_name));
        self
    }

    pub fn with_not_null(mut self, name: impl Into<String>) -> Self {
        self.not_null_fields.insert(name.into());
        self
    }

    pub fn with_precision(mut self, name: impl Into<String>, precision: u32) -> Self {
        self.fields_precision.insert(name.into(), precision);
        self
    }

    /// Effective table name.
    ///
    /// Falls back to the upper-cased simple name of the value type when no
    /// table name is declared (`com.example.Pet` becomes `PET`).
    pub fn table_name(&self) -> String {
        match &self.table_name {
            Some(name) => name.clone(),
            None => self
                .value_type
                .rsplit(['.', '$'])
                .next()
                .unwrap_or(&self.value_type)
                .to_uppercase(),
        }
    }
}

fn default_key_type() -> String {
    "java.lang.Object".to_string()
}

/// Native cache configuration as reported by the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheDefinition {
    /// Cache name.
    pub name: String,

    /// Cache group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,

    /// Data region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_region: Option<String>,

    /// Query parallelism (default: 1).
    #[serde(default = "default_query_parallelism")]
    pub query_parallelism: u32,

    /// Number of backups (default: 0).
    #[serde(default)]
    pub backups: u32,

    /// Atomicity mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atomicity_mode: Option<AtomicityMode>,

    /// Write synchronization mode (default: PRIMARY_SYNC).
    #[serde(default)]
    pub write_synchronization_mode: WriteSyncMode,

    /// Query entities. A table-backed cache has exactly one.
    #[serde(default)]
    pub query_entities: Vec<QueryEntity>,
}

impl CacheDefinition {
    /// Create a cache definition with default store parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group_name: None,
            data_region: None,
            query_parallelism: DEFAULT_QUERY_PARALLELISM,
            backups: DEFAULT_BACKUPS,
            atomicity_mode: None,
            write_synchronization_mode: WriteSyncMode::default(),
            query_entities: Vec::new(),
        }
    }

    pub fn with_query_entity(mut self, entity: QueryEntity) -> Self {
        self.query_entities.push(entity);
        self
    }

    pub fn with_backups(mut self, backups: u32) -> Self {
        self.backups = backups;
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group_name = Some(group.into());
        self
    }

    pub fn with_data_region(mut self, region: impl Into<String>) -> Self {
        self.data_region = Some(region.into());
        self
    }

    pub fn with_atomicity(mut self, mode: AtomicityMode) -> Self {
        self.atomicity_mode = Some(mode);
        self
    }

    pub fn with_write_sync(mut self, mode: WriteSyncMode) -> Self {
        self.write_synchronization_mode = mode;
        self
    }

    pub fn with_parallelism(mut self, parallelism: u32) -> Self {
        self.query_parallelism = parallelism;
        self
    }

    /// SQL table names this cache exposes.
    pub fn table_names(&self) -> Vec<String> {
        self.query_entities.iter().map(|e| e.table_name()).collect()
    }
}

fn default_query_parallelism() -> u32 {
    DEFAULT_QUERY_PARALLELISM
}

/// Column of an intermediate table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// SQL type name (e.g., "BIGINT", "VARCHAR").
    pub sql_type: String,

    /// Declared precision.
    pub precision: Option<u32>,

    /// Whether this column holds the cache key.
    pub is_primary_key: bool,

    /// Whether the column is declared NOT NULL.
    pub is_not_null: bool,
}

/// Storage parameters rendered into the `WITH` clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableStoreConfig {
    pub cache_name: String,
    pub cache_group: Option<String>,
    pub data_region: Option<String>,
    pub parallelism: u32,
    pub backups: u32,
    pub atomicity_mode: Option<AtomicityMode>,
    pub write_sync_mode: WriteSyncMode,
}

impl TableStoreConfig {
    /// Extract the store parameters of a cache.
    pub fn from_cache(cache: &CacheDefinition) -> Self {
        Self {
            cache_name: cache.name.clone(),
            cache_group: cache.group_name.clone(),
            data_region: cache.data_region.clone(),
            parallelism: cache.query_parallelism,
            backups: cache.backups,
            atomicity_mode: cache.atomicity_mode,
            write_sync_mode: cache.write_synchronization_mode,
        }
    }
}

/// Vendor-neutral table built by the mapper.
///
/// Immutable once constructed; exactly one column is the primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IntermediateTable {
    name: String,
    columns: Vec<Column>,
    store_config: TableStoreConfig,
}

impl IntermediateTable {
    pub(crate) fn new(name: String, columns: Vec<Column>, store_config: TableStoreConfig) -> Self {
        Self {
            name,
            columns,
            store_config,
        }
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Storage parameters.
    pub fn store_config(&self) -> &TableStoreConfig {
        &self.store_config
    }

    /// The primary key column.
    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.is_primary_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_declared() {
        let entity = QueryEntity::new("com.example.Pet").with_table_name("PETS");
        assert_eq!(entity.table_name(), "PETS");
    }

    #[test]
    fn test_table_name_falls_back_to_value_type() {
        assert_eq!(QueryEntity::new("com.example.Pet").table_name(), "PET");
        assert_eq!(QueryEntity::new("com.example.Outer$Inner").table_name(), "INNER");
        assert_eq!(QueryEntity::new("Plain").table_name(), "PLAIN");
    }

    #[test]
    fn test_cache_definition_defaults_from_yaml() {
        let yaml = r#"
name: Pet
query_entities:
  - value_type: com.example.Pet
    table_name: PET
    key_field_name: ID
    fields:
      - { name: ID, type: java.lang.Long }
      - { name: NAME, type: java.lang.String }
    not_null_fields: [NAME]
"#;
        let cache: CacheDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cache.query_parallelism, DEFAULT_QUERY_PARALLELISM);
        assert_eq!(cache.backups, DEFAULT_BACKUPS);
        assert_eq!(cache.write_synchronization_mode, WriteSyncMode::PrimarySync);
        assert!(cache.atomicity_mode.is_none());

        let entity = &cache.query_entities[0];
        assert_eq!(entity.key_type, "java.lang.Object");
        assert_eq!(entity.fields[1], QueryField::new("NAME", "java.lang.String"));
        assert!(entity.not_null_fields.contains("NAME"));
    }

    #[test]
    fn test_mode_display_matches_serde() {
        assert_eq!(WriteSyncMode::FullSync.to_string(), "FULL_SYNC");
        assert_eq!(
            serde_json::to_string(&WriteSyncMode::FullAsync).unwrap(),
            "\"FULL_ASYNC\""
        );
        assert_eq!(
            AtomicityMode::TransactionalSnapshot.to_string(),
            "TRANSACTIONAL_SNAPSHOT"
        );
    }

    #[test]
    fn test_store_config_from_cache() {
        let cache = CacheDefinition::new("Owner")
            .with_backups(2)
            .with_group("people")
            .with_atomicity(AtomicityMode::Transactional);
        let cfg = TableStoreConfig::from_cache(&cache);
        assert_eq!(cfg.cache_name, "Owner");
        assert_eq!(cfg.cache_group.as_deref(), Some("people"));
        assert_eq!(cfg.backups, 2);
        assert_eq!(cfg.parallelism, 1);
        assert_eq!(cfg.atomicity_mode, Some(AtomicityMode::Transactional));
    }
}
