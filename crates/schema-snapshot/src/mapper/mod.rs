//! Schema mapper from native cache definitions to [`IntermediateTable`].

use serde::Serialize;
use tracing::warn;

use crate::core::schema::{CacheDefinition, Column, IntermediateTable, QueryEntity, TableStoreConfig};
use crate::error::{Result, SnapshotError};
use crate::typemap;

/// Column whose unknown type was degraded to the generic object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeWarning {
    /// Table the column belongs to.
    pub table: String,
    /// Column name.
    pub column: String,
    /// Unresolved value class name.
    pub class_name: String,
}

/// Mapped table plus non-fatal warnings raised while mapping it.
#[derive(Debug, Clone)]
pub struct MappedTable {
    pub table: IntermediateTable,
    pub warnings: Vec<TypeWarning>,
}

/// Converts one cache definition into an intermediate table.
///
/// Holds only its unknown-type policy, so one mapper can serve concurrent runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaMapper {
    unknown_type_support: bool,
}

impl SchemaMapper {
    /// Create a mapper. With `unknown_type_support`, unresolvable column types
    /// degrade to OBJECT instead of failing the mapping.
    pub fn new(unknown_type_support: bool) -> Self {
        Self {
            unknown_type_support,
        }
    }

    pub fn unknown_type_support(&self) -> bool {
        self.unknown_type_support
    }

    /// Map a cache definition, discarding warnings (they are still logged).
    pub fn map(&self, cache: &CacheDefinition) -> Result<IntermediateTable> {
        self.map_with_warnings(cache).map(|m| m.table)
    }

    /// Map a cache definition.
    pub fn map_with_warnings(&self, cache: &CacheDefinition) -> Result<MappedTable> {
        let entity = match cache.query_entities.as_slice() {
            [entity] => entity,
            entities => {
                return Err(SnapshotError::AmbiguousSchema {
                    cache: cache.name.clone(),
                    entities: entities.len(),
                })
            }
        };

        let table_name = entity.table_name();
        let mut warnings = Vec::new();
        let columns = self.columns(&table_name, entity, &mut warnings)?;

        if columns.iter().filter(|c| c.is_primary_key).count() != 1 {
            return Err(SnapshotError::NoPrimaryKey(table_name));
        }

        Ok(MappedTable {
            table: IntermediateTable::new(table_name, columns, TableStoreConfig::from_cache(cache)),
            warnings,
        })
    }

    fn columns(
        &self,
        table_name: &str,
        entity: &QueryEntity,
        warnings: &mut Vec<TypeWarning>,
    ) -> Result<Vec<Column>> {
        let key_field = entity.key_field_name.as_deref();

        entity
            .fields
            .iter()
            .map(|field| {
                let sql_type = self.sql_type(table_name, &field.name, &field.type_name, warnings)?;

                Ok(Column {
                    name: field.name.clone(),
                    sql_type: sql_type.to_string(),
                    precision: entity.fields_precision.get(&field.name).copied(),
                    is_primary_key: key_field == Some(field.name.as_str()),
                    is_not_null: entity.not_null_fields.contains(&field.name),
                })
            })
            .collect()
    }

    fn sql_type(
        &self,
        table_name: &str,
        column: &str,
        class_name: &str,
        warnings: &mut Vec<TypeWarning>,
    ) -> Result<&'static str> {
        let resolution = typemap::resolve_sql_type(class_name, self.unknown_type_support)
            .ok_or_else(|| SnapshotError::unsupported_type(column, class_name))?;

        if resolution.is_lossy() {
            warn!(
                "Unsupported sql type was replaced with {} [table={}, column={}, type={}]",
                resolution.sql_type, table_name, column, class_name
            );
            warnings.push(TypeWarning {
                table: table_name.to_string(),
                column: column.to_string(),
                class_name: class_name.to_string(),
            });
        }

        Ok(resolution.sql_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{AtomicityMode, WriteSyncMode};

    fn pet_entity() -> QueryEntity {
        QueryEntity::new("com.example.Pet")
            .with_table_name("PET")
            .with_key_field("ID")
            .with_field("ID", "java.lang.Long")
            .with_field("NAME", "java.lang.String")
            .with_field("OWNER_ID", "java.util.UUID")
            .with_not_null("NAME")
            .with_precision("NAME", 64)
    }

    #[test]
    fn test_map_valid_cache() {
        let cache = CacheDefinition::new("Pet")
            .with_query_entity(pet_entity())
            .with_backups(1)
            .with_write_sync(WriteSyncMode::FullSync);

        let table = SchemaMapper::new(false).map(&cache).unwrap();
        assert_eq!(table.name(), "PET");

        let names: Vec<_> = table.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["ID", "NAME", "OWNER_ID"]);

        let id = &table.columns()[0];
        assert_eq!(id.sql_type, "BIGINT");
        assert!(id.is_primary_key);
        assert!(!id.is_not_null);

        let name = &table.columns()[1];
        assert_eq!(name.sql_type, "VARCHAR");
        assert_eq!(name.precision, Some(64));
        assert!(name.is_not_null);
        assert!(!name.is_primary_key);

        assert_eq!(table.columns()[2].sql_type, "UUID");
        assert_eq!(table.primary_key().map(|c| c.name.as_str()), Some("ID"));

        let store = table.store_config();
        assert_eq!(store.cache_name, "Pet");
        assert_eq!(store.backups, 1);
        assert_eq!(store.write_sync_mode, WriteSyncMode::FullSync);
    }

    #[test]
    fn test_zero_entities_is_ambiguous() {
        let cache = CacheDefinition::new("Plain");
        let err = SchemaMapper::new(true).map(&cache).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::AmbiguousSchema { ref cache, entities: 0 } if cache == "Plain"
        ));
    }

    #[test]
    fn test_two_entities_is_ambiguous() {
        let cache = CacheDefinition::new("Mixed")
            .with_query_entity(pet_entity())
            .with_query_entity(pet_entity().with_table_name("PET2"));
        let err = SchemaMapper::new(true).map(&cache).unwrap_err();
        assert!(matches!(err, SnapshotError::AmbiguousSchema { entities: 2, .. }));
    }

    #[test]
    fn test_unknown_type_fails_without_degrade() {
        let cache = CacheDefinition::new("Owner").with_query_entity(
            QueryEntity::new("com.example.Owner")
                .with_key_field("ID")
                .with_field("ID", "java.lang.Long")
                .with_field("ADDRESS", "com.example.Address"),
        );

        let err = SchemaMapper::new(false).map(&cache).unwrap_err();
        match err {
            SnapshotError::UnsupportedType { column, class_name } => {
                assert_eq!(column, "ADDRESS");
                assert_eq!(class_name, "com.example.Address");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_type_degrades_with_warning() {
        let cache = CacheDefinition::new("Owner").with_query_entity(
            QueryEntity::new("com.example.Owner")
                .with_key_field("ID")
                .with_field("ID", "java.lang.Long")
                .with_field("ADDRESS", "com.example.Address"),
        );

        let mapped = SchemaMapper::new(true).map_with_warnings(&cache).unwrap();
        assert_eq!(mapped.table.name(), "OWNER");
        assert_eq!(mapped.table.columns()[1].sql_type, "OBJECT");
        assert_eq!(
            mapped.warnings,
            vec![TypeWarning {
                table: "OWNER".into(),
                column: "ADDRESS".into(),
                class_name: "com.example.Address".into(),
            }]
        );
    }

    #[test]
    fn test_missing_key_field_is_rejected() {
        let cache = CacheDefinition::new("NoKey").with_query_entity(
            QueryEntity::new("com.example.NoKey")
                .with_key_field("MISSING")
                .with_field("ID", "java.lang.Long"),
        );
        assert!(matches!(
            SchemaMapper::new(false).map(&cache),
            Err(SnapshotError::NoPrimaryKey(t)) if t == "NOKEY"
        ));
    }

    #[test]
    fn test_store_config_carries_optional_fields() {
        let cache = CacheDefinition::new("Pet")
            .with_query_entity(pet_entity())
            .with_group("animals")
            .with_data_region("hot")
            .with_atomicity(AtomicityMode::Transactional)
            .with_parallelism(4);

        let table = SchemaMapper::default().map(&cache).unwrap();
        let store = table.store_config();
        assert_eq!(store.cache_group.as_deref(), Some("animals"));
        assert_eq!(store.data_region.as_deref(), Some("hot"));
        assert_eq!(store.atomicity_mode, Some(AtomicityMode::Transactional));
        assert_eq!(store.parallelism, 4);
    }

    #[test]
    fn test_mapping_is_structurally_stable() {
        let cache = CacheDefinition::new("Pet").with_query_entity(pet_entity());
        let mapper = SchemaMapper::new(false);
        assert_eq!(mapper.map(&cache).unwrap(), mapper.map(&cache).unwrap());
    }
}
