//! DDL generation from [`IntermediateTable`].
//!
//! Output is a pure function of the table value: two equal tables render to
//! byte-identical statements, so snapshots of an unchanged schema diff clean.

use crate::core::schema::{
    Column, IntermediateTable, TableStoreConfig, WriteSyncMode, DEFAULT_BACKUPS,
    DEFAULT_QUERY_PARALLELISM,
};

/// Line terminator used in generated SQL, independent of the platform.
pub const NEW_LINE: &str = "\n";

/// Indentation of column clauses.
pub const PADDING: &str = "    ";

/// Renders intermediate tables as `CREATE TABLE IF NOT EXISTS` statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlGenerator;

impl SqlGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate the table creation statement.
    pub fn render(&self, table: &IntermediateTable) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({}{}{}) WITH \"{}\";",
            table.name(),
            NEW_LINE,
            self.columns_block(table.columns()),
            NEW_LINE,
            self.store_options(table.store_config())
        )
    }

    fn columns_block(&self, columns: &[Column]) -> String {
        columns
            .iter()
            .map(|c| format!("{}{}", PADDING, self.column(c)))
            .collect::<Vec<_>>()
            .join(&format!(",{}", NEW_LINE))
    }

    /// SQL definition of one column.
    pub fn column(&self, column: &Column) -> String {
        let mut def = format!("{} {}", column.name, column.sql_type);

        if let Some(precision) = column.precision {
            def.push_str(&format!("({})", precision));
        }
        if column.is_primary_key {
            def.push_str(" PRIMARY KEY");
        }
        if column.is_not_null {
            def.push_str(" NOT NULL");
        }

        def
    }

    /// `WITH` clause body: `cache_name` always, everything else only when it
    /// differs from the cache defaults. Key order is fixed.
    pub fn store_options(&self, cfg: &TableStoreConfig) -> String {
        let mut args: Vec<(&str, String)> = vec![("cache_name", cfg.cache_name.clone())];

        if let Some(group) = &cfg.cache_group {
            args.push(("cache_group", group.clone()));
        }
        if let Some(region) = &cfg.data_region {
            args.push(("data_region", region.clone()));
        }
        if cfg.parallelism != DEFAULT_QUERY_PARALLELISM {
            args.push(("parallelism", cfg.parallelism.to_string()));
        }
        if cfg.backups != DEFAULT_BACKUPS {
            args.push(("backups", cfg.backups.to_string()));
        }
        if let Some(atomicity) = cfg.atomicity_mode {
            args.push(("atomicity", atomicity.to_string()));
        }
        if cfg.write_sync_mode != WriteSyncMode::default() {
            args.push(("write_synchronization_mode", cfg.write_sync_mode.to_string()));
        }

        args.iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{AtomicityMode, CacheDefinition, QueryEntity};
    use crate::mapper::SchemaMapper;

    fn pet_cache() -> CacheDefinition {
        CacheDefinition::new("Pet").with_query_entity(
            QueryEntity::new("com.example.Pet")
                .with_table_name("PET")
                .with_key_field("ID")
                .with_field("ID", "java.lang.Long")
                .with_field("NAME", "java.lang.String")
                .with_not_null("NAME"),
        )
    }

    fn render(cache: &CacheDefinition) -> String {
        let table = SchemaMapper::new(false).map(cache).unwrap();
        SqlGenerator::new().render(&table)
    }

    #[test]
    fn test_render_defaults_only_cache_name() {
        assert_eq!(
            render(&pet_cache()),
            "CREATE TABLE IF NOT EXISTS PET (\n    ID BIGINT PRIMARY KEY,\n    NAME VARCHAR NOT NULL\n) WITH \"cache_name=Pet\";"
        );
    }

    #[test]
    fn test_render_non_default_store_options_in_fixed_order() {
        let cache = pet_cache()
            .with_write_sync(WriteSyncMode::FullSync)
            .with_atomicity(AtomicityMode::Transactional)
            .with_backups(2)
            .with_parallelism(3)
            .with_data_region("hot")
            .with_group("animals");

        let sql = render(&cache);
        assert!(sql.ends_with(
            "WITH \"cache_name=Pet,cache_group=animals,data_region=hot,parallelism=3,backups=2,atomicity=TRANSACTIONAL,write_synchronization_mode=FULL_SYNC\";"
        ));
    }

    #[test]
    fn test_render_precision() {
        let column = Column {
            name: "CODE".into(),
            sql_type: "VARCHAR".into(),
            precision: Some(16),
            is_primary_key: true,
            is_not_null: true,
        };
        assert_eq!(
            SqlGenerator::new().column(&column),
            "CODE VARCHAR(16) PRIMARY KEY NOT NULL"
        );
    }

    #[test]
    fn test_render_is_deterministic() {
        let a = SchemaMapper::new(false).map(&pet_cache()).unwrap();
        let b = SchemaMapper::new(false).map(&pet_cache()).unwrap();
        assert_eq!(a, b);

        let generator = SqlGenerator::new();
        let first = generator.render(&a);
        for _ in 0..10 {
            assert_eq!(generator.render(&b).as_bytes(), first.as_bytes());
        }
    }

    #[test]
    fn test_default_write_sync_is_omitted() {
        let cache = pet_cache().with_write_sync(WriteSyncMode::PrimarySync);
        assert!(!render(&cache).contains("write_synchronization_mode"));
    }
}
