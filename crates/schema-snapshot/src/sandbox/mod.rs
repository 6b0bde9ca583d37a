//! Local single-node cluster: embedded instance, client connector and session.

mod connector;
mod embedded;
mod session;

pub use embedded::{CacheChange, CacheMessage, EmbeddedConfig, EmbeddedInstance};
pub use session::ClusterSession;

use serde::Deserialize;
use std::path::Path;

use crate::core::schema::CacheDefinition;
use crate::error::Result;

/// Cache definitions used to populate a local instance.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub caches: Vec<CacheDefinition>,
}

impl SeedFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_file_parsing() {
        let seed = SeedFile::from_yaml(
            r#"
caches:
  - name: Pet
    backups: 1
    query_entities:
      - value_type: com.example.Pet
        table_name: PET
        key_field_name: ID
        fields:
          - { name: ID, type: java.lang.Long }
  - name: Plain
"#,
        )
        .unwrap();

        assert_eq!(seed.caches.len(), 2);
        assert_eq!(seed.caches[0].backups, 1);
        assert_eq!(seed.caches[0].table_names(), ["PET"]);
        assert!(seed.caches[1].query_entities.is_empty());
    }

    #[test]
    fn test_empty_seed_file() {
        let seed = SeedFile::from_yaml("{}").unwrap();
        assert!(seed.caches.is_empty());
    }
}
