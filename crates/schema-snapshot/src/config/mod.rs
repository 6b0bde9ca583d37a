//! Configuration loading and validation.

mod flags;
mod types;
mod validation;

pub use flags::{SnapshotFlag, SnapshotProperty, PROPERTY_PREFIX};
pub use types::*;

use crate::error::Result;
use crate::snapshot::{CacheSelection, SQL_EXTENSION};
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl SnapshotOptions {
    /// Validate the options.
    pub fn validate(&self) -> Result<()> {
        validation::validate_snapshot(self)
    }

    /// Base name with any `.sql` extension removed.
    pub fn base_name(&self) -> &str {
        self.name.strip_suffix(SQL_EXTENSION).unwrap_or(&self.name)
    }

    /// Caches this snapshot covers.
    pub fn selection(&self) -> CacheSelection {
        if self.full {
            CacheSelection::All
        } else {
            CacheSelection::Only(self.caches.clone())
        }
    }
}
