//! Core traits at the seams between the orchestrator and a live cluster.
//!
//! - [`ClusterClient`]: read-only administrative view used by snapshot runs
//! - [`SchemaCapability`]: schema lookup and switching
//! - [`TableCapability`]: create/drop/exists for table-backed caches
//!
//! Capabilities are small, independent traits implemented once per backend
//! (currently the thin client), instead of a database/connection/schema
//! class hierarchy.

use async_trait::async_trait;

use crate::error::Result;

use super::schema::CacheDefinition;

/// Default SQL schema of a cluster.
pub const DEFAULT_SCHEMA: &str = "PUBLIC";

/// Read-only administrative access to a live cluster.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Names of all caches visible to the client.
    async fn cache_names(&self) -> Result<Vec<String>>;

    /// Native configuration of one cache.
    async fn cache_configuration(&self, name: &str) -> Result<CacheDefinition>;
}

/// A named schema and the tables it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaInfo {
    /// Schema name.
    pub name: String,
    /// Table names, sorted.
    pub tables: Vec<String>,
}

impl SchemaInfo {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Schema lookup and the session's current schema.
#[async_trait]
pub trait SchemaCapability: Send + Sync {
    /// Describe a schema. Unknown schemas are reported as empty.
    async fn get_schema(&self, name: &str) -> Result<SchemaInfo>;

    /// Schema used to resolve unqualified table names.
    fn current_schema(&self) -> String;

    /// Switch the current schema.
    fn change_schema(&self, name: &str) -> Result<()>;
}

/// Table lifecycle over table-backed caches.
#[async_trait]
pub trait TableCapability: Send + Sync {
    /// Create the cache backing a table.
    async fn create(&self, cache: &CacheDefinition) -> Result<()>;

    /// Drop a cache by name.
    async fn drop(&self, cache_name: &str) -> Result<()>;

    /// Whether a table with this name exists in the current schema.
    async fn exists(&self, table: &str) -> Result<bool>;
}
