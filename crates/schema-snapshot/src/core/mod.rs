//! Core abstractions shared across the snapshot pipeline.
//!
//! - [`schema`]: native cache definitions and the intermediate table model
//! - [`traits`]: the live-cluster client and capability traits

pub mod schema;
pub mod traits;

pub use schema::{
    AtomicityMode, CacheDefinition, Column, IntermediateTable, QueryEntity, QueryField,
    TableStoreConfig, WriteSyncMode, DEFAULT_BACKUPS, DEFAULT_QUERY_PARALLELISM,
};
pub use traits::{ClusterClient, SchemaCapability, SchemaInfo, TableCapability, DEFAULT_SCHEMA};
