//! # schema-snapshot
//!
//! Vendor-neutral SQL schema snapshots of a distributed cache cluster.
//!
//! Every table-backed cache of a cluster is mapped to an intermediate table
//! model and rendered as a `CREATE TABLE IF NOT EXISTS ... WITH "..."`
//! statement. Statements are collected into a fresh, never-overwritten
//! `.sql` file guarded by an advisory lock.
//!
//! The crate also ships a single-node cluster that runs entirely in-process
//! (an isolated discovery node behind a small TCP connector), usable as a
//! scratch target for dry runs.
//!
//! ## Example
//!
//! ```rust,no_run
//! use schema_snapshot::{Config, SnapshotOrchestrator, SnapshotRequest, ThinClient};
//!
//! #[tokio::main]
//! async fn main() -> schema_snapshot::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let client = ThinClient::connect(&config.cluster.client_config()).await?;
//!
//!     let report = SnapshotOrchestrator::from_options(&config.snapshot)
//!         .run(&client, &SnapshotRequest::from_options(&config.snapshot))
//!         .await?;
//!
//!     println!("Wrote {}", report.result.file_name);
//!     client.close().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod core;
pub mod discovery;
pub mod error;
pub mod generator;
pub mod mapper;
pub mod sandbox;
pub mod snapshot;
pub mod typemap;

// Re-exports for convenient access
pub use client::{ClientConfig, ThinClient};
pub use config::{ClusterConfig, Config, SnapshotFlag, SnapshotOptions, SnapshotProperty};
pub use crate::core::{
    CacheDefinition, ClusterClient, Column, IntermediateTable, QueryEntity, SchemaCapability,
    TableCapability, TableStoreConfig,
};
pub use discovery::{IsolatedClusterNode, IsolatedNodeConfig};
pub use error::{Result, SnapshotError};
pub use generator::SqlGenerator;
pub use mapper::SchemaMapper;
pub use sandbox::{ClusterSession, EmbeddedConfig, EmbeddedInstance, SeedFile};
pub use snapshot::{
    CacheSelection, SnapshotOrchestrator, SnapshotReport, SnapshotRequest, SnapshotResult,
};
