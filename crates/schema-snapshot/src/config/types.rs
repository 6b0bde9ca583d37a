//! Configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::client::{ClientConfig, DEFAULT_USER};

/// Default snapshot directory.
pub const DEFAULT_SNAPSHOT_DIR: &str = "schema-snapshots";

/// Default snapshot base name.
pub const DEFAULT_SNAPSHOT_NAME: &str = "snapshot";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Cluster connection configuration.
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Snapshot behavior configuration.
    #[serde(default)]
    pub snapshot: SnapshotOptions,
}

/// Live cluster connection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Thin client addresses (`host:port`), tried in order.
    #[serde(default)]
    pub addresses: Vec<String>,

    /// User name (default: "ignite").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl ClusterConfig {
    /// Thin client settings for this cluster.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.addresses.clone())
            .with_user(self.user.clone().unwrap_or_else(|| DEFAULT_USER.to_string()))
    }
}

/// Snapshot behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotOptions {
    /// Output directory (default: "schema-snapshots").
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Base file name without extension (default: "snapshot").
    #[serde(default = "default_name")]
    pub name: String,

    /// Degrade unresolvable column types to OBJECT (default: false).
    #[serde(default)]
    pub unknown_type_support: bool,

    /// Snapshot every cache (default: true). When false, only `caches`.
    #[serde(default = "default_true")]
    pub full: bool,

    /// Caches to snapshot when `full` is off.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub caches: Vec<String>,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            name: default_name(),
            unknown_type_support: false,
            full: true,
            caches: Vec::new(),
        }
    }
}

fn default_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SNAPSHOT_DIR)
}

fn default_name() -> String {
    DEFAULT_SNAPSHOT_NAME.to_string()
}

fn default_true() -> bool {
    true
}
