//! Snapshot orchestration.
//!
//! A run locks a fresh output file, enumerates caches through a live client
//! and appends one `CREATE TABLE` statement per cache that maps cleanly.
//! Caches that fail to map are skipped; only failures that affect the run as
//! a whole (locking, file I/O, enumeration) are raised.

mod lock;
mod naming;

pub use lock::SnapshotFile;
pub use naming::{resolve_snapshot_path, SQL_EXTENSION};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::SnapshotOptions;
use crate::core::traits::ClusterClient;
use crate::error::{Result, SnapshotError};
use crate::generator::{SqlGenerator, NEW_LINE};
use crate::mapper::{MappedTable, SchemaMapper, TypeWarning};

/// Outcome of a snapshot run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotResult {
    /// Whether the snapshot file was produced.
    pub success: bool,

    /// File name of the snapshot, without directory.
    pub file_name: String,
}

/// A cache left out of the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCache {
    pub cache_name: String,
    pub reason: String,
}

/// Detailed report of a snapshot run.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotReport {
    pub result: SnapshotResult,
    pub path: PathBuf,
    pub dumped_caches: Vec<String>,
    pub skipped_caches: Vec<SkippedCache>,
    pub warnings: Vec<TypeWarning>,
    /// Hex SHA-256 of the file contents.
    pub sha256: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl SnapshotReport {
    pub fn skipped_names(&self) -> Vec<&str> {
        self.skipped_caches
            .iter()
            .map(|s| s.cache_name.as_str())
            .collect()
    }

    pub fn duration_seconds(&self) -> f64 {
        (self.completed_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

/// Which caches a run covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CacheSelection {
    /// Every cache the client can see.
    #[default]
    All,
    /// The named caches, in this order.
    Only(Vec<String>),
}

/// Parameters of one run.
#[derive(Debug, Clone)]
pub struct SnapshotRequest {
    pub dir: PathBuf,
    pub base_name: String,
    pub selection: CacheSelection,
}

impl SnapshotRequest {
    pub fn new(dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            base_name: base_name.into(),
            selection: CacheSelection::All,
        }
    }

    pub fn with_selection(mut self, selection: CacheSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn from_options(options: &SnapshotOptions) -> Self {
        Self::new(options.dir.clone(), options.base_name()).with_selection(options.selection())
    }
}

#[derive(Default)]
struct DumpOutcome {
    dumped: Vec<String>,
    skipped: Vec<SkippedCache>,
    warnings: Vec<TypeWarning>,
    sha256: String,
}

/// Drives mapper and generator over a cluster and writes the snapshot file.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotOrchestrator {
    mapper: SchemaMapper,
    generator: SqlGenerator,
}

impl SnapshotOrchestrator {
    pub fn new(mapper: SchemaMapper, generator: SqlGenerator) -> Self {
        Self { mapper, generator }
    }

    pub fn from_options(options: &SnapshotOptions) -> Self {
        Self::new(
            SchemaMapper::new(options.unknown_type_support),
            SqlGenerator::new(),
        )
    }

    /// Snapshot into the next free file of `request.dir`.
    pub async fn run<C>(&self, client: &C, request: &SnapshotRequest) -> Result<SnapshotReport>
    where
        C: ClusterClient + ?Sized,
    {
        std::fs::create_dir_all(&request.dir).map_err(|e| {
            SnapshotError::operation(
                format!("cannot create snapshot directory {}", request.dir.display()),
                e.into(),
            )
        })?;

        let path = resolve_snapshot_path(&request.dir, &request.base_name)
            .map_err(|e| SnapshotError::operation("cannot resolve snapshot file name", e))?;

        self.run_to_path(client, &path, &request.selection).await
    }

    /// Snapshot into `path`, which must not exist yet.
    pub async fn run_to_path<C>(
        &self,
        client: &C,
        path: &Path,
        selection: &CacheSelection,
    ) -> Result<SnapshotReport>
    where
        C: ClusterClient + ?Sized,
    {
        let started_at = Utc::now();

        let mut file = match SnapshotFile::acquire(path) {
            Ok(file) => file,
            Err(e) => {
                if e.is_lock_contention() {
                    warn!(
                        "The snapshot file cannot be locked, a parallel snapshot may be running [path={}]",
                        path.display()
                    );
                } else {
                    error!("Snapshot file {} cannot be opened: {}", path.display(), e);
                }
                return Err(SnapshotError::operation("cannot lock snapshot file", e));
            }
        };

        info!("Schema snapshot started [path={}]", path.display());

        let outcome = match self.dump(client, &mut file, selection).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Snapshot creation failed: {}", e);
                file.discard();
                return Err(SnapshotError::operation("snapshot creation failed", e));
            }
        };
        drop(file);

        info!(
            "Schema snapshot created [path={}, dumpedCaches={:?}, skippedCaches={:?}]",
            path.display(),
            outcome.dumped,
            outcome
                .skipped
                .iter()
                .map(|s| s.cache_name.as_str())
                .collect::<Vec<_>>()
        );

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(SnapshotReport {
            result: SnapshotResult {
                success: true,
                file_name,
            },
            path: path.to_path_buf(),
            dumped_caches: outcome.dumped,
            skipped_caches: outcome.skipped,
            warnings: outcome.warnings,
            sha256: outcome.sha256,
            started_at,
            completed_at: Utc::now(),
        })
    }

    async fn dump<C>(
        &self,
        client: &C,
        file: &mut SnapshotFile,
        selection: &CacheSelection,
    ) -> Result<DumpOutcome>
    where
        C: ClusterClient + ?Sized,
    {
        let names = match selection {
            CacheSelection::All => client.cache_names().await?,
            CacheSelection::Only(names) => names.clone(),
        };

        let mut outcome = DumpOutcome::default();
        let mut hasher = Sha256::new();

        for name in names {
            match self.map_cache(client, &name).await {
                Ok(mapped) => {
                    let sql = self.generator.render(&mapped.table);
                    file.append_statement(&sql)?;
                    hasher.update(sql.as_bytes());
                    hasher.update(NEW_LINE.as_bytes());

                    outcome.dumped.push(name);
                    outcome.warnings.extend(mapped.warnings);
                }
                Err(e) => {
                    warn!("Cache skipped [cache={}, reason={}]", name, e);
                    outcome.skipped.push(SkippedCache {
                        cache_name: name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        file.sync()?;
        outcome.sha256 = format!("{:x}", hasher.finalize());
        Ok(outcome)
    }

    async fn map_cache<C>(&self, client: &C, name: &str) -> Result<MappedTable>
    where
        C: ClusterClient + ?Sized,
    {
        let cache = client.cache_configuration(name).await?;
        self.mapper.map_with_warnings(&cache)
    }
}
