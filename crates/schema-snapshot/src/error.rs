//! Error types for the snapshot library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for snapshot operations.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A table-backed cache must declare exactly one query entity.
    #[error("Cache {cache} must have exactly one query entity definition, found {entities}")]
    AmbiguousSchema { cache: String, entities: usize },

    /// Column type could not be resolved and the unknown-type degrade is disabled.
    #[error("Unsupported sql type [column={column}, type={class_name}]")]
    UnsupportedType { column: String, class_name: String },

    /// Query entity has no usable key field.
    #[error("Table {0} has no primary key field among its columns")]
    NoPrimaryKey(String),

    /// Output file is locked by a concurrent snapshot run.
    #[error("Snapshot file {} is locked by another run", .0.display())]
    LockContention(PathBuf),

    /// Lifecycle or protocol misuse (double start, send before start, ...)
    #[error("Protocol misuse: {0}")]
    ProtocolMisuse(String),

    /// Thin client transport or protocol failure
    #[error("Client error: {0}")]
    Client(String),

    /// Thin client used after close
    #[error("Client is closed")]
    ClientClosed,

    /// Cache does not exist
    #[error("Cache not found: {0}")]
    CacheNotFound(String),

    /// Cache already exists
    #[error("Cache already exists: {0}")]
    CacheExists(String),

    /// Terminal whole-run failure of a snapshot operation
    #[error("Snapshot operation failed: {message}")]
    SnapshotOperation {
        message: String,
        #[source]
        source: Box<SnapshotError>,
    },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SnapshotError {
    /// Create an UnsupportedType error
    pub fn unsupported_type(column: impl Into<String>, class_name: impl Into<String>) -> Self {
        SnapshotError::UnsupportedType {
            column: column.into(),
            class_name: class_name.into(),
        }
    }

    /// Wrap a whole-run failure into the terminal snapshot-operation error.
    pub fn operation(message: impl Into<String>, source: SnapshotError) -> Self {
        SnapshotError::SnapshotOperation {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// True when this error (or the error it wraps) is lock contention.
    pub fn is_lock_contention(&self) -> bool {
        match self {
            SnapshotError::LockContention(_) => true,
            SnapshotError::SnapshotOperation { source, .. } => source.is_lock_contention(),
            _ => false,
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            SnapshotError::Config(_) | SnapshotError::Yaml(_) => 2,
            SnapshotError::SnapshotOperation { source, .. } => source.exit_code(),
            SnapshotError::LockContention(_) => 3,
            SnapshotError::Client(_) | SnapshotError::ClientClosed => 4,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for snapshot operations.
pub type Result<T> = std::result::Result<T, SnapshotError>;
