//! Output file naming.
//!
//! Snapshots are `<base>.sql`, then `<base>1.sql`, `<base>2.sql`, ... The
//! next index is one past the highest numeric suffix present, so an existing
//! snapshot is never reused.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Snapshot file extension.
pub const SQL_EXTENSION: &str = ".sql";

/// Pick the path of the next snapshot in `dir`.
pub fn resolve_snapshot_path(dir: &Path, base: &str) -> Result<PathBuf> {
    let first = dir.join(format!("{}{}", base, SQL_EXTENSION));
    if !first.exists() {
        return Ok(first);
    }

    let mut max_index = 0u64;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(index) = entry.file_name().to_str().and_then(|n| snapshot_index(n, base)) {
            max_index = max_index.max(index);
        }
    }

    Ok(dir.join(format!(
        "{}{}{}",
        base,
        max_index.saturating_add(1),
        SQL_EXTENSION
    )))
}

/// Numeric suffix of `<base><N>.sql`. `None` for the unsuffixed file and for
/// anything that is not all ASCII digits.
fn snapshot_index(file_name: &str, base: &str) -> Option<u64> {
    let middle = file_name
        .strip_prefix(base)?
        .strip_suffix(SQL_EXTENSION)?;

    if middle.is_empty() || !middle.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    middle.parse().ok()
}
