//! Exclusively locked snapshot output file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Result, SnapshotError};
use crate::generator::NEW_LINE;

/// Output file held under an exclusive advisory lock until dropped.
#[derive(Debug)]
pub struct SnapshotFile {
    file: File,
    path: PathBuf,
    written: u64,
}

impl SnapshotFile {
    /// Create `path` and lock it without waiting.
    ///
    /// Fails with [`SnapshotError::LockContention`] if the file already
    /// exists, whether another run is still writing it or has finished.
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = match OpenOptions::new()
            .create_new(true)
            .read(true)
            .write(true)
            .open(path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(SnapshotError::LockContention(path.to_path_buf()));
            }
            Err(e) => return Err(SnapshotError::Io(e)),
        };

        if let Err(e) = try_lock_exclusive(&file) {
            drop(file);
            if let Err(rm) = std::fs::remove_file(path) {
                warn!("Failed to remove unlocked snapshot {}: {}", path.display(), rm);
            }
            return Err(if e.kind() == io::ErrorKind::WouldBlock {
                SnapshotError::LockContention(path.to_path_buf())
            } else {
                SnapshotError::Io(e)
            });
        }

        debug!("Locked snapshot file {}", path.display());

        Ok(Self {
            file,
            path: path.to_path_buf(),
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes appended so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Append one statement followed by the line terminator.
    pub fn append_statement(&mut self, sql: &str) -> Result<()> {
        self.file.write_all(sql.as_bytes())?;
        self.file.write_all(NEW_LINE.as_bytes())?;
        self.written += (sql.len() + NEW_LINE.len()) as u64;
        Ok(())
    }

    /// Flush contents to disk.
    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Remove the file, then release the lock.
    pub fn discard(self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove partial snapshot {}: {}", self.path.display(), e);
        }
    }
}

impl Drop for SnapshotFile {
    fn drop(&mut self) {
        unlock(&self.file);
    }
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(unix)]
fn unlock(file: &File) {
    use std::os::unix::io::AsRawFd;

    unsafe {
        libc::flock(file.as_raw_fd(), libc::LOCK_UN);
    }
}

#[cfg(not(unix))]
fn try_lock_exclusive(_file: &File) -> io::Result<()> {
    debug!("Advisory file locks are not supported on this platform");
    Ok(())
}

#[cfg(not(unix))]
fn unlock(_file: &File) {}
