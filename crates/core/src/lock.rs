//! Exclusive startup lock (§4.3).
//!
//! Scoped acquisition of an OS advisory lock on `lockfile.lock`, released on
//! every exit path via `Drop`. The daemon's own single-instance guard uses a
//! non-blocking `try_lock_exclusive` because it must fail fast if another
//! daemon already holds it; the client's startup critical section instead
//! blocks, since the whole point is to wait its turn behind whichever
//! sibling process got there first.

use std::fs::{File, OpenOptions};
use std::path::Path;

use fs2::FileExt;

use crate::error::ProtocolError;

/// A held startup lock. Releasing happens on drop; `fs2` unlocks a file
/// handle automatically when it closes, so this type only needs to keep the
/// handle alive for the scope of the critical section.
pub struct StartupLock {
    _file: File,
}

impl StartupLock {
    /// Block until the lock at `path` is acquired. Creates the file (and its
    /// parent directory) if missing.
    pub fn acquire(path: &Path) -> Result<StartupLock, ProtocolError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(path)?;
        file.lock_exclusive()?;
        Ok(StartupLock { _file: file })
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
