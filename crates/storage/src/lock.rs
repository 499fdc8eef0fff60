// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory per-run locks
//!
//! At most one driver invocation replays a given run at a time. The lock is
//! an OS advisory file lock, so it is released automatically if the holding
//! process dies mid-invocation.

use crate::error::StorageError;
use crate::ledger::check_run_id;
use fs2::FileExt;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Exclusive lock on one run, held for the duration of a drive
pub struct RunLock {
    file: fs::File,
    run_id: String,
}

impl RunLock {
    /// Try to take the lock; `None` means another invocation holds it
    pub fn try_acquire(
        root: impl Into<PathBuf>,
        run_id: &str,
    ) -> Result<Option<Self>, StorageError> {
        check_run_id(run_id)?;
        let dir = root.into().join("locks");
        fs::create_dir_all(&dir)?;
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(dir.join(format!("{}.lock", run_id)))?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                file,
                run_id: run_id.to_string(),
            })),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                debug!(run_id, "run lock contended");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs2::FileExt::unlock(&self.file) {
            debug!(run_id = %self.run_id, error = %e, "failed to release run lock");
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
