// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact store for payloads too large to inline in step records
//!
//! Step records stay small by offloading oversized values here and keeping
//! only a reference. Writes are idempotent replaces: a replayed offload
//! rewrites the same bytes under the same key.

use crate::atomic;
use crate::error::StorageError;
use crate::ledger::check_name;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Blob storage keyed by slash-separated paths
pub trait ArtifactStore: Send + Sync {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;
    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;
}

/// Filesystem-backed artifact store under `<state_dir>/artifacts`
#[derive(Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let mut path = self.root.clone();
        let segments: Vec<&str> = key.split('/').collect();
        if segments.is_empty() {
            return Err(StorageError::InvalidName(key.to_string()));
        }
        for segment in segments {
            check_name(segment).map_err(|_| StorageError::InvalidName(key.to_string()))?;
            path.push(segment);
        }
        Ok(path)
    }
}

impl ArtifactStore for FsArtifactStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.key_path(key)?;
        atomic::replace(&path, bytes)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.key_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::ArtifactNotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
