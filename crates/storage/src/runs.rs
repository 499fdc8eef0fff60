// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run store: one JSON document per workflow run
//!
//! Creation is idempotent (`create_if_absent`), so starting a workflow with
//! an id that already exists returns the existing run instead of clobbering
//! it. Saves go through the replay driver, which holds the per-run lock, so
//! an atomic replace is sufficient.

use crate::atomic::{self, WriteOutcome};
use crate::error::StorageError;
use crate::ledger::check_run_id;
use std::fs;
use std::io;
use std::path::PathBuf;
use tether_core::WorkflowRun;

/// Result of an idempotent create
#[derive(Debug)]
pub enum CreateOutcome {
    Created,
    Existing(WorkflowRun),
}

#[derive(Clone)]
pub struct RunStore {
    root: PathBuf,
}

impl RunStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(root.join("runs"))?;
        Ok(Self { root })
    }

    /// Create the run document unless one already exists for this id
    pub fn create_if_absent(&self, run: &WorkflowRun) -> Result<CreateOutcome, StorageError> {
        let path = self.run_path(&run.id)?;
        let bytes = serde_json::to_vec_pretty(run)?;
        match atomic::write_if_absent(&path, &bytes)? {
            WriteOutcome::Written => Ok(CreateOutcome::Created),
            WriteOutcome::Exists => Ok(CreateOutcome::Existing(self.load(&run.id)?)),
        }
    }

    /// Persist the run's current state (single writer per run)
    pub fn save(&self, run: &WorkflowRun) -> Result<(), StorageError> {
        let path = self.run_path(&run.id)?;
        let bytes = serde_json::to_vec_pretty(run)?;
        atomic::replace(&path, &bytes)?;
        Ok(())
    }

    pub fn load(&self, id: &str) -> Result<WorkflowRun, StorageError> {
        let path = self.run_path(id)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::RunNotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// List all run ids
    pub fn list(&self) -> Result<Vec<String>, StorageError> {
        let dir = self.root.join("runs");
        let mut ids = Vec::new();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                ids.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn run_path(&self, id: &str) -> Result<PathBuf, StorageError> {
        check_run_id(id)?;
        Ok(self.root.join("runs").join(id).join("run.json"))
    }
}

#[cfg(test)]
#[path = "runs_tests.rs"]
mod tests;
