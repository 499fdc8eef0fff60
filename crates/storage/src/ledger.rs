// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step ledger: append-only, idempotent checkpoint records
//!
//! Records are keyed by (run id, step name) and written exactly once via
//! `write_if_absent`. A losing concurrent writer gets the existing record
//! back and must treat it as authoritative.

use crate::atomic::{self, WriteOutcome};
use crate::error::StorageError;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use tether_core::{valid_name, StepRecord};

/// Result of a commit attempt
#[derive(Debug)]
pub enum CommitOutcome {
    /// This writer created the record
    Committed,
    /// Another writer got there first; its record is authoritative
    Superseded(StepRecord),
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed)
    }
}

/// Append-only record of checkpointed results
#[derive(Clone)]
pub struct StepLedger {
    root: PathBuf,
}

impl StepLedger {
    /// Open a ledger rooted at the given state directory
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Commit a record if no record exists for its (run id, step name)
    pub fn commit(&self, record: &StepRecord) -> Result<CommitOutcome, StorageError> {
        let path = self.step_path(&record.run_id, &record.name)?;
        let bytes = serde_json::to_vec_pretty(record)?;
        match atomic::write_if_absent(&path, &bytes)? {
            WriteOutcome::Written => Ok(CommitOutcome::Committed),
            WriteOutcome::Exists => {
                let existing = self.get(&record.run_id, &record.name)?.ok_or_else(|| {
                    StorageError::Io(io::Error::new(
                        io::ErrorKind::NotFound,
                        "record vanished after losing commit race",
                    ))
                })?;
                Ok(CommitOutcome::Superseded(existing))
            }
        }
    }

    /// Fetch one record, or None if the step has not committed
    pub fn get(&self, run_id: &str, name: &str) -> Result<Option<StepRecord>, StorageError> {
        let path = self.step_path(run_id, name)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Load every record of a run into a lookup-by-name cache
    pub fn load_all(&self, run_id: &str) -> Result<HashMap<String, StepRecord>, StorageError> {
        check_name(run_id)?;
        let dir = self.steps_dir(run_id);
        let mut records = HashMap::new();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if atomic::is_temp_name(&name) || !name.ends_with(".json") {
                continue;
            }
            let content = fs::read_to_string(entry.path())?;
            let record: StepRecord = serde_json::from_str(&content)?;
            records.insert(record.name.clone(), record);
        }
        Ok(records)
    }

    fn steps_dir(&self, run_id: &str) -> PathBuf {
        self.root.join("runs").join(run_id).join("steps")
    }

    fn step_path(&self, run_id: &str, name: &str) -> Result<PathBuf, StorageError> {
        check_name(run_id)?;
        check_name(name)?;
        Ok(self.steps_dir(run_id).join(format!("{}.json", name)))
    }
}

pub(crate) fn check_name(name: &str) -> Result<(), StorageError> {
    if valid_name(name) {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}

/// Validate a run id the same way step names are validated
pub fn check_run_id(id: &str) -> Result<(), StorageError> {
    check_name(id)
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
