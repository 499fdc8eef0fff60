// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Suspension registry: callback tokens and the wait index
//!
//! Each token lives in two files: a registration written once when the wait
//! is created, and a resolution marker written once by whichever signal
//! arrives first (callback, expiry sweep, or an overdue check during
//! replay). The marker is created with `write_if_absent`, so resolution is a
//! compare-and-set and every later signal observes the winner. Consuming a
//! resolution deletes only the registration; the marker stays behind as a
//! tombstone so signals that arrive after consumption are recognizable as
//! duplicates.
//!
//! A separate wait index maps (run id, wait name) to the token, letting
//! replay re-attach to an existing wait instead of minting a new token. The
//! index outlives the token files so a completed run can still be audited.

use crate::atomic::{self, WriteOutcome};
use crate::error::StorageError;
use crate::ledger::{check_name, check_run_id};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use tether_core::{SuspensionToken, TokenResolution};

const RESOLUTION_SUFFIX: &str = ".resolution.json";

/// Result of a resolution attempt
#[derive(Debug)]
pub enum ResolveOutcome {
    /// This signal won the race and is the token's resolution
    Resolved,
    /// The token was already settled; the existing resolution stands
    AlreadyResolved(TokenResolution),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct WaitIndexEntry {
    token: String,
}

#[derive(Clone)]
pub struct SuspensionRegistry {
    root: PathBuf,
}

impl SuspensionRegistry {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(root.join("tokens"))?;
        Ok(Self { root })
    }

    /// Register a token and bind its (run id, wait name) in the wait index
    ///
    /// Re-registering the same token for the same wait is a no-op; binding a
    /// different token to an already-bound wait is a conflict.
    pub fn register(&self, token: &SuspensionToken) -> Result<(), StorageError> {
        check_name(&token.token)?;
        let index_path = self.wait_path(&token.run_id, &token.wait_name)?;
        let entry = WaitIndexEntry {
            token: token.token.clone(),
        };
        if let WriteOutcome::Exists =
            atomic::write_if_absent(&index_path, &serde_json::to_vec_pretty(&entry)?)?
        {
            let existing: WaitIndexEntry = serde_json::from_str(&fs::read_to_string(&index_path)?)?;
            if existing.token != token.token {
                return Err(StorageError::WaitConflict {
                    run_id: token.run_id.clone(),
                    wait_name: token.wait_name.clone(),
                });
            }
        }

        let mut registration = token.clone();
        registration.resolution = None;
        let path = self.token_path(&token.token);
        match atomic::write_if_absent(&path, &serde_json::to_vec_pretty(&registration)?)? {
            WriteOutcome::Written | WriteOutcome::Exists => Ok(()),
        }
    }

    /// Token bound to a wait, if the wait was ever registered
    pub fn lookup_wait(
        &self,
        run_id: &str,
        wait_name: &str,
    ) -> Result<Option<String>, StorageError> {
        let path = self.wait_path(run_id, wait_name)?;
        match fs::read_to_string(&path) {
            Ok(content) => {
                let entry: WaitIndexEntry = serde_json::from_str(&content)?;
                Ok(Some(entry.token))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Load a token with its resolution merged in, if one has been recorded
    pub fn get(&self, token: &str) -> Result<SuspensionToken, StorageError> {
        if check_name(token).is_err() {
            // Malformed tokens behave like unknown ones
            return Err(StorageError::TokenNotFound(token.to_string()));
        }
        let content = match fs::read_to_string(self.token_path(token)) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::TokenNotFound(token.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let mut loaded: SuspensionToken = serde_json::from_str(&content)?;

        match fs::read_to_string(self.resolution_path(token)) {
            Ok(content) => loaded.resolution = Some(serde_json::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(loaded)
    }

    /// Settle a token; first resolution wins
    pub fn resolve(
        &self,
        token: &str,
        resolution: &TokenResolution,
    ) -> Result<ResolveOutcome, StorageError> {
        // Ensures unknown tokens error before any marker is written
        let _ = self.get(token)?;
        let path = self.resolution_path(token);
        match atomic::write_if_absent(&path, &serde_json::to_vec_pretty(resolution)?)? {
            WriteOutcome::Written => Ok(ResolveOutcome::Resolved),
            WriteOutcome::Exists => {
                let existing = serde_json::from_str(&fs::read_to_string(&path)?)?;
                Ok(ResolveOutcome::AlreadyResolved(existing))
            }
        }
    }

    /// Just the resolution marker, whether or not the registration survives
    ///
    /// After consumption this is the tombstone that distinguishes a late
    /// duplicate signal from a token that never existed.
    pub fn resolution(&self, token: &str) -> Result<Option<TokenResolution>, StorageError> {
        if check_name(token).is_err() {
            return Ok(None);
        }
        match fs::read_to_string(self.resolution_path(token)) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Consume a settled token: drop the registration, keep the resolution
    /// marker as a tombstone. The wait index entry is retained too.
    pub fn consume(&self, token: &str) -> Result<(), StorageError> {
        check_name(token)?;
        match fs::remove_file(self.token_path(token)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// All registered tokens with no resolution recorded yet
    pub fn pending(&self) -> Result<Vec<SuspensionToken>, StorageError> {
        Ok(self
            .registered()?
            .into_iter()
            .filter(SuspensionToken::is_pending)
            .collect())
    }

    /// Registered tokens whose resolution has landed but has not been
    /// consumed by the owning run yet
    pub fn settled(&self) -> Result<Vec<SuspensionToken>, StorageError> {
        Ok(self
            .registered()?
            .into_iter()
            .filter(|t| !t.is_pending())
            .collect())
    }

    fn registered(&self) -> Result<Vec<SuspensionToken>, StorageError> {
        let mut tokens = Vec::new();
        for entry in fs::read_dir(self.root.join("tokens"))? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if atomic::is_temp_name(&name)
                || name.ends_with(RESOLUTION_SUFFIX)
                || !name.ends_with(".json")
            {
                continue;
            }
            let Some(token) = name.strip_suffix(".json") else {
                continue;
            };
            tokens.push(self.get(token)?);
        }
        tokens.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tokens)
    }

    fn token_path(&self, token: &str) -> PathBuf {
        self.root.join("tokens").join(format!("{}.json", token))
    }

    fn resolution_path(&self, token: &str) -> PathBuf {
        self.root
            .join("tokens")
            .join(format!("{}{}", token, RESOLUTION_SUFFIX))
    }

    fn wait_path(&self, run_id: &str, wait_name: &str) -> Result<PathBuf, StorageError> {
        check_run_id(run_id)?;
        check_name(wait_name)?;
        Ok(self
            .root
            .join("runs")
            .join(run_id)
            .join("waits")
            .join(format!("{}.json", wait_name)))
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
