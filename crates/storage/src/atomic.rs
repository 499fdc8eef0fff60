// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic file primitives
//!
//! `write_if_absent` gives compare-and-set semantics on plain files: the
//! payload is written to a temp file in the same directory and then
//! hard-linked to the final name. Linking fails if the target exists, so
//! the first writer wins and no reader ever observes a partial file.

use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum WriteOutcome {
    Written,
    Exists,
}

pub(crate) fn write_if_absent(path: &Path, bytes: &[u8]) -> io::Result<WriteOutcome> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
    fs::create_dir_all(dir)?;

    let tmp = dir.join(format!(".tmp-{}", uuid::Uuid::new_v4()));
    fs::write(&tmp, bytes)?;

    let outcome = match fs::hard_link(&tmp, path) {
        Ok(()) => Ok(WriteOutcome::Written),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(WriteOutcome::Exists),
        Err(e) => Err(e),
    };
    let _ = fs::remove_file(&tmp);
    outcome
}

/// Atomically replace a file's contents (temp file + rename)
pub(crate) fn replace(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
    fs::create_dir_all(dir)?;

    let tmp = dir.join(format!(".tmp-{}", uuid::Uuid::new_v4()));
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// True for the temp files left behind by an interrupted writer
pub(crate) fn is_temp_name(name: &str) -> bool {
    name.starts_with('.')
}
