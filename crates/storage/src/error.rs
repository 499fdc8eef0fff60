// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the storage layer

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("run not found: {0}")]
    RunNotFound(String),
    #[error("token not found: {0}")]
    TokenNotFound(String),
    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("wait {wait_name} of run {run_id} is already bound to a different token")]
    WaitConflict { run_id: String, wait_name: String },
}
