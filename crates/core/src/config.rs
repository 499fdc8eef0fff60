// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration loaded from `tether.toml`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory for runs, tokens, locks, and artifacts
    pub state_dir: PathBuf,
    /// Serialized step values above this many bytes are stored as artifacts
    pub inline_threshold: usize,
    /// Deadline for approval waits in the built-in workflows
    #[serde(with = "humantime_serde")]
    pub default_callback_timeout: Duration,
    /// Interval between expiry sweeps in `sweep --watch`
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// Base URL handed to agents as the callback address
    pub callback_base_url: String,
    /// Agent endpoints by phase name (researcher, analyst, writer, ...)
    pub agents: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".tether"),
            inline_threshold: 256_000,
            default_callback_timeout: Duration::from_secs(24 * 3600),
            sweep_interval: Duration::from_secs(60),
            callback_base_url: "http://localhost:8787".to_string(),
            agents: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load the config, falling back to defaults when the file is absent
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn artifact_dir(&self) -> PathBuf {
        self.state_dir.join("artifacts")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
