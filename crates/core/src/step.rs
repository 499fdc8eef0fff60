// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step records: the unit of checkpointing
//!
//! A step record is written at most once per (run, name) and is immutable
//! afterwards. Replay returns the recorded outcome without re-executing the
//! step body.

use crate::clock::Clock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved step name for the cooperative cancellation marker.
///
/// Committing a `Cancelled` record under this name makes every context
/// primitive fail with a cancellation error at its next safe point.
pub const CANCEL_STEP: &str = "__cancel";

/// Sanitized failure descriptor, safe to persist and log
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    pub error_type: String,
    pub message: String,
}

impl FailureInfo {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    pub fn cancelled(reason: Option<&str>) -> Self {
        Self::new("cancelled", reason.unwrap_or("workflow cancelled"))
    }
}

impl std::fmt::Display for FailureInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_type, self.message)
    }
}

/// Pointer into the bulk artifact store
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub key: String,
    pub size_bytes: u64,
}

/// A step's stored value: inline JSON, or an artifact reference when the
/// serialized form exceeds the configured inline threshold
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepValue {
    Inline { value: serde_json::Value },
    Artifact { reference: ArtifactRef },
}

/// Outcome of a checkpointed unit of work
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Success { value: StepValue },
    Failure { error: FailureInfo },
    /// `wait` checkpoint: resume once the clock passes `resume_at`
    Timer { resume_at: DateTime<Utc> },
    /// A callback wait whose token expired before resolution
    TimedOut { deadline: DateTime<Utc> },
    /// Cooperative cancellation marker
    Cancelled { reason: Option<String> },
}

impl StepOutcome {
    /// Short kind label, used in determinism-violation messages
    pub fn kind(&self) -> &'static str {
        match self {
            StepOutcome::Success { .. } => "success",
            StepOutcome::Failure { .. } => "failure",
            StepOutcome::Timer { .. } => "timer",
            StepOutcome::TimedOut { .. } => "timed_out",
            StepOutcome::Cancelled { .. } => "cancelled",
        }
    }
}

/// Immutable checkpoint record keyed by (run id, step name)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepRecord {
    pub run_id: String,
    pub name: String,
    pub outcome: StepOutcome,
    pub completed_at: DateTime<Utc>,
}

impl StepRecord {
    pub fn new(
        run_id: impl Into<String>,
        name: impl Into<String>,
        outcome: StepOutcome,
        clock: &impl Clock,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            name: name.into(),
            outcome,
            completed_at: clock.now(),
        }
    }
}

/// Whether a step name (or run id) is safe to use as a file name component.
///
/// Names are code-authored identifiers; anything outside this set is a bug
/// or a path-traversal attempt.
pub fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 128
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
