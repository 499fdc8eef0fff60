// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow run state machine
//!
//! Exactly one `WorkflowRun` exists per workflow id. The run is mutated only
//! by the execution context (checkpoints) and the replay driver (status
//! transitions); once a terminal status is reached no further transition is
//! permitted.

use crate::clock::Clock;
use crate::step::FailureInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Run status
///
/// `AwaitingExternal` / `AwaitingApproval` persist across process restarts:
/// they mean the run is suspended on a callback token and consumes no
/// compute until the token resolves or expires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Initializing,
    Running,
    AwaitingExternal,
    AwaitingApproval,
    Completed,
    Rejected,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Rejected | RunStatus::Failed
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Initializing => "INITIALIZING",
            RunStatus::Running => "RUNNING",
            RunStatus::AwaitingExternal => "AWAITING_EXTERNAL",
            RunStatus::AwaitingApproval => "AWAITING_APPROVAL",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Rejected => "REJECTED",
            RunStatus::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

/// Attempted transition out of a terminal status
#[derive(Debug, Error)]
#[error("run {id} is terminal ({status}); no further transitions permitted")]
pub struct StatusError {
    pub id: String,
    pub status: RunStatus,
}

/// Durable record of one workflow execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: String,
    /// Registered workflow kind; the driver re-enters this entry point on replay
    pub kind: String,
    pub status: RunStatus,
    pub input: serde_json::Value,
    pub current_step: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Terminal result, once the workflow function has returned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Most recent fault or terminal failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureInfo>,
}

impl WorkflowRun {
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<String>,
        input: serde_json::Value,
        clock: &impl Clock,
    ) -> Self {
        let now = clock.now();
        Self {
            id: id.into(),
            kind: kind.into(),
            status: RunStatus::Initializing,
            input,
            current_step: None,
            created_at: now,
            updated_at: now,
            result: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to a non-terminal or terminal status; rejected once terminal
    pub fn set_status(&mut self, next: RunStatus, clock: &impl Clock) -> Result<(), StatusError> {
        if self.is_terminal() {
            return Err(StatusError {
                id: self.id.clone(),
                status: self.status,
            });
        }
        self.status = next;
        self.touch(clock);
        Ok(())
    }

    /// Record the most recent checkpoint name
    pub fn checkpoint(&mut self, step: &str, clock: &impl Clock) {
        self.current_step = Some(step.to_string());
        self.touch(clock);
    }

    pub fn complete(
        &mut self,
        result: serde_json::Value,
        clock: &impl Clock,
    ) -> Result<(), StatusError> {
        self.set_status(RunStatus::Completed, clock)?;
        self.result = Some(result);
        Ok(())
    }

    pub fn reject(
        &mut self,
        result: serde_json::Value,
        clock: &impl Clock,
    ) -> Result<(), StatusError> {
        self.set_status(RunStatus::Rejected, clock)?;
        self.result = Some(result);
        Ok(())
    }

    pub fn fail(&mut self, error: FailureInfo, clock: &impl Clock) -> Result<(), StatusError> {
        self.set_status(RunStatus::Failed, clock)?;
        self.error = Some(error);
        Ok(())
    }

    /// Record a non-terminal fault: the invocation failed but the run stays
    /// resumable (typically fixed by redeploying workflow code and re-driving)
    pub fn record_fault(&mut self, error: FailureInfo, clock: &impl Clock) {
        self.error = Some(error);
        self.touch(clock);
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            id: self.id.clone(),
            kind: self.kind.clone(),
            status: self.status,
            current_step: self.current_step.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.now();
    }
}

/// Read-only projection for polling clients
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: String,
    pub kind: String,
    pub status: RunStatus,
    pub current_step: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}  {}  {}  step={}",
            self.id,
            self.kind,
            self.status,
            self.current_step.as_deref().unwrap_or("-")
        )
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
