// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types
//!
//! Suspension is not a failure: a workflow that reaches an unresolved wait
//! returns `WorkflowError::Suspended`, which unwinds the workflow function
//! to the driver so the invocation can end without consuming compute.

use chrono::{DateTime, Utc};
use tether_core::{FailureInfo, RunStatus, StatusError};
use tether_storage::StorageError;
use thiserror::Error;

/// What kind of external signal a callback wait expects
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitKind {
    External,
    Approval,
}

impl WaitKind {
    /// The run status a suspended wait of this kind parks in
    pub fn status(self) -> RunStatus {
        match self {
            WaitKind::External => RunStatus::AwaitingExternal,
            WaitKind::Approval => RunStatus::AwaitingApproval,
        }
    }
}

/// Why a run gave up its invocation, and what wakes it
#[derive(Clone, Debug)]
pub struct Suspension {
    pub wait_name: String,
    pub wake: WakeReason,
}

#[derive(Clone, Debug)]
pub enum WakeReason {
    /// Timer wait: the expiry sweep re-drives once the clock passes this
    At(DateTime<Utc>),
    /// Callback wait: resolving the token re-drives the run
    Callback { token: String, kind: WaitKind },
}

/// Errors that unwind a workflow function
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("run suspended at wait {}", .0.wait_name)]
    Suspended(Suspension),
    #[error("step {name} failed: {error}")]
    Step { name: String, error: FailureInfo },
    #[error("callback {name} delivered a failure: {error}")]
    Callback { name: String, error: FailureInfo },
    #[error("callback {name} expired before resolution")]
    CallbackTimeout { name: String },
    #[error("run cancelled: {}", reason.as_deref().unwrap_or("no reason given"))]
    Cancelled { reason: Option<String> },
    #[error("invalid step name: {0:?}")]
    InvalidStepName(String),
    #[error("replay diverged at step {name}: {detail}")]
    NonDeterministic { name: String, detail: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl WorkflowError {
    /// Sanitized form for persisting on the run record
    pub fn to_failure_info(&self) -> FailureInfo {
        match self {
            WorkflowError::Step { error, .. } | WorkflowError::Callback { error, .. } => {
                error.clone()
            }
            WorkflowError::CallbackTimeout { name } => {
                FailureInfo::new("callback_timeout", format!("wait {} expired", name))
            }
            WorkflowError::Cancelled { reason } => FailureInfo::cancelled(reason.as_deref()),
            WorkflowError::NonDeterministic { name, detail } => FailureInfo::new(
                "non_deterministic_replay",
                format!("step {}: {}", name, detail),
            ),
            WorkflowError::InvalidStepName(name) => {
                FailureInfo::new("invalid_step_name", name.clone())
            }
            WorkflowError::Suspended(s) => {
                // Never persisted; suspension is handled before faults are recorded
                FailureInfo::new("suspended", s.wait_name.clone())
            }
            WorkflowError::Storage(e) => FailureInfo::new("storage_error", e.to_string()),
        }
    }
}

/// Errors from the replay driver's own operations
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("run not found: {0}")]
    RunNotFound(String),
    #[error("run {0} is being driven by another invocation")]
    Locked(String),
    #[error("unknown workflow kind: {0}")]
    UnknownWorkflow(String),
    #[error(transparent)]
    Terminal(#[from] StatusError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors surfaced to callback senders
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("unknown callback token")]
    UnknownToken,
    #[error("invalid callback: {0}")]
    Invalid(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
