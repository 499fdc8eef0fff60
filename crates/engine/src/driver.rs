// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay driver: one invocation per external event
//!
//! Every event that can make a run progress (start, callback resolution,
//! timer sweep, cancellation) funnels into [`Driver::drive`], which takes
//! the per-run lock, re-enters the workflow function against the step cache,
//! and files the outcome. Suspension ends the invocation without failing it.

use crate::context::{Context, Shared};
use crate::error::{DriverError, Suspension, WakeReason, WorkflowError};
use crate::workflow::{WorkflowOutcome, WorkflowSet};
use std::path::PathBuf;
use std::sync::Arc;
use tether_core::{
    Clock, Config, FailureInfo, IdGen, RunStatus, RunSummary, StatusError, StepOutcome, StepRecord,
    SuspensionToken, WorkflowRun, CANCEL_STEP,
};
use tether_storage::{
    CreateOutcome, FsArtifactStore, RunLock, RunStore, StepLedger, StorageError,
    SuspensionRegistry,
};
use tracing::{info, warn};

/// Paths and limits the driver runs with, derived from [`Config`]
#[derive(Clone, Debug)]
pub struct DriverConfig {
    pub state_dir: PathBuf,
    pub inline_threshold: usize,
    pub callback_base_url: String,
}

impl DriverConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            state_dir: config.state_dir.clone(),
            inline_threshold: config.inline_threshold,
            callback_base_url: config.callback_base_url.clone(),
        }
    }
}

/// Result of an idempotent start
#[derive(Clone, Debug)]
pub struct StartReceipt {
    pub run_id: String,
    /// False when a run with this id already existed
    pub created: bool,
    pub status: RunStatus,
}

/// How one drive invocation ended
#[derive(Debug)]
pub enum DriveOutcome {
    Completed(serde_json::Value),
    Rejected(serde_json::Value),
    /// Parked on a wait; `status` is what the run record now shows
    Suspended {
        status: RunStatus,
        wait_name: String,
    },
    Cancelled,
    /// The workflow function errored; the run stays resumable and the fault
    /// is recorded on the run record
    Faulted(FailureInfo),
}

pub struct Driver<C: Clock, I: IdGen> {
    shared: Shared,
    workflows: WorkflowSet<C, I>,
    state_dir: PathBuf,
    clock: C,
    id_gen: I,
}

impl<C: Clock, I: IdGen> Driver<C, I> {
    pub fn new(
        config: DriverConfig,
        workflows: WorkflowSet<C, I>,
        clock: C,
        id_gen: I,
    ) -> Result<Self, DriverError> {
        let shared = Shared {
            ledger: StepLedger::open(&config.state_dir)?,
            registry: SuspensionRegistry::open(&config.state_dir)?,
            runs: RunStore::open(&config.state_dir)?,
            artifacts: Arc::new(FsArtifactStore::open(config.state_dir.join("artifacts"))?),
            inline_threshold: config.inline_threshold,
            callback_base_url: config.callback_base_url,
        };
        Ok(Self {
            shared,
            workflows,
            state_dir: config.state_dir,
            clock,
            id_gen,
        })
    }

    /// Create a run, or return the existing one if the id was seen before
    pub fn start(
        &self,
        id: Option<String>,
        kind: &str,
        input: serde_json::Value,
    ) -> Result<StartReceipt, DriverError> {
        if !self.workflows.contains(kind) {
            return Err(DriverError::UnknownWorkflow(kind.to_string()));
        }
        let id = id.unwrap_or_else(|| self.id_gen.next());
        let run = WorkflowRun::new(&id, kind, input, &self.clock);
        match self.shared.runs.create_if_absent(&run)? {
            CreateOutcome::Created => {
                info!(run_id = %id, kind, "run created");
                Ok(StartReceipt {
                    run_id: id,
                    created: true,
                    status: run.status,
                })
            }
            CreateOutcome::Existing(existing) => {
                info!(run_id = %id, "start retried for existing run");
                Ok(StartReceipt {
                    run_id: id,
                    created: false,
                    status: existing.status,
                })
            }
        }
    }

    /// Drive the run forward by one invocation
    pub async fn drive(&self, run_id: &str) -> Result<DriveOutcome, DriverError> {
        let Some(_lock) = RunLock::try_acquire(&self.state_dir, run_id)? else {
            return Err(DriverError::Locked(run_id.to_string()));
        };

        let mut run = self.load(run_id)?;
        if run.is_terminal() {
            return Err(DriverError::Terminal(StatusError {
                id: run.id,
                status: run.status,
            }));
        }
        let Some(workflow) = self.workflows.get(&run.kind) else {
            return Err(DriverError::UnknownWorkflow(run.kind));
        };

        run.set_status(RunStatus::Running, &self.clock)?;
        self.shared.runs.save(&run)?;

        let cache = self.shared.ledger.load_all(run_id)?;
        let input = run.input.clone();
        let ctx = Context::new(
            run,
            cache,
            self.shared.clone(),
            self.clock.clone(),
            self.id_gen.clone(),
        );
        let result = workflow.run(&ctx, &input).await;
        let mut run = ctx.finish();

        let outcome = match result {
            Ok(WorkflowOutcome::Completed(value)) => {
                run.complete(value.clone(), &self.clock)?;
                info!(run_id, "run completed");
                DriveOutcome::Completed(value)
            }
            Ok(WorkflowOutcome::Rejected(value)) => {
                run.reject(value.clone(), &self.clock)?;
                info!(run_id, "run rejected");
                DriveOutcome::Rejected(value)
            }
            Err(WorkflowError::Suspended(suspension)) => {
                let status = suspended_status(&suspension);
                run.set_status(status, &self.clock)?;
                info!(run_id, wait = %suspension.wait_name, %status, "run suspended");
                DriveOutcome::Suspended {
                    status,
                    wait_name: suspension.wait_name,
                }
            }
            Err(WorkflowError::Cancelled { reason }) => {
                run.fail(FailureInfo::cancelled(reason.as_deref()), &self.clock)?;
                info!(run_id, "run cancelled");
                DriveOutcome::Cancelled
            }
            Err(error) => {
                // Resumable fault: the ledger is intact, so a later drive
                // (after a code fix) replays past everything committed
                let info = error.to_failure_info();
                warn!(run_id, %error, "invocation faulted");
                run.record_fault(info.clone(), &self.clock);
                DriveOutcome::Faulted(info)
            }
        };
        self.shared.runs.save(&run)?;
        Ok(outcome)
    }

    /// Request cooperative cancellation and drive the run to its end
    ///
    /// The marker is a ledger record, so it survives crashes and takes
    /// effect at the next step boundary even if this drive loses the lock.
    pub async fn cancel(
        &self,
        run_id: &str,
        reason: Option<&str>,
    ) -> Result<DriveOutcome, DriverError> {
        let run = self.load(run_id)?;
        if run.is_terminal() {
            return Err(DriverError::Terminal(StatusError {
                id: run.id,
                status: run.status,
            }));
        }
        let marker = StepRecord::new(
            run_id,
            CANCEL_STEP,
            StepOutcome::Cancelled {
                reason: reason.map(str::to_string),
            },
            &self.clock,
        );
        self.shared.ledger.commit(&marker)?;
        self.drive(run_id).await
    }

    pub fn status(&self, run_id: &str) -> Result<WorkflowRun, DriverError> {
        self.load(run_id)
    }

    /// Pending suspension tokens for one run; what an operator needs to
    /// answer an approval or settle an external wait by hand
    pub fn pending_waits(&self, run_id: &str) -> Result<Vec<SuspensionToken>, DriverError> {
        Ok(self
            .shared
            .registry
            .pending()?
            .into_iter()
            .filter(|token| token.run_id == run_id)
            .collect())
    }

    pub fn list(&self) -> Result<Vec<RunSummary>, DriverError> {
        let mut summaries = Vec::new();
        for id in self.shared.runs.list()? {
            summaries.push(self.load(&id)?.summary());
        }
        Ok(summaries)
    }

    fn load(&self, run_id: &str) -> Result<WorkflowRun, DriverError> {
        self.shared.runs.load(run_id).map_err(|e| match e {
            StorageError::RunNotFound(id) => DriverError::RunNotFound(id),
            e => DriverError::Storage(e),
        })
    }

    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }

    pub(crate) fn clock(&self) -> &C {
        &self.clock
    }

    pub(crate) fn id_gen(&self) -> &I {
        &self.id_gen
    }
}

/// Timer waits keep the run `Running`; only callback waits park it in an
/// awaiting status
fn suspended_status(suspension: &Suspension) -> RunStatus {
    match &suspension.wake {
        WakeReason::At(_) => RunStatus::Running,
        WakeReason::Callback { kind, .. } => kind.status(),
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
