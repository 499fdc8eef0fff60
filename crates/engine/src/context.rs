// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution context: the durable primitives a workflow function runs through
//!
//! The workflow function is re-entered from the top on every invocation.
//! Each primitive first consults the step cache loaded from the ledger: a
//! recorded step is replayed without executing its body, an unrecorded one
//! executes and commits exactly one record. An unresolved wait returns
//! [`WorkflowError::Suspended`], which the caller propagates with `?` so the
//! whole invocation unwinds to the driver.

use crate::error::{Suspension, WaitKind, WakeReason, WorkflowError};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tether_core::{
    chrono_duration, valid_name, ArtifactRef, Clock, FailureInfo, IdGen, StepOutcome, StepRecord,
    StepValue, SuspensionToken, TokenResolution, WorkflowRun, CANCEL_STEP,
};
use tether_storage::{
    ArtifactStore, CommitOutcome, ResolveOutcome, RunStore, StepLedger, StorageError,
    SuspensionRegistry,
};
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Stores and settings shared by the driver and every context it builds
#[derive(Clone)]
pub(crate) struct Shared {
    pub(crate) ledger: StepLedger,
    pub(crate) registry: SuspensionRegistry,
    pub(crate) runs: RunStore,
    pub(crate) artifacts: Arc<dyn ArtifactStore>,
    pub(crate) inline_threshold: usize,
    pub(crate) callback_base_url: String,
}

/// What a workflow hands to an external system so it can signal completion
#[derive(Clone, Debug)]
pub struct CallbackHandle {
    pub token: String,
    pub callback_url: String,
}

/// One branch of a [`Context::parallel`] gather
///
/// Branches run as spawned tasks, so their futures are `'static`: capture
/// owned data, not the context.
pub struct Branch {
    name: String,
    future: Pin<Box<dyn Future<Output = Result<serde_json::Value, FailureInfo>> + Send + 'static>>,
}

impl Branch {
    pub fn new(
        name: impl Into<String>,
        future: impl Future<Output = Result<serde_json::Value, FailureInfo>> + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            future: Box::pin(future),
        }
    }
}

/// Per-invocation execution context for one run
pub struct Context<C: Clock, I: IdGen> {
    run_id: String,
    run: Mutex<WorkflowRun>,
    cache: Mutex<HashMap<String, StepRecord>>,
    shared: Shared,
    clock: C,
    id_gen: I,
}

impl<C: Clock, I: IdGen> Context<C, I> {
    pub(crate) fn new(
        run: WorkflowRun,
        cache: HashMap<String, StepRecord>,
        shared: Shared,
        clock: C,
        id_gen: I,
    ) -> Self {
        Self {
            run_id: run.id.clone(),
            run: Mutex::new(run),
            cache: Mutex::new(cache),
            shared,
            clock,
            id_gen,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Execute a checkpointed step, or replay its recorded outcome
    ///
    /// Once a record exists under this name, every future invocation returns
    /// the recorded outcome without calling the body again. A crash between
    /// body success and commit re-runs the body on the next invocation, so
    /// bodies must be idempotent.
    pub async fn step<F, Fut>(&self, name: &str, body: F) -> Result<serde_json::Value, WorkflowError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<serde_json::Value, FailureInfo>>,
    {
        self.check_cancelled()?;
        check_step_name(name)?;
        if let Some(record) = self.recorded(name) {
            debug!(run_id = %self.run_id, step = name, "replaying recorded step");
            return self.replay_step(name, &record);
        }

        info!(run_id = %self.run_id, step = name, "executing step");
        let outcome = match body().await {
            Ok(value) => StepOutcome::Success {
                value: self.store_value(name, &value)?,
            },
            Err(error) => StepOutcome::Failure { error },
        };
        let committed = self.commit(name, outcome)?;
        self.replay_step(name, &committed)
    }

    /// Durable timer: suspends until the clock passes `duration` from the
    /// first time this wait was reached
    pub async fn wait(&self, name: &str, duration: Duration) -> Result<(), WorkflowError> {
        self.check_cancelled()?;
        check_step_name(name)?;
        let record = match self.recorded(name) {
            Some(record) => record,
            None => {
                let resume_at = self.clock.now() + chrono_duration(duration);
                self.commit(name, StepOutcome::Timer { resume_at })?
            }
        };
        match record.outcome {
            StepOutcome::Timer { resume_at } => {
                if self.clock.now() >= resume_at {
                    Ok(())
                } else {
                    Err(WorkflowError::Suspended(Suspension {
                        wait_name: name.to_string(),
                        wake: WakeReason::At(resume_at),
                    }))
                }
            }
            ref other => Err(divergence(name, "a timer record", other)),
        }
    }

    /// Register (or re-attach to) the callback token for a named wait
    ///
    /// Idempotent across invocations: the wait index binds the name to the
    /// first token minted, so replay hands out the same handle. Call this
    /// before dispatching work that will eventually signal the token.
    pub fn ensure_callback(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<CallbackHandle, WorkflowError> {
        self.check_cancelled()?;
        check_step_name(name)?;
        let token = match self.shared.registry.lookup_wait(&self.run_id, name)? {
            Some(token) => token,
            None => {
                let token = self.id_gen.next();
                let deadline = self.clock.now() + chrono_duration(timeout);
                let registration =
                    SuspensionToken::new(&token, &self.run_id, name, deadline, &self.clock);
                self.shared.registry.register(&registration)?;
                info!(run_id = %self.run_id, wait = name, "registered callback token");
                token
            }
        };
        Ok(self.handle_for(&token))
    }

    /// Suspend until an external system resolves the wait's token
    pub async fn wait_for_callback(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, WorkflowError> {
        self.await_callback(name, timeout, WaitKind::External).await
    }

    /// Suspend until a human approves or declines
    pub async fn wait_for_approval(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, WorkflowError> {
        self.await_callback(name, timeout, WaitKind::Approval).await
    }

    async fn await_callback(
        &self,
        name: &str,
        timeout: Duration,
        kind: WaitKind,
    ) -> Result<serde_json::Value, WorkflowError> {
        self.check_cancelled()?;
        check_step_name(name)?;
        if let Some(record) = self.recorded(name) {
            debug!(run_id = %self.run_id, wait = name, "replaying settled wait");
            return self.replay_wait(name, &record);
        }

        let handle = self.ensure_callback(name, timeout)?;
        let token = self.shared.registry.get(&handle.token)?;
        let resolution = match token.resolution.clone() {
            Some(resolution) => resolution,
            None if token.is_overdue(self.clock.now()) => {
                // Settle the expiry here; a concurrent callback may still win
                let expiry = TokenResolution::Expired {
                    expired_at: self.clock.now(),
                };
                match self.shared.registry.resolve(&token.token, &expiry)? {
                    ResolveOutcome::Resolved => expiry,
                    ResolveOutcome::AlreadyResolved(existing) => existing,
                }
            }
            None => {
                return Err(WorkflowError::Suspended(Suspension {
                    wait_name: name.to_string(),
                    wake: WakeReason::Callback {
                        token: token.token.clone(),
                        kind,
                    },
                }));
            }
        };

        let outcome = match resolution {
            TokenResolution::Success { payload, .. } => StepOutcome::Success { value: payload },
            TokenResolution::Failure { error, .. } => StepOutcome::Failure { error },
            TokenResolution::Expired { .. } => StepOutcome::TimedOut {
                deadline: token.deadline,
            },
        };
        let committed = self.commit(name, outcome)?;
        self.shared.registry.consume(&token.token)?;
        self.replay_wait(name, &committed)
    }

    /// Run independent branches concurrently, each checkpointed under its
    /// own name
    ///
    /// Results come back in branch order. Already-recorded branches replay
    /// without running; fresh ones execute concurrently and commit in branch
    /// order, so a crash mid-gather loses at most the uncommitted tail. If
    /// any branch failed, the first failure (in branch order) is returned
    /// after all commits land.
    pub async fn parallel(
        &self,
        branches: Vec<Branch>,
    ) -> Result<Vec<serde_json::Value>, WorkflowError> {
        self.check_cancelled()?;
        let mut seen = HashSet::new();
        for branch in &branches {
            check_step_name(&branch.name)?;
            if !seen.insert(branch.name.clone()) {
                return Err(WorkflowError::InvalidStepName(branch.name.clone()));
            }
        }

        let mut names = Vec::with_capacity(branches.len());
        let mut slots: Vec<Option<StepRecord>> = Vec::with_capacity(branches.len());
        let mut set: JoinSet<(usize, Result<serde_json::Value, FailureInfo>)> = JoinSet::new();
        for (idx, branch) in branches.into_iter().enumerate() {
            names.push(branch.name);
            match self.recorded(&names[idx]) {
                Some(record) => slots.push(Some(record)),
                None => {
                    slots.push(None);
                    let future = branch.future;
                    set.spawn(async move { (idx, future.await) });
                }
            }
        }

        let mut fresh: HashMap<usize, Result<serde_json::Value, FailureInfo>> = HashMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, result)) => {
                    fresh.insert(idx, result);
                }
                Err(e) => {
                    return Err(WorkflowError::Step {
                        name: "parallel".to_string(),
                        error: FailureInfo::new("branch_panicked", e.to_string()),
                    });
                }
            }
        }

        let mut results = Vec::with_capacity(slots.len());
        let mut first_failure: Option<(String, FailureInfo)> = None;
        for (idx, slot) in slots.into_iter().enumerate() {
            let record = match slot {
                Some(record) => record,
                None => {
                    let outcome = match fresh.remove(&idx) {
                        Some(Ok(value)) => StepOutcome::Success {
                            value: self.store_value(&names[idx], &value)?,
                        },
                        Some(Err(error)) => StepOutcome::Failure { error },
                        None => {
                            return Err(WorkflowError::NonDeterministic {
                                name: names[idx].clone(),
                                detail: "branch produced no result".to_string(),
                            });
                        }
                    };
                    self.commit(&names[idx], outcome)?
                }
            };
            match &record.outcome {
                StepOutcome::Success { value } => results.push(self.resolve_value(value)?),
                StepOutcome::Failure { error } => {
                    if first_failure.is_none() {
                        first_failure = Some((names[idx].clone(), error.clone()));
                    }
                    results.push(serde_json::Value::Null);
                }
                other => return Err(divergence(&names[idx], "a step record", other)),
            }
        }

        match first_failure {
            Some((name, error)) => Err(WorkflowError::Step { name, error }),
            None => Ok(results),
        }
    }

    /// Take back the run record with all checkpoint updates applied
    pub(crate) fn finish(self) -> WorkflowRun {
        self.run.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn check_cancelled(&self) -> Result<(), WorkflowError> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(record) = cache.get(CANCEL_STEP) {
            if let StepOutcome::Cancelled { reason } = &record.outcome {
                return Err(WorkflowError::Cancelled {
                    reason: reason.clone(),
                });
            }
        }
        Ok(())
    }

    fn recorded(&self, name: &str) -> Option<StepRecord> {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    /// Commit a record; a lost race yields to the existing record
    fn commit(&self, name: &str, outcome: StepOutcome) -> Result<StepRecord, WorkflowError> {
        let record = StepRecord::new(&self.run_id, name, outcome, &self.clock);
        let committed = match self.shared.ledger.commit(&record)? {
            CommitOutcome::Committed => record,
            CommitOutcome::Superseded(existing) => {
                debug!(run_id = %self.run_id, step = name, "commit superseded by existing record");
                existing
            }
        };
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), committed.clone());

        let mut run = self.run.lock().unwrap_or_else(|e| e.into_inner());
        run.checkpoint(name, &self.clock);
        self.shared.runs.save(&run)?;
        Ok(committed)
    }

    fn replay_step(&self, name: &str, record: &StepRecord) -> Result<serde_json::Value, WorkflowError> {
        match &record.outcome {
            StepOutcome::Success { value } => self.resolve_value(value),
            StepOutcome::Failure { error } => Err(WorkflowError::Step {
                name: name.to_string(),
                error: error.clone(),
            }),
            other => Err(divergence(name, "a step record", other)),
        }
    }

    fn replay_wait(&self, name: &str, record: &StepRecord) -> Result<serde_json::Value, WorkflowError> {
        match &record.outcome {
            StepOutcome::Success { value } => self.resolve_value(value),
            StepOutcome::Failure { error } => Err(WorkflowError::Callback {
                name: name.to_string(),
                error: error.clone(),
            }),
            StepOutcome::TimedOut { .. } => Err(WorkflowError::CallbackTimeout {
                name: name.to_string(),
            }),
            other => Err(divergence(name, "a settled wait record", other)),
        }
    }

    /// Inline small values; offload anything over the threshold
    fn store_value(
        &self,
        name: &str,
        value: &serde_json::Value,
    ) -> Result<StepValue, WorkflowError> {
        let bytes = serde_json::to_vec(value).map_err(StorageError::Json)?;
        if bytes.len() <= self.shared.inline_threshold {
            return Ok(StepValue::Inline {
                value: value.clone(),
            });
        }
        let key = format!("runs/{}/{}.json", self.run_id, name);
        self.shared.artifacts.put(&key, &bytes)?;
        info!(run_id = %self.run_id, step = name, size = bytes.len(), "offloaded step value");
        Ok(StepValue::Artifact {
            reference: ArtifactRef {
                key,
                size_bytes: bytes.len() as u64,
            },
        })
    }

    fn resolve_value(&self, value: &StepValue) -> Result<serde_json::Value, WorkflowError> {
        match value {
            StepValue::Inline { value } => Ok(value.clone()),
            StepValue::Artifact { reference } => {
                let bytes = self.shared.artifacts.get(&reference.key)?;
                Ok(serde_json::from_slice(&bytes).map_err(StorageError::Json)?)
            }
        }
    }

    fn handle_for(&self, token: &str) -> CallbackHandle {
        CallbackHandle {
            token: token.to_string(),
            callback_url: format!(
                "{}/callbacks/{}",
                self.shared.callback_base_url.trim_end_matches('/'),
                token
            ),
        }
    }
}

fn check_step_name(name: &str) -> Result<(), WorkflowError> {
    if valid_name(name) && name != CANCEL_STEP {
        Ok(())
    } else {
        Err(WorkflowError::InvalidStepName(name.to_string()))
    }
}

fn divergence(name: &str, expected: &str, found: &StepOutcome) -> WorkflowError {
    WorkflowError::NonDeterministic {
        name: name.to_string(),
        detail: format!("expected {}, found a {} record", expected, found.kind()),
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
