// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Shared harness for engine integration tests: a dispatch-and-approve
//! pipeline wired to fake time, ids, and transport.

use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tether_core::{FakeClock, SequentialIdGen};
use tether_engine::{
    invoke_with_callback, CallbackGateway, CallbackRequest, CallbackStatus, Context, Driver,
    DriverConfig, FakeDispatcher, Sweeper, Workflow, WorkflowError, WorkflowOutcome, WorkflowSet,
};

pub const RESEARCH_TIMEOUT: Duration = Duration::from_secs(4 * 3600);
pub const APPROVAL_TIMEOUT: Duration = Duration::from_secs(24 * 3600);

/// Counters observing how often each effect actually ran
#[derive(Clone, Default)]
pub struct Effects {
    pub approval_requests: Arc<AtomicU32>,
    pub finalize_calls: Arc<AtomicU32>,
}

impl Effects {
    pub fn approval_requests(&self) -> u32 {
        self.approval_requests.load(Ordering::SeqCst)
    }

    pub fn finalize_calls(&self) -> u32 {
        self.finalize_calls.load(Ordering::SeqCst)
    }
}

/// Dispatches research to an agent, asks for approval, finalizes
pub struct AgentPipeline {
    dispatcher: FakeDispatcher,
    effects: Effects,
}

#[async_trait]
impl Workflow<FakeClock, SequentialIdGen> for AgentPipeline {
    fn kind(&self) -> &'static str {
        "agent_pipeline"
    }

    async fn run(
        &self,
        ctx: &Context<FakeClock, SequentialIdGen>,
        input: &serde_json::Value,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let findings = invoke_with_callback(
            ctx,
            &self.dispatcher,
            "research",
            "http://agents/researcher",
            json!({ "topic": input["topic"] }),
            RESEARCH_TIMEOUT,
        )
        .await?;

        let requests = self.effects.approval_requests.clone();
        ctx.step("request_approval", move || async move {
            requests.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "requested": true }))
        })
        .await?;

        let decision = match ctx.wait_for_approval("approval", APPROVAL_TIMEOUT).await {
            Ok(decision) => decision,
            // An unanswered approval is a decline, not a fault
            Err(WorkflowError::CallbackTimeout { .. }) => {
                json!({ "approved": false, "reason": "approval window elapsed" })
            }
            Err(e) => return Err(e),
        };
        if decision["approved"] != json!(true) {
            return Ok(WorkflowOutcome::Rejected(
                json!({ "reason": decision["reason"] }),
            ));
        }

        let calls = self.effects.finalize_calls.clone();
        let report = ctx
            .step("finalize", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!({ "report": findings }))
            })
            .await?;
        Ok(WorkflowOutcome::Completed(report))
    }
}

pub struct Harness {
    pub driver: Arc<Driver<FakeClock, SequentialIdGen>>,
    pub gateway: CallbackGateway<FakeClock, SequentialIdGen>,
    pub sweeper: Sweeper<FakeClock, SequentialIdGen>,
    pub dispatcher: FakeDispatcher,
    pub clock: FakeClock,
    pub effects: Effects,
}

impl Harness {
    /// Build an engine over `state_dir`; call again with the same directory
    /// (and clock) to simulate a process restart
    pub fn new(state_dir: &Path, clock: FakeClock) -> Self {
        let dispatcher = FakeDispatcher::new();
        let effects = Effects::default();
        let workflows = WorkflowSet::new().register(AgentPipeline {
            dispatcher: dispatcher.clone(),
            effects: effects.clone(),
        });
        let driver = Arc::new(
            Driver::new(
                DriverConfig {
                    state_dir: state_dir.to_path_buf(),
                    inline_threshold: 256_000,
                    callback_base_url: "http://localhost:8787".to_string(),
                },
                workflows,
                clock.clone(),
                SequentialIdGen::new("tok"),
            )
            .unwrap(),
        );
        Self {
            gateway: CallbackGateway::new(driver.clone()),
            sweeper: Sweeper::new(driver.clone()),
            driver,
            dispatcher,
            clock,
            effects,
        }
    }

    /// Token the most recent dispatch carried
    pub fn last_dispatched_token(&self) -> String {
        let sent = self.dispatcher.sent();
        sent.last().expect("nothing dispatched").1.callback_token.clone()
    }

    pub async fn send_success(&self, token: &str, result: serde_json::Value) {
        self.gateway
            .handle(CallbackRequest {
                token: token.to_string(),
                status: CallbackStatus::Success,
                result: Some(result),
                error: None,
            })
            .await
            .unwrap();
    }

    /// Token for a named wait, via the driver's pending-wait listing
    pub fn token_for(&self, run_id: &str, wait_name: &str) -> String {
        self.driver
            .pending_waits(run_id)
            .unwrap()
            .into_iter()
            .find(|t| t.wait_name == wait_name)
            .expect("wait not registered")
            .token
    }
}
