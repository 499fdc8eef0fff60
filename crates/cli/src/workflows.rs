// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The report pipeline: research, analysis, human approval, writing
//!
//! Each agent phase is a dispatch plus a callback wait, so the process can
//! exit while an agent works. The approval gate turns a timeout into a
//! decline rather than a fault.

use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tether_core::{Clock, FailureInfo, IdGen};
use tether_engine::{
    invoke_with_callback, Context, Dispatcher, Workflow, WorkflowError, WorkflowOutcome,
};

const RESEARCH_TIMEOUT: Duration = Duration::from_secs(4 * 3600);
const ANALYSIS_TIMEOUT: Duration = Duration::from_secs(2 * 3600);
const WRITING_TIMEOUT: Duration = Duration::from_secs(3600);

pub struct ReportWorkflow {
    dispatcher: Arc<dyn Dispatcher>,
    /// Agent endpoints by phase: researcher, analyst, writer
    agents: BTreeMap<String, String>,
    approval_timeout: Duration,
}

impl ReportWorkflow {
    pub fn new(
        dispatcher: Arc<dyn Dispatcher>,
        agents: BTreeMap<String, String>,
        approval_timeout: Duration,
    ) -> Self {
        Self {
            dispatcher,
            agents,
            approval_timeout,
        }
    }

    fn agent(&self, phase: &str) -> Result<&str, WorkflowError> {
        self.agents
            .get(phase)
            .map(String::as_str)
            .ok_or_else(|| WorkflowError::Step {
                name: format!("{}_dispatch", phase),
                error: FailureInfo::new("unconfigured_agent", phase),
            })
    }
}

#[async_trait]
impl<C: Clock, I: IdGen> Workflow<C, I> for ReportWorkflow {
    fn kind(&self) -> &'static str {
        "report"
    }

    async fn run(
        &self,
        ctx: &Context<C, I>,
        input: &serde_json::Value,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let input = input.clone();
        let init = ctx
            .step("init", move || async move {
                match input.get("topic").and_then(serde_json::Value::as_str) {
                    Some(topic) if !topic.trim().is_empty() => Ok(json!({ "topic": topic })),
                    _ => Err(FailureInfo::new(
                        "invalid_input",
                        "input must carry a non-empty string field `topic`",
                    )),
                }
            })
            .await?;
        let topic = init["topic"].clone();

        let findings = invoke_with_callback(
            ctx,
            self.dispatcher.as_ref(),
            "research",
            self.agent("researcher")?,
            json!({ "topic": topic.clone() }),
            RESEARCH_TIMEOUT,
        )
        .await?;

        let analysis = invoke_with_callback(
            ctx,
            self.dispatcher.as_ref(),
            "analysis",
            self.agent("analyst")?,
            json!({ "topic": topic.clone(), "findings": findings.clone() }),
            ANALYSIS_TIMEOUT,
        )
        .await?;

        ctx.step("request_approval", || async {
            Ok(json!({ "requested": true }))
        })
        .await?;
        let decision = match ctx.wait_for_approval("approval", self.approval_timeout).await {
            Ok(decision) => decision,
            Err(WorkflowError::CallbackTimeout { .. }) => {
                json!({ "approved": false, "reason": "approval window elapsed" })
            }
            Err(e) => return Err(e),
        };
        if decision["approved"] != json!(true) {
            return Ok(WorkflowOutcome::Rejected(json!({
                "topic": topic.clone(),
                "reason": decision["reason"],
            })));
        }

        let draft = invoke_with_callback(
            ctx,
            self.dispatcher.as_ref(),
            "writing",
            self.agent("writer")?,
            json!({ "topic": topic.clone(), "findings": findings, "analysis": analysis }),
            WRITING_TIMEOUT,
        )
        .await?;

        let completed_at = ctx.clock().now().to_rfc3339();
        let report = ctx
            .step("finalize", move || async move {
                Ok(json!({
                    "topic": topic,
                    "report": draft,
                    "completed_at": completed_at,
                }))
            })
            .await?;
        Ok(WorkflowOutcome::Completed(report))
    }
}

#[cfg(test)]
#[path = "workflows_tests.rs"]
mod tests;
