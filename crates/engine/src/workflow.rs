// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow trait and registry

use crate::context::Context;
use crate::error::WorkflowError;
use async_trait::async_trait;
use std::collections::HashMap;
use tether_core::{Clock, IdGen};

/// How a workflow function ended
#[derive(Clone, Debug, PartialEq)]
pub enum WorkflowOutcome {
    Completed(serde_json::Value),
    /// Finished deliberately without producing its deliverable (e.g. an
    /// approval was declined); distinct from a failure
    Rejected(serde_json::Value),
}

/// A deterministic workflow function
///
/// The function is re-executed from the top on every invocation; all effects
/// must go through the [`Context`] so replay can short-circuit them. Code
/// outside context calls must be pure with respect to the input.
#[async_trait]
pub trait Workflow<C: Clock, I: IdGen>: Send + Sync {
    /// Registered kind; the run record stores this so replay can find the
    /// entry point again
    fn kind(&self) -> &'static str;

    async fn run(
        &self,
        ctx: &Context<C, I>,
        input: &serde_json::Value,
    ) -> Result<WorkflowOutcome, WorkflowError>;
}

/// Registry of workflow kinds known to the driver
pub struct WorkflowSet<C: Clock, I: IdGen> {
    workflows: HashMap<&'static str, Box<dyn Workflow<C, I>>>,
}

impl<C: Clock, I: IdGen> Default for WorkflowSet<C, I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock, I: IdGen> WorkflowSet<C, I> {
    pub fn new() -> Self {
        Self {
            workflows: HashMap::new(),
        }
    }

    pub fn register(mut self, workflow: impl Workflow<C, I> + 'static) -> Self {
        self.workflows.insert(workflow.kind(), Box::new(workflow));
        self
    }

    pub fn get(&self, kind: &str) -> Option<&dyn Workflow<C, I>> {
        self.workflows.get(kind).map(|w| w.as_ref())
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.workflows.contains_key(kind)
    }
}
