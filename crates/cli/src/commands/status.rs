// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tether status <run-id>` - Show one run, including its pending waits

use super::Engine;
use crate::output::OutputFormat;
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tether_core::{SuspensionToken, WorkflowRun};

#[derive(Args)]
pub struct StatusArgs {
    /// Run id
    pub run_id: String,

    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct StatusView {
    #[serde(flatten)]
    run: WorkflowRun,
    pending_waits: Vec<SuspensionToken>,
}

impl std::fmt::Display for StatusView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "run:     {}", self.run.id)?;
        writeln!(f, "kind:    {}", self.run.kind)?;
        writeln!(f, "status:  {}", self.run.status)?;
        if let Some(step) = &self.run.current_step {
            writeln!(f, "step:    {}", step)?;
        }
        if let Some(error) = &self.run.error {
            writeln!(f, "error:   {}", error)?;
        }
        if let Some(result) = &self.run.result {
            writeln!(f, "result:  {}", result)?;
        }
        for wait in &self.pending_waits {
            writeln!(
                f,
                "waiting: {} (token {}, deadline {})",
                wait.wait_name, wait.token, wait.deadline
            )?;
        }
        Ok(())
    }
}

pub fn status(engine: &Engine, args: StatusArgs) -> Result<()> {
    let view = StatusView {
        run: engine.driver.status(&args.run_id)?,
        pending_waits: engine.driver.pending_waits(&args.run_id)?,
    };
    args.format.print(&view);
    Ok(())
}
