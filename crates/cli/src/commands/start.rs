// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tether start <kind>` - Start a workflow run and drive its first invocation

use super::Engine;
use anyhow::Result;
use clap::Args;

#[derive(Args)]
pub struct StartArgs {
    /// Workflow kind (e.g. "report")
    pub kind: String,

    /// Run id; generated when omitted. Reusing an id returns the existing run
    #[arg(long)]
    pub id: Option<String>,

    /// Workflow input as JSON
    #[arg(long, default_value = "{}")]
    pub input: String,
}

pub async fn start(engine: &Engine, args: StartArgs) -> Result<()> {
    let input: serde_json::Value = serde_json::from_str(&args.input)?;
    let receipt = engine.driver.start(args.id, &args.kind, input)?;
    if receipt.created {
        println!("Started: {}", receipt.run_id);
    } else {
        println!("Already exists: {} ({})", receipt.run_id, receipt.status);
        return Ok(());
    }

    let outcome = engine.driver.drive(&receipt.run_id).await?;
    println!("{:?}", outcome);
    Ok(())
}
