// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tether cancel <run-id>` - Cooperatively cancel a run

use super::Engine;
use anyhow::Result;
use clap::Args;

#[derive(Args)]
pub struct CancelArgs {
    /// Run id
    pub run_id: String,

    /// Reason recorded on the run
    #[arg(long)]
    pub reason: Option<String>,
}

pub async fn cancel(engine: &Engine, args: CancelArgs) -> Result<()> {
    let outcome = engine
        .driver
        .cancel(&args.run_id, args.reason.as_deref())
        .await?;
    println!("{:?}", outcome);
    Ok(())
}
