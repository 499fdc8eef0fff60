// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tether sweep` - Expire overdue waits and wake due runs

use super::Engine;
use anyhow::Result;
use clap::Args;

#[derive(Args)]
pub struct SweepArgs {
    /// Keep sweeping at the configured interval instead of exiting
    #[arg(long)]
    pub watch: bool,
}

pub async fn sweep(engine: &Engine, args: SweepArgs) -> Result<()> {
    if args.watch {
        engine.sweeper.run(engine.config.sweep_interval).await?;
        return Ok(());
    }
    let report = engine.sweeper.sweep_once().await?;
    println!("expired: {}, woken: {}", report.expired, report.woken);
    Ok(())
}
