// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tether list` - Summarize every run

use super::Engine;
use crate::output::OutputFormat;
use anyhow::Result;
use clap::Args;

#[derive(Args)]
pub struct ListArgs {
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

pub fn list(engine: &Engine, args: ListArgs) -> Result<()> {
    let summaries = engine.driver.list()?;
    args.format.print_all(&summaries);
    Ok(())
}
