// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tether - durable workflow controller CLI

mod commands;
mod output;
mod workflows;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{cancel, list, resolve, start, status, sweep};
use std::path::PathBuf;
use tether_core::Config;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "tether",
    version,
    about = "Durable checkpoint/replay workflows for long-running agents"
)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = "tether.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a workflow run
    Start(start::StartArgs),
    /// Deliver a callback resolution for a token
    Resolve(resolve::ResolveArgs),
    /// Show a run and its pending waits
    Status(status::StatusArgs),
    /// List all runs
    List(list::ListArgs),
    /// Cancel a run
    Cancel(cancel::CancelArgs),
    /// Expire overdue waits and wake due runs
    Sweep(sweep::SweepArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;
    let engine = commands::build(config)?;

    match cli.command {
        Commands::Start(args) => start::start(&engine, args).await,
        Commands::Resolve(args) => resolve::resolve(&engine, args).await,
        Commands::Status(args) => status::status(&engine, args),
        Commands::List(args) => list::list(&engine, args),
        Commands::Cancel(args) => cancel::cancel(&engine, args).await,
        Commands::Sweep(args) => sweep::sweep(&engine, args).await,
    }
}
