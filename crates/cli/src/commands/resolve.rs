// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tether resolve <token>` - Deliver a completion signal by hand
//!
//! The same path agents use, exposed for operators: approvals, manual
//! unblocking, and failing a wait whose agent is gone.

use super::Engine;
use anyhow::Result;
use clap::Args;
use tether_engine::{Ack, CallbackRequest, CallbackStatus};

#[derive(Args)]
pub struct ResolveArgs {
    /// Callback token to settle
    pub token: String,

    /// Success payload as JSON; mutually exclusive with --error
    #[arg(long, conflicts_with = "error")]
    pub result: Option<String>,

    /// Failure message
    #[arg(long)]
    pub error: Option<String>,
}

pub async fn resolve(engine: &Engine, args: ResolveArgs) -> Result<()> {
    let request = if let Some(message) = args.error {
        CallbackRequest {
            token: args.token,
            status: CallbackStatus::Failure,
            result: None,
            error: Some(message),
        }
    } else {
        let result = match args.result {
            Some(raw) => serde_json::from_str(&raw)?,
            None => serde_json::Value::Null,
        };
        CallbackRequest {
            token: args.token,
            status: CallbackStatus::Success,
            result: Some(result),
            error: None,
        }
    };

    match engine.gateway.handle(request).await? {
        Ack::Delivered { run_id } => println!("Delivered to run {}", run_id),
        Ack::Duplicate => println!("Already resolved; nothing changed"),
    }
    Ok(())
}
