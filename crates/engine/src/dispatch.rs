// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent dispatch: fire work at an external agent and wait for its callback
//!
//! Dispatch is at-least-once: the dispatch step commits after the send, so a
//! crash in between re-sends on replay. Agents must treat the callback token
//! as the idempotency key. The registry's first-resolution-wins CAS makes a
//! duplicate completion harmless either way.

use crate::context::Context;
use crate::error::WorkflowError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tether_core::{Clock, FailureInfo, IdGen};
use thiserror::Error;
use tracing::info;

/// What an agent receives: the work, plus where to signal completion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DispatchEnvelope {
    pub run_id: String,
    pub step: String,
    pub payload: serde_json::Value,
    pub callback_url: String,
    pub callback_token: String,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("dispatch to {target} failed: {message}")]
    Http { target: String, message: String },
}

/// Transport for handing work to agents
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, target: &str, envelope: &DispatchEnvelope)
        -> Result<(), DispatchError>;
}

/// POSTs the envelope as JSON to the target URL
#[derive(Clone, Default)]
pub struct HttpDispatcher;

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn dispatch(
        &self,
        target: &str,
        envelope: &DispatchEnvelope,
    ) -> Result<(), DispatchError> {
        let target_owned = target.to_string();
        let envelope = envelope.clone();
        let result = tokio::task::spawn_blocking(move || {
            ureq::post(&target_owned)
                .send_json(&envelope)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .await;
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(message)) => Err(DispatchError::Http {
                target: target.to_string(),
                message,
            }),
            Err(e) => Err(DispatchError::Http {
                target: target.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

/// Records envelopes instead of sending them; used in tests
#[derive(Clone, Default)]
pub struct FakeDispatcher {
    sent: Arc<Mutex<Vec<(String, DispatchEnvelope)>>>,
    fail_target: Option<String>,
}

impl FakeDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatches to this target will fail
    pub fn failing(target: impl Into<String>) -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_target: Some(target.into()),
        }
    }

    pub fn sent(&self) -> Vec<(String, DispatchEnvelope)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Dispatcher for FakeDispatcher {
    async fn dispatch(
        &self,
        target: &str,
        envelope: &DispatchEnvelope,
    ) -> Result<(), DispatchError> {
        if self.fail_target.as_deref() == Some(target) {
            return Err(DispatchError::Http {
                target: target.to_string(),
                message: "connection refused".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((target.to_string(), envelope.clone()));
        Ok(())
    }
}

/// Dispatch work to an agent and suspend until its callback resolves
///
/// Expands to two checkpoints: `<name>_dispatch` (the send) and
/// `<name>_await` (the callback wait). The token is minted before the send
/// so the envelope carries it, and replay re-attaches to the same token via
/// the wait index.
pub async fn invoke_with_callback<C: Clock, I: IdGen>(
    ctx: &Context<C, I>,
    dispatcher: &dyn Dispatcher,
    name: &str,
    target: &str,
    payload: serde_json::Value,
    timeout: Duration,
) -> Result<serde_json::Value, WorkflowError> {
    let wait_name = format!("{}_await", name);
    let handle = ctx.ensure_callback(&wait_name, timeout)?;

    let envelope = DispatchEnvelope {
        run_id: ctx.run_id().to_string(),
        step: name.to_string(),
        payload,
        callback_url: handle.callback_url.clone(),
        callback_token: handle.token.clone(),
    };
    let target_owned = target.to_string();
    ctx.step(&format!("{}_dispatch", name), || async {
        info!(step = name, target = %target_owned, "dispatching to agent");
        dispatcher
            .dispatch(&target_owned, &envelope)
            .await
            .map_err(|e| FailureInfo::new("dispatch_error", e.to_string()))?;
        Ok(serde_json::json!({ "dispatched": true, "target": target_owned }))
    })
    .await?;

    ctx.wait_for_callback(&wait_name, timeout).await
}
