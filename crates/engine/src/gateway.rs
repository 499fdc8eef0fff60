// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Callback gateway: the entry point for external completion signals
//!
//! A signal names a token and carries either a result or an error. Settling
//! the token is a compare-and-set in the registry, so duplicate and racing
//! signals are acknowledged without side effects. Delivery then drives the
//! owning run in the same invocation.

use crate::driver::Driver;
use crate::error::{DriverError, GatewayError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tether_core::{ArtifactRef, Clock, FailureInfo, IdGen, StepValue, TokenResolution};
use tether_storage::{ResolveOutcome, StorageError};
use tracing::{info, warn};

/// Signal outcome, as reported by the external system
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallbackStatus {
    Success,
    Failure,
}

/// The wire shape of a completion signal
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallbackRequest {
    pub token: String,
    pub status: CallbackStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Acknowledgement returned to the signal's sender
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ack {
    /// This signal settled the token
    Delivered { run_id: String },
    /// The token was already settled; nothing changed
    Duplicate,
}

pub struct CallbackGateway<C: Clock, I: IdGen> {
    driver: Arc<Driver<C, I>>,
}

impl<C: Clock, I: IdGen> CallbackGateway<C, I> {
    pub fn new(driver: Arc<Driver<C, I>>) -> Self {
        Self { driver }
    }

    /// Validate, settle, and (on delivery) drive the owning run
    pub async fn handle(&self, request: CallbackRequest) -> Result<Ack, GatewayError> {
        validate(&request)?;

        let shared = self.driver.shared();
        let token = match shared.registry.get(&request.token) {
            Ok(token) => token,
            Err(StorageError::TokenNotFound(_)) => {
                // A tombstoned resolution means the run already consumed
                // this wait; the signal is a late duplicate
                if shared.registry.resolution(&request.token)?.is_some() {
                    info!("duplicate callback for a consumed token ignored");
                    return Ok(Ack::Duplicate);
                }
                // Do not reveal whether the token ever existed
                warn!("callback for unknown token");
                return Err(GatewayError::UnknownToken);
            }
            Err(e) => return Err(e.into()),
        };

        let now = self.driver.clock().now();
        let resolution = match request.status {
            CallbackStatus::Success => {
                let value = request.result.unwrap_or(serde_json::Value::Null);
                TokenResolution::Success {
                    payload: self.store_payload(&request.token, &value)?,
                    resolved_at: now,
                }
            }
            CallbackStatus::Failure => TokenResolution::Failure {
                error: FailureInfo::new(
                    "callback_failure",
                    request.error.unwrap_or_else(|| "unspecified".to_string()),
                ),
                resolved_at: now,
            },
        };

        match shared.registry.resolve(&token.token, &resolution)? {
            ResolveOutcome::AlreadyResolved(_) => {
                info!(run_id = %token.run_id, wait = %token.wait_name, "duplicate callback ignored");
                Ok(Ack::Duplicate)
            }
            ResolveOutcome::Resolved => {
                info!(run_id = %token.run_id, wait = %token.wait_name, "callback delivered");
                self.drive_owner(&token.run_id).await;
                Ok(Ack::Delivered {
                    run_id: token.run_id,
                })
            }
        }
    }

    /// Progress the run now that its wait is settled. Failures here are
    /// logged, not returned: the resolution is durable and the next sweep
    /// or signal will drive the run again.
    async fn drive_owner(&self, run_id: &str) {
        match self.driver.drive(run_id).await {
            Ok(outcome) => info!(run_id, ?outcome, "drove run after callback"),
            Err(DriverError::Locked(_)) => {
                info!(run_id, "run already being driven; resolution will be picked up")
            }
            Err(e) => warn!(run_id, error = %e, "failed to drive run after callback"),
        }
    }

    /// Callback payloads obey the same inline threshold as step values.
    /// Each signal offloads under its own key, referenced only from inside
    /// its resolution, so a signal that loses the resolve race can never
    /// touch the bytes the winning resolution points at.
    fn store_payload(
        &self,
        token: &str,
        value: &serde_json::Value,
    ) -> Result<StepValue, GatewayError> {
        let shared = self.driver.shared();
        let bytes = serde_json::to_vec(value).map_err(StorageError::Json)?;
        if bytes.len() <= shared.inline_threshold {
            return Ok(StepValue::Inline {
                value: value.clone(),
            });
        }
        let key = format!("callbacks/{}/{}.json", token, self.driver.id_gen().next());
        shared.artifacts.put(&key, &bytes)?;
        Ok(StepValue::Artifact {
            reference: ArtifactRef {
                key,
                size_bytes: bytes.len() as u64,
            },
        })
    }
}

fn validate(request: &CallbackRequest) -> Result<(), GatewayError> {
    match request.status {
        CallbackStatus::Success if request.result.is_none() => Err(GatewayError::Invalid(
            "SUCCESS callbacks must carry a result".to_string(),
        )),
        CallbackStatus::Failure if request.error.is_none() => Err(GatewayError::Invalid(
            "FAILURE callbacks must carry an error".to_string(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
