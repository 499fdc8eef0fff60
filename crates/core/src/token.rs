// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Suspension tokens
//!
//! A token correlates an external completion signal to one suspended wait.
//! It is resolved exactly once: the first resolution (success, failure, or
//! expiry) wins and later signals are acknowledged as duplicates.

use crate::clock::Clock;
use crate::step::{FailureInfo, StepValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resolution state, derived from the optional resolution payload
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
    Pending,
    ResolvedSuccess,
    ResolvedFailure,
    Expired,
}

/// The recorded outcome of a wait
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum TokenResolution {
    Success {
        payload: StepValue,
        resolved_at: DateTime<Utc>,
    },
    Failure {
        error: FailureInfo,
        resolved_at: DateTime<Utc>,
    },
    Expired {
        expired_at: DateTime<Utc>,
    },
}

/// An outstanding (or resolved) wait registration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuspensionToken {
    pub token: String,
    pub run_id: String,
    pub wait_name: String,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<TokenResolution>,
}

impl SuspensionToken {
    pub fn new(
        token: impl Into<String>,
        run_id: impl Into<String>,
        wait_name: impl Into<String>,
        deadline: DateTime<Utc>,
        clock: &impl Clock,
    ) -> Self {
        Self {
            token: token.into(),
            run_id: run_id.into(),
            wait_name: wait_name.into(),
            created_at: clock.now(),
            deadline,
            resolution: None,
        }
    }

    pub fn state(&self) -> TokenState {
        match &self.resolution {
            None => TokenState::Pending,
            Some(TokenResolution::Success { .. }) => TokenState::ResolvedSuccess,
            Some(TokenResolution::Failure { .. }) => TokenState::ResolvedFailure,
            Some(TokenResolution::Expired { .. }) => TokenState::Expired,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.resolution.is_none()
    }

    /// Pending and past its deadline: eligible for the expiry sweep
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && now >= self.deadline
    }
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
