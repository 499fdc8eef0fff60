// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tether-core: Core library for the tether durable workflow controller
//!
//! This crate provides:
//! - The workflow run state machine and its status transitions
//! - Step record and suspension token types shared by the ledger and registry
//! - Clock and id-generation abstractions for deterministic testing
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod id;
pub mod run;
pub mod step;
pub mod token;

// Re-exports
pub use clock::{chrono_duration, Clock, FakeClock, SystemClock};
pub use config::{Config, ConfigError};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use run::{RunStatus, RunSummary, StatusError, WorkflowRun};
pub use step::{
    valid_name, ArtifactRef, FailureInfo, StepOutcome, StepRecord, StepValue, CANCEL_STEP,
};
pub use token::{SuspensionToken, TokenResolution, TokenState};
