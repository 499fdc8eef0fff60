// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tether-engine: checkpoint/replay execution for durable workflows
//!
//! A workflow function runs one invocation at a time: it replays committed
//! steps from the ledger, executes at most one new stretch of work, and
//! either finishes or suspends on a wait. Callbacks, timer sweeps, and
//! cancellations each trigger a fresh invocation through the driver.

mod context;
mod dispatch;
mod driver;
mod error;
mod gateway;
mod sweep;
mod workflow;

pub use context::{Branch, CallbackHandle, Context};
pub use dispatch::{
    invoke_with_callback, DispatchEnvelope, DispatchError, Dispatcher, FakeDispatcher,
    HttpDispatcher,
};
pub use driver::{DriveOutcome, Driver, DriverConfig, StartReceipt};
pub use error::{DriverError, GatewayError, Suspension, WaitKind, WakeReason, WorkflowError};
pub use gateway::{Ack, CallbackGateway, CallbackRequest, CallbackStatus};
pub use sweep::{SweepReport, Sweeper};
pub use workflow::{Workflow, WorkflowOutcome, WorkflowSet};
