// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Expiry sweep: the only ambient activity in the system
//!
//! Suspended runs consume nothing while parked, so something must notice
//! deadlines. Each sweep settles overdue tokens (losing gracefully to any
//! callback that raced it) and re-drives runs that may be able to progress:
//! owners of freshly expired or settled-but-unconsumed tokens, and
//! timer-parked runs left in `RUNNING`.

use crate::driver::Driver;
use crate::error::DriverError;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tether_core::{Clock, IdGen, RunStatus, TokenResolution};
use tether_storage::ResolveOutcome;
use tracing::{info, warn};

/// What one sweep did
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Tokens this sweep settled as expired
    pub expired: usize,
    /// Runs driven forward
    pub woken: usize,
}

pub struct Sweeper<C: Clock, I: IdGen> {
    driver: Arc<Driver<C, I>>,
}

impl<C: Clock, I: IdGen> Sweeper<C, I> {
    pub fn new(driver: Arc<Driver<C, I>>) -> Self {
        Self { driver }
    }

    pub async fn sweep_once(&self) -> Result<SweepReport, DriverError> {
        let shared = self.driver.shared();
        let now = self.driver.clock().now();
        let mut report = SweepReport::default();
        let mut to_drive = BTreeSet::new();

        for token in shared.registry.pending()? {
            if !token.is_overdue(now) {
                continue;
            }
            let expiry = TokenResolution::Expired { expired_at: now };
            match shared.registry.resolve(&token.token, &expiry)? {
                ResolveOutcome::Resolved => {
                    info!(run_id = %token.run_id, wait = %token.wait_name, "token expired");
                    report.expired += 1;
                    to_drive.insert(token.run_id);
                }
                ResolveOutcome::AlreadyResolved(_) => {
                    // A callback won the race; its delivery drives the run
                }
            }
        }

        // A resolution delivered while the owner was locked is durable but
        // unconsumed; re-drive those owners so it gets consumed
        for token in shared.registry.settled()? {
            to_drive.insert(token.run_id);
        }

        // Timer-parked runs stay RUNNING with no pending token, so the sweep
        // is what wakes them once their resume time passes
        for id in shared.runs.list()? {
            let run = shared.runs.load(&id)?;
            if run.status == RunStatus::Running {
                to_drive.insert(id);
            }
        }

        for run_id in to_drive {
            match self.driver.drive(&run_id).await {
                Ok(outcome) => {
                    info!(run_id = %run_id, ?outcome, "sweep drove run");
                    report.woken += 1;
                }
                Err(DriverError::Locked(_)) => {
                    info!(run_id = %run_id, "run busy during sweep");
                }
                Err(DriverError::Terminal(_)) => {}
                Err(e) => warn!(run_id = %run_id, error = %e, "sweep failed to drive run"),
            }
        }
        Ok(report)
    }

    /// Sweep forever at a fixed interval
    pub async fn run(&self, interval: Duration) -> Result<(), DriverError> {
        loop {
            if let Err(e) = self.sweep_once().await {
                warn!(error = %e, "sweep pass failed");
            }
            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
#[path = "sweep_tests.rs"]
mod tests;
