// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command implementations, all wired through one [`Engine`]

pub mod cancel;
pub mod list;
pub mod resolve;
pub mod start;
pub mod status;
pub mod sweep;

use crate::workflows::ReportWorkflow;
use anyhow::Result;
use std::sync::Arc;
use tether_core::{Config, SystemClock, UuidIdGen};
use tether_engine::{CallbackGateway, Driver, DriverConfig, HttpDispatcher, Sweeper, WorkflowSet};

/// Everything a command needs, built once from config
pub struct Engine {
    pub driver: Arc<Driver<SystemClock, UuidIdGen>>,
    pub gateway: CallbackGateway<SystemClock, UuidIdGen>,
    pub sweeper: Sweeper<SystemClock, UuidIdGen>,
    pub config: Config,
}

pub fn build(config: Config) -> Result<Engine> {
    let workflows = WorkflowSet::new().register(ReportWorkflow::new(
        Arc::new(HttpDispatcher),
        config.agents.clone(),
        config.default_callback_timeout,
    ));
    let driver = Arc::new(Driver::new(
        DriverConfig::from_config(&config),
        workflows,
        SystemClock,
        UuidIdGen,
    )?);
    Ok(Engine {
        gateway: CallbackGateway::new(driver.clone()),
        sweeper: Sweeper::new(driver.clone()),
        driver,
        config,
    })
}
