// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tether-storage: File-backed durable stores for the workflow engine
//!
//! Every shared structure is mutated through a single-operation contract:
//! the step ledger offers commit-if-absent, the suspension registry offers
//! resolve-if-pending. Both are built on an atomic write-if-absent primitive
//! (temp file + hard link), so no separate lock service is needed for
//! correctness; the per-run advisory lock only serializes replay drivers.

mod atomic;

pub mod artifact;
pub mod error;
pub mod ledger;
pub mod lock;
pub mod registry;
pub mod runs;

pub use artifact::{ArtifactStore, FsArtifactStore};
pub use error::StorageError;
pub use ledger::{CommitOutcome, StepLedger};
pub use lock::RunLock;
pub use registry::{ResolveOutcome, SuspensionRegistry};
pub use runs::{CreateOutcome, RunStore};
