// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ID generation abstractions
//!
//! Run ids and suspension tokens both come from an [`IdGen`]. Tokens double
//! as callback credentials, so they must be unguessable; uuid v4 satisfies
//! that. Tests swap in [`SequentialIdGen`] for predictable ids.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Generates unique identifiers
pub trait IdGen: Clone + Send + Sync {
    fn next(&self) -> String;
}

/// uuid v4, rendered without hyphens so ids drop cleanly into URLs and
/// file names
#[derive(Clone, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

/// Predictable `<prefix>-<n>` ids for tests
#[derive(Clone)]
pub struct SequentialIdGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::valid_name;

    #[test]
    fn uuid_ids_are_unique_and_name_safe() {
        let id_gen = UuidIdGen;
        let a = id_gen.next();
        let b = id_gen.next();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        // Tokens become ledger and registry file names
        assert!(valid_name(&a));
    }

    #[test]
    fn sequential_ids_count_up() {
        let id_gen = SequentialIdGen::new("run");
        assert_eq!(id_gen.next(), "run-1");
        assert_eq!(id_gen.next(), "run-2");
    }

    #[test]
    fn sequential_clones_share_the_counter() {
        let a = SequentialIdGen::new("tok");
        let b = a.clone();
        assert_eq!(a.next(), "tok-1");
        assert_eq!(b.next(), "tok-2");
        assert_eq!(a.next(), "tok-3");
    }
}
