// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Duration;
use serde_json::json;
use tether_core::{Clock, FakeClock, StepValue, TokenState};

fn token(clock: &FakeClock, id: &str, run_id: &str, wait: &str) -> SuspensionToken {
    SuspensionToken::new(id, run_id, wait, clock.now() + Duration::hours(4), clock)
}

fn success(clock: &FakeClock) -> TokenResolution {
    TokenResolution::Success {
        payload: StepValue::Inline {
            value: json!({"approved": true}),
        },
        resolved_at: clock.now(),
    }
}

#[test]
fn register_then_get_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let registry = SuspensionRegistry::open(dir.path()).unwrap();
    let clock = FakeClock::new();

    registry
        .register(&token(&clock, "t1", "w1", "approval"))
        .unwrap();

    let loaded = registry.get("t1").unwrap();
    assert_eq!(loaded.run_id, "w1");
    assert_eq!(loaded.state(), TokenState::Pending);
    assert_eq!(
        registry.lookup_wait("w1", "approval").unwrap().as_deref(),
        Some("t1")
    );
}

#[test]
fn reregistering_same_token_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let registry = SuspensionRegistry::open(dir.path()).unwrap();
    let clock = FakeClock::new();

    let t = token(&clock, "t1", "w1", "approval");
    registry.register(&t).unwrap();
    registry.register(&t).unwrap();
}

#[test]
fn different_token_for_bound_wait_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let registry = SuspensionRegistry::open(dir.path()).unwrap();
    let clock = FakeClock::new();

    registry
        .register(&token(&clock, "t1", "w1", "approval"))
        .unwrap();
    assert!(matches!(
        registry.register(&token(&clock, "t2", "w1", "approval")),
        Err(StorageError::WaitConflict { .. })
    ));
}

#[test]
fn first_resolution_wins() {
    let dir = tempfile::tempdir().unwrap();
    let registry = SuspensionRegistry::open(dir.path()).unwrap();
    let clock = FakeClock::new();

    registry
        .register(&token(&clock, "t1", "w1", "approval"))
        .unwrap();

    assert!(matches!(
        registry.resolve("t1", &success(&clock)).unwrap(),
        ResolveOutcome::Resolved
    ));

    let expiry = TokenResolution::Expired {
        expired_at: clock.now(),
    };
    match registry.resolve("t1", &expiry).unwrap() {
        ResolveOutcome::AlreadyResolved(TokenResolution::Success { .. }) => {}
        other => panic!("expected the success resolution to stand, got {:?}", other),
    }
    assert_eq!(registry.get("t1").unwrap().state(), TokenState::ResolvedSuccess);
}

#[test]
fn resolving_unknown_token_errors() {
    let dir = tempfile::tempdir().unwrap();
    let registry = SuspensionRegistry::open(dir.path()).unwrap();
    let clock = FakeClock::new();

    assert!(matches!(
        registry.resolve("nope", &success(&clock)),
        Err(StorageError::TokenNotFound(_))
    ));
}

#[test]
fn malformed_token_behaves_like_unknown() {
    let dir = tempfile::tempdir().unwrap();
    let registry = SuspensionRegistry::open(dir.path()).unwrap();

    assert!(matches!(
        registry.get("../../etc/passwd"),
        Err(StorageError::TokenNotFound(_))
    ));
}

#[test]
fn consume_leaves_a_resolution_tombstone() {
    let dir = tempfile::tempdir().unwrap();
    let registry = SuspensionRegistry::open(dir.path()).unwrap();
    let clock = FakeClock::new();

    registry
        .register(&token(&clock, "t1", "w1", "approval"))
        .unwrap();
    registry.resolve("t1", &success(&clock)).unwrap();
    registry.consume("t1").unwrap();

    assert!(matches!(
        registry.get("t1"),
        Err(StorageError::TokenNotFound(_))
    ));
    // The marker outlives the registration, so a late duplicate signal is
    // distinguishable from a token that never existed
    assert!(matches!(
        registry.resolution("t1").unwrap(),
        Some(TokenResolution::Success { .. })
    ));
    assert_eq!(registry.resolution("never-registered").unwrap(), None);
    // Replay can still discover which token the wait was bound to
    assert_eq!(
        registry.lookup_wait("w1", "approval").unwrap().as_deref(),
        Some("t1")
    );
}

#[test]
fn settled_lists_unconsumed_resolutions_only() {
    let dir = tempfile::tempdir().unwrap();
    let registry = SuspensionRegistry::open(dir.path()).unwrap();
    let clock = FakeClock::new();

    registry
        .register(&token(&clock, "t1", "w1", "approval"))
        .unwrap();
    registry
        .register(&token(&clock, "t2", "w2", "research"))
        .unwrap();
    registry.resolve("t1", &success(&clock)).unwrap();

    let settled = registry.settled().unwrap();
    assert_eq!(settled.len(), 1);
    assert_eq!(settled[0].token, "t1");

    registry.consume("t1").unwrap();
    assert!(registry.settled().unwrap().is_empty());
    assert_eq!(registry.pending().unwrap().len(), 1);
}

#[test]
fn pending_excludes_resolved_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let registry = SuspensionRegistry::open(dir.path()).unwrap();
    let clock = FakeClock::new();

    registry
        .register(&token(&clock, "t1", "w1", "approval"))
        .unwrap();
    clock.advance(std::time::Duration::from_secs(1));
    registry
        .register(&token(&clock, "t2", "w2", "research"))
        .unwrap();
    registry.resolve("t1", &success(&clock)).unwrap();

    let pending = registry.pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].token, "t2");
}
