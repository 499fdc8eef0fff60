// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tether_core::{FakeClock, SequentialIdGen, WorkflowRun};
use tether_storage::FsArtifactStore;

fn shared_at(dir: &Path, inline_threshold: usize) -> Shared {
    Shared {
        ledger: StepLedger::open(dir).unwrap(),
        registry: SuspensionRegistry::open(dir).unwrap(),
        runs: RunStore::open(dir).unwrap(),
        artifacts: Arc::new(FsArtifactStore::open(dir.join("artifacts")).unwrap()),
        inline_threshold,
        callback_base_url: "http://localhost:8787".to_string(),
    }
}

struct Fixture {
    dir: TempDir,
    clock: FakeClock,
    inline_threshold: usize,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            clock: FakeClock::new(),
            inline_threshold: 256_000,
        }
    }

    /// A fresh invocation context, with the cache loaded from the ledger
    fn ctx(&self) -> Context<FakeClock, SequentialIdGen> {
        let shared = shared_at(self.dir.path(), self.inline_threshold);
        let run = match shared.runs.load("w1") {
            Ok(run) => run,
            Err(_) => {
                let run = WorkflowRun::new("w1", "report", json!({}), &self.clock);
                shared.runs.create_if_absent(&run).unwrap();
                run
            }
        };
        let cache = shared.ledger.load_all("w1").unwrap();
        Context::new(
            run,
            cache,
            shared,
            self.clock.clone(),
            SequentialIdGen::new("tok"),
        )
    }
}

#[tokio::test]
async fn step_executes_once_and_replays() {
    let fx = Fixture::new();
    let calls = AtomicU32::new(0);

    let body = || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({"notes": "done"}))
    };
    let first = fx.ctx().step("research", body).await.unwrap();

    // A later invocation replays without running the body
    let body = || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({"notes": "different"}))
    };
    let second = fx.ctx().step("research", body).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn step_failure_is_recorded_and_replayed() {
    let fx = Fixture::new();

    let err = fx
        .ctx()
        .step("research", || async {
            Err(FailureInfo::new("agent_error", "model unavailable"))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Step { .. }));

    // Replay raises the same failure without re-executing
    let err = fx
        .ctx()
        .step("research", || async { Ok(json!("would succeed now")) })
        .await
        .unwrap_err();
    match err {
        WorkflowError::Step { name, error } => {
            assert_eq!(name, "research");
            assert_eq!(error.error_type, "agent_error");
        }
        other => panic!("expected step failure, got {:?}", other),
    }
}

#[tokio::test]
async fn oversized_values_are_offloaded_and_resolved() {
    let mut fx = Fixture::new();
    fx.inline_threshold = 64;

    let big = json!({ "report": "x".repeat(500) });
    let value = big.clone();
    let returned = fx
        .ctx()
        .step("writing", || async move { Ok(value) })
        .await
        .unwrap();
    assert_eq!(returned, big);

    // The ledger record holds a reference, not the payload
    let record = shared_at(fx.dir.path(), fx.inline_threshold)
        .ledger
        .get("w1", "writing")
        .unwrap()
        .unwrap();
    match record.outcome {
        StepOutcome::Success {
            value: StepValue::Artifact { reference },
        } => assert!(reference.size_bytes > 64),
        other => panic!("expected an artifact reference, got {:?}", other),
    }

    // And replay reads it back through the artifact store
    let replayed = fx
        .ctx()
        .step("writing", || async { Ok(json!(null)) })
        .await
        .unwrap();
    assert_eq!(replayed, big);
}

#[tokio::test]
async fn wait_suspends_until_the_clock_passes() {
    let fx = Fixture::new();

    let err = fx
        .ctx()
        .wait("cooldown", Duration::from_secs(3600))
        .await
        .unwrap_err();
    match err {
        WorkflowError::Suspended(s) => {
            assert_eq!(s.wait_name, "cooldown");
            assert!(matches!(s.wake, WakeReason::At(_)));
        }
        other => panic!("expected suspension, got {:?}", other),
    }

    // Still early: suspends again with the original resume time
    fx.clock.advance(Duration::from_secs(1800));
    assert!(matches!(
        fx.ctx().wait("cooldown", Duration::from_secs(3600)).await,
        Err(WorkflowError::Suspended(_))
    ));

    fx.clock.advance(Duration::from_secs(1801));
    fx.ctx()
        .wait("cooldown", Duration::from_secs(3600))
        .await
        .unwrap();
}

#[tokio::test]
async fn ensure_callback_hands_out_the_same_token_across_invocations() {
    let fx = Fixture::new();

    let first = fx
        .ctx()
        .ensure_callback("research_await", Duration::from_secs(3600))
        .unwrap();
    let second = fx
        .ctx()
        .ensure_callback("research_await", Duration::from_secs(3600))
        .unwrap();

    assert_eq!(first.token, second.token);
    assert_eq!(
        first.callback_url,
        format!("http://localhost:8787/callbacks/{}", first.token)
    );
}

#[tokio::test]
async fn callback_wait_suspends_then_replays_the_resolution() {
    let fx = Fixture::new();
    let timeout = Duration::from_secs(3600);

    let err = fx.ctx().wait_for_callback("research_await", timeout).await.unwrap_err();
    let token = match err {
        WorkflowError::Suspended(Suspension {
            wake: WakeReason::Callback { token, kind },
            ..
        }) => {
            assert_eq!(kind, WaitKind::External);
            token
        }
        other => panic!("expected callback suspension, got {:?}", other),
    };

    let shared = shared_at(fx.dir.path(), fx.inline_threshold);
    shared
        .registry
        .resolve(
            &token,
            &TokenResolution::Success {
                payload: StepValue::Inline {
                    value: json!({"notes": "findings"}),
                },
                resolved_at: fx.clock.now(),
            },
        )
        .unwrap();

    let value = fx.ctx().wait_for_callback("research_await", timeout).await.unwrap();
    assert_eq!(value, json!({"notes": "findings"}));

    // The settled token is gone, but the wait index still maps the name
    assert!(shared.registry.get(&token).is_err());
    assert_eq!(
        shared.registry.lookup_wait("w1", "research_await").unwrap(),
        Some(token)
    );

    // Later invocations replay from the step record alone
    let replayed = fx.ctx().wait_for_callback("research_await", timeout).await.unwrap();
    assert_eq!(replayed, json!({"notes": "findings"}));
}

#[tokio::test]
async fn overdue_callback_wait_times_out() {
    let fx = Fixture::new();
    let timeout = Duration::from_secs(3600);

    assert!(matches!(
        fx.ctx().wait_for_callback("research_await", timeout).await,
        Err(WorkflowError::Suspended(_))
    ));

    fx.clock.advance(Duration::from_secs(3601));
    assert!(matches!(
        fx.ctx().wait_for_callback("research_await", timeout).await,
        Err(WorkflowError::CallbackTimeout { .. })
    ));

    // The timeout is a durable outcome, not re-evaluated against the clock
    assert!(matches!(
        fx.ctx().wait_for_callback("research_await", timeout).await,
        Err(WorkflowError::CallbackTimeout { .. })
    ));
}

#[tokio::test]
async fn approval_wait_parks_in_the_approval_status() {
    let fx = Fixture::new();

    let err = fx
        .ctx()
        .wait_for_approval("approval", Duration::from_secs(3600))
        .await
        .unwrap_err();
    match err {
        WorkflowError::Suspended(Suspension {
            wake: WakeReason::Callback { kind, .. },
            ..
        }) => assert_eq!(kind, WaitKind::Approval),
        other => panic!("expected approval suspension, got {:?}", other),
    }
}

#[tokio::test]
async fn cancellation_marker_stops_every_primitive() {
    let fx = Fixture::new();
    let shared = shared_at(fx.dir.path(), fx.inline_threshold);
    shared
        .ledger
        .commit(&StepRecord::new(
            "w1",
            CANCEL_STEP,
            StepOutcome::Cancelled {
                reason: Some("operator request".to_string()),
            },
            &fx.clock,
        ))
        .unwrap();

    let err = fx
        .ctx()
        .step("research", || async { Ok(json!(null)) })
        .await
        .unwrap_err();
    match err {
        WorkflowError::Cancelled { reason } => {
            assert_eq!(reason.as_deref(), Some("operator request"));
        }
        other => panic!("expected cancellation, got {:?}", other),
    }
    assert!(matches!(
        fx.ctx().wait("cooldown", Duration::from_secs(1)).await,
        Err(WorkflowError::Cancelled { .. })
    ));
}

#[tokio::test]
async fn parallel_returns_results_in_branch_order_and_replays() {
    let fx = Fixture::new();
    let calls = Arc::new(AtomicU32::new(0));

    let branches = |calls: Arc<AtomicU32>| {
        vec![
            Branch::new("fact_check", {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!("facts ok"))
                }
            }),
            Branch::new("style_check", {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!("style ok"))
                }
            }),
        ]
    };

    let results = fx.ctx().parallel(branches(calls.clone())).await.unwrap();
    assert_eq!(results, vec![json!("facts ok"), json!("style ok")]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let replayed = fx.ctx().parallel(branches(calls.clone())).await.unwrap();
    assert_eq!(replayed, results);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn parallel_surfaces_the_first_failure_after_committing_all_branches() {
    let fx = Fixture::new();

    let err = fx
        .ctx()
        .parallel(vec![
            Branch::new("fact_check", async {
                Err(FailureInfo::new("check_failed", "two claims unsupported"))
            }),
            Branch::new("style_check", async { Ok(json!("style ok")) }),
        ])
        .await
        .unwrap_err();
    match err {
        WorkflowError::Step { name, error } => {
            assert_eq!(name, "fact_check");
            assert_eq!(error.error_type, "check_failed");
        }
        other => panic!("expected branch failure, got {:?}", other),
    }

    // Both branches committed despite the failure
    let shared = shared_at(fx.dir.path(), fx.inline_threshold);
    assert!(shared.ledger.get("w1", "fact_check").unwrap().is_some());
    assert!(shared.ledger.get("w1", "style_check").unwrap().is_some());
}

#[tokio::test]
async fn duplicate_branch_names_are_rejected() {
    let fx = Fixture::new();
    assert!(matches!(
        fx.ctx()
            .parallel(vec![
                Branch::new("check", async { Ok(json!(1)) }),
                Branch::new("check", async { Ok(json!(2)) }),
            ])
            .await,
        Err(WorkflowError::InvalidStepName(_))
    ));
}

#[tokio::test]
async fn reserved_and_malformed_step_names_are_rejected() {
    let fx = Fixture::new();
    for name in [CANCEL_STEP, "../escape", "", ".hidden"] {
        assert!(matches!(
            fx.ctx().step(name, || async { Ok(json!(null)) }).await,
            Err(WorkflowError::InvalidStepName(_))
        ));
    }
}

#[tokio::test]
async fn replaying_a_wait_record_as_a_step_is_a_divergence() {
    let fx = Fixture::new();

    assert!(matches!(
        fx.ctx().wait("cooldown", Duration::from_secs(3600)).await,
        Err(WorkflowError::Suspended(_))
    ));

    // Renaming a wait into a step between deployments must be caught
    assert!(matches!(
        fx.ctx().step("cooldown", || async { Ok(json!(null)) }).await,
        Err(WorkflowError::NonDeterministic { .. })
    ));
}
