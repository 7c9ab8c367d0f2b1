//! Contract Test: Partial-Failure Isolation
//!
//! Constraints verified:
//! - A failing hostname never aborts or skips the hostnames after it
//! - Each hostname gets its own result, in input order
//! - Hostnames are processed strictly one after another

mod common;

use autodns_core::{ReconcileOutcome, ReconciliationEngine};
use common::*;

#[tokio::test]
async fn mutation_failure_on_one_hostname_does_not_affect_others() {
    let repo = MockRecordRepository::new()
        .with_record("uuid-c", "c", "home.lan", "10.0.0.1")
        .failing_mutation("b");
    let engine = ReconciliationEngine::new(repo.boxed());

    let results = engine
        .reconcile_all(&hostnames(&["a", "b", "c"]), "home.lan", ip("10.0.0.9"))
        .await;

    let names: Vec<_> = results.iter().map(|r| r.hostname.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert!(matches!(results[0].outcome, ReconcileOutcome::Created { .. }));
    assert!(results[1].outcome.is_failed());
    assert!(matches!(results[2].outcome, ReconcileOutcome::Updated { .. }));

    assert_eq!(
        repo.write_calls(),
        vec![
            Call::Create {
                hostname: "a".to_string(),
                ip: ip("10.0.0.9")
            },
            Call::Reconfigure,
            Call::Create {
                hostname: "b".to_string(),
                ip: ip("10.0.0.9")
            },
            Call::Update {
                id: "uuid-c".to_string(),
                hostname: "c".to_string(),
                ip: ip("10.0.0.9")
            },
            Call::Reconfigure,
        ]
    );
}

#[tokio::test]
async fn lookup_failure_on_one_hostname_does_not_affect_others() {
    let repo = MockRecordRepository::new().failing_lookup("a");
    let engine = ReconciliationEngine::new(repo.boxed());

    let results = engine
        .reconcile_all(&hostnames(&["a", "b"]), "home.lan", ip("10.0.0.9"))
        .await;

    assert!(results[0].outcome.is_failed());
    assert!(matches!(results[1].outcome, ReconcileOutcome::Created { .. }));
    assert_eq!(repo.find_count(), 2);
}

#[tokio::test]
async fn each_hostname_finishes_before_the_next_starts() {
    let repo = MockRecordRepository::new();
    let engine = ReconciliationEngine::new(repo.boxed());

    engine
        .reconcile_all(&hostnames(&["a", "b"]), "home.lan", ip("10.0.0.9"))
        .await;

    let calls = repo.calls();
    let second_find = calls
        .iter()
        .position(|c| *c == Call::Find { hostname: "b".to_string() })
        .expect("b looked up");
    let first_reconfigure = calls
        .iter()
        .position(|c| *c == Call::Reconfigure)
        .expect("a reconfigured");
    assert!(first_reconfigure < second_find, "calls interleaved: {calls:?}");
}

#[tokio::test]
async fn empty_hostname_list_does_nothing() {
    let repo = MockRecordRepository::new();
    let engine = ReconciliationEngine::new(repo.boxed());

    let results = engine.reconcile_all(&[], "home.lan", ip("10.0.0.9")).await;

    assert!(results.is_empty());
    assert!(repo.calls().is_empty());
}
