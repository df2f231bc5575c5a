//! Event log, decision log, and snapshot persistence.

use changesim_core::{
    engine::SimEngine,
    error::SimError,
    store::SimStore,
};

fn setup(variant: &str) -> (SimEngine, SimStore) {
    let engine = SimEngine::build_test("store-test".into(), 42, variant).unwrap();
    let store = SimStore::in_memory().unwrap();
    store.migrate().unwrap();
    let catalog = engine.catalog();
    store
        .insert_run("store-test", 42, &catalog.variant_id, &catalog.version)
        .unwrap();
    (engine, store)
}

#[test]
fn events_are_logged_in_order() {
    let (mut engine, mut store) = setup("change_pulse");

    let events = engine.submit_decision("Team 7", 1, &["town_hall"]).unwrap();
    store.record("store-test", &events).unwrap();
    let events = engine.submit_decision("Team 7", 2, &["peer_training"]).unwrap();
    store.record("store-test", &events).unwrap();

    let types: Vec<String> = store
        .events_for_team("store-test", "Team 7")
        .unwrap()
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(
        types,
        vec![
            "session_started",
            "decision_submitted",
            "decision_submitted",
            "session_completed",
        ]
    );
    assert_eq!(store.event_count("store-test").unwrap(), 4);
}

#[test]
fn decision_rows_carry_round_labels_and_cost() {
    let (mut engine, mut store) = setup("enterprise_rollout");

    let events = engine.submit_decision("Blue", 1, &["phased", "single_vendor"]).unwrap();
    store.record("store-test", &events).unwrap();

    let rows = store.decision_rows(Some("store-test")).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].team, "Blue");
    assert_eq!(rows[0].round, Some(1));
    assert_eq!(rows[0].decision, "Phased + Single Vendor");
    assert_eq!(rows[0].cost, Some(400_000));
    assert_eq!(store.decision_rows(None).unwrap().len(), 1);
}

#[test]
fn rejected_submissions_produce_nothing_to_log() {
    let (mut engine, mut store) = setup("change_pulse");
    store.record("store-test", &engine.start_session("Gold").unwrap()).unwrap();

    assert!(engine.submit_decision("Gold", 1, &["carrier pigeon"]).is_err());
    assert_eq!(store.event_count("store-test").unwrap(), 1);
    assert!(store.decision_rows(Some("store-test")).unwrap().is_empty());
}

/// The session start is logged with the first accepted submission, even
/// when an earlier first attempt was rejected.
#[test]
fn session_start_survives_a_rejected_first_submission() {
    let (mut engine, mut store) = setup("change_pulse");

    assert!(engine.submit_decision("Gold", 1, &["carrier pigeon"]).is_err());
    let events = engine.submit_decision("Gold", 1, &["email_memo"]).unwrap();
    store.record("store-test", &events).unwrap();

    let types: Vec<String> = store
        .events_for_team("store-test", "Gold")
        .unwrap()
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(types, vec!["session_started", "decision_submitted"]);
}

/// A restored session continues exactly where the snapshot left it.
#[test]
fn snapshot_round_trips_through_store_and_resumes() {
    let (mut engine, store) = setup("enterprise_rollout");
    engine.submit_decision("Red", 1, &["big_bang", "single_vendor"]).unwrap();
    engine.submit_decision("Red", 2, &["on_site", "minimum_compliance"]).unwrap();

    let snapshot = engine.snapshot("Red").unwrap();
    store.save_snapshot(&snapshot).unwrap();
    let loaded = store.latest_snapshot("store-test", "Red").unwrap().unwrap();
    assert_eq!(loaded.state, snapshot.state);
    assert!(store.latest_snapshot("store-test", "Nobody").unwrap().is_none());

    let mut resumed = SimEngine::build_test("store-test".into(), 42, "enterprise_rollout").unwrap();
    resumed.restore(loaded).unwrap();
    let state = resumed.state("Red").unwrap();
    assert_eq!(state.round, 3);
    assert_eq!(state.active_scenario.as_deref(), Some("Accessibility Complaint"));

    resumed.submit_decision("Red", 3, &["retrofit"]).unwrap();
    assert!(resumed.summary("Red").is_some());
}

#[test]
fn latest_snapshot_replaces_earlier_ones() {
    let (mut engine, store) = setup("change_pulse");
    engine.submit_decision("t", 1, &["email_memo"]).unwrap();
    store.save_snapshot(&engine.snapshot("t").unwrap()).unwrap();
    engine.submit_decision("t", 2, &["self_study"]).unwrap();
    store.save_snapshot(&engine.snapshot("t").unwrap()).unwrap();

    let loaded = store.latest_snapshot("store-test", "t").unwrap().unwrap();
    assert_eq!(loaded.state.round, 3);
    assert_eq!(loaded.state.history.len(), 2);
}

#[test]
fn snapshot_from_another_variant_is_refused() {
    let (mut engine, _store) = setup("change_pulse");
    engine.submit_decision("t", 1, &["email_memo"]).unwrap();
    let snapshot = engine.snapshot("t").unwrap();

    let mut other = SimEngine::build_test("x".into(), 1, "department_rollout").unwrap();
    let err = other.restore(snapshot).unwrap_err();
    assert!(matches!(err, SimError::SnapshotMismatch { .. }), "{err}");
    assert!(other.state("t").is_none());
}

#[test]
fn tampered_snapshot_is_refused() {
    let (mut engine, _store) = setup("enterprise_rollout");
    engine.submit_decision("t", 1, &["phased", "single_vendor"]).unwrap();
    let mut snapshot = engine.snapshot("t").unwrap();
    snapshot.state.history.clear();

    let mut other = SimEngine::build_test("store-test".into(), 42, "enterprise_rollout").unwrap();
    assert!(matches!(other.restore(snapshot), Err(SimError::SnapshotMismatch { .. })));
}
