//! Rejected submissions leave the session exactly as it was.

use changesim_core::{engine::SimEngine, error::SimError, state::SessionState};

fn build() -> SimEngine {
    SimEngine::build_test("reject-test".into(), 7, "enterprise_rollout").unwrap()
}

fn frozen(engine: &SimEngine, team: &str) -> (SessionState, String) {
    let state = engine.state(team).unwrap().clone();
    let json = serde_json::to_string(&state).unwrap();
    (state, json)
}

#[test]
fn unknown_choice_names_the_slot_and_changes_nothing() {
    let mut engine = build();
    engine.start_session("t").unwrap();
    let before = frozen(&engine, "t");

    let err = engine
        .submit_decision("t", 1, &["big_bang", "Three Vendors"])
        .unwrap_err();
    match &err {
        SimError::InvalidChoice { round, slot, choice } => {
            assert_eq!(*round, 1);
            assert_eq!(slot, "vendor");
            assert_eq!(choice, "Three Vendors");
        }
        other => panic!("Expected InvalidChoice, got {other:?}"),
    }
    assert!(err.is_rejection());
    assert_eq!(frozen(&engine, "t"), before);
}

#[test]
fn same_invalid_input_twice_gives_same_error_and_state() {
    let mut engine = build();
    engine.submit_decision("t", 1, &["phased", "single_vendor"]).unwrap();
    let before = frozen(&engine, "t");

    let first = engine.submit_decision("t", 2, &["on_site", "no_compliance"]).unwrap_err();
    let after_first = frozen(&engine, "t");
    let second = engine.submit_decision("t", 2, &["on_site", "no_compliance"]).unwrap_err();
    let after_second = frozen(&engine, "t");

    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(after_first, before);
    assert_eq!(after_second, before);
}

#[test]
fn wrong_round_is_out_of_order() {
    let mut engine = build();
    engine.start_session("t").unwrap();
    let before = frozen(&engine, "t");

    let err = engine.submit_decision("t", 2, &["on_site", "high_end_compliance"]).unwrap_err();
    assert!(
        matches!(err, SimError::OutOfOrderSubmission { expected: 1, actual: 2 }),
        "{err}"
    );
    assert_eq!(frozen(&engine, "t"), before);
}

/// A double click re-sends the round that just advanced.
#[test]
fn double_submission_is_rejected_after_round_advances() {
    let mut engine = build();
    engine.submit_decision("t", 1, &["big_bang", "single_vendor"]).unwrap();
    let before = frozen(&engine, "t");

    let err = engine.submit_decision("t", 1, &["big_bang", "single_vendor"]).unwrap_err();
    assert!(matches!(err, SimError::OutOfOrderSubmission { expected: 2, actual: 1 }));
    assert_eq!(frozen(&engine, "t"), before);
}

#[test]
fn wrong_number_of_choices_is_rejected() {
    let mut engine = build();
    engine.start_session("t").unwrap();
    let before = frozen(&engine, "t");

    let err = engine
        .submit_decision("t", 1, &["big_bang", "single_vendor", "phased"])
        .unwrap_err();
    assert!(matches!(err, SimError::SlotCountMismatch { expected: 2, actual: 3, .. }));
    let empty: [&str; 0] = [];
    assert!(engine.submit_decision("t", 1, &empty).is_err());
    assert_eq!(frozen(&engine, "t"), before);
}

#[test]
fn terminal_session_is_read_only() {
    let mut engine = SimEngine::build_test("terminal".into(), 1, "change_pulse").unwrap();
    engine.submit_decision("t", 1, &["town_hall"]).unwrap();
    engine.submit_decision("t", 2, &["peer_training"]).unwrap();
    let before = frozen(&engine, "t");

    let err = engine.submit_decision("t", 3, &["town_hall"]).unwrap_err();
    assert!(matches!(err, SimError::SessionComplete { round: 3 }), "{err}");
    assert_eq!(frozen(&engine, "t"), before);
}

#[test]
fn blank_team_name_is_missing_identity() {
    let mut engine = build();
    for name in ["", "   ", "\t\n"] {
        let err = engine.submit_decision(name, 1, &["big_bang", "single_vendor"]).unwrap_err();
        assert!(matches!(err, SimError::MissingIdentity), "{err}");
        assert!(matches!(engine.start_session(name), Err(SimError::MissingIdentity)));
    }
    assert_eq!(engine.teams().count(), 0);
}

/// The first slot is fine, the second is not: the valid half must not leak.
#[test]
fn partially_valid_submission_applies_nothing() {
    let mut engine = build();
    engine.submit_decision("t", 1, &["big_bang", "single_vendor"]).unwrap();
    let before = frozen(&engine, "t");

    assert!(engine.submit_decision("t", 2, &["minimum_compliance", "on_site"]).is_err());
    let (state, _) = frozen(&engine, "t");
    assert!(!state.risk_flag);
    assert_eq!(frozen(&engine, "t"), before);
}

/// A team whose very first submission is rejected still has no session.
#[test]
fn rejected_first_submission_creates_no_session() {
    let mut engine = build();
    assert!(engine.submit_decision("Gold", 1, &["big_bang", "carrier pigeon"]).is_err());
    assert!(engine.state("Gold").is_none());
    assert_eq!(engine.teams().count(), 0);
}
