//! Resetting a session back to catalog defaults.

use changesim_core::{
    config::SimConfig,
    engine::SimEngine,
    event::SimEvent,
    phase::SessionPhase,
    state::SessionState,
};

#[test]
fn reset_mid_game_restores_defaults() {
    let mut engine = SimEngine::build_test("reset".into(), 11, "enterprise_rollout").unwrap();
    engine.submit_decision("t", 1, &["big_bang", "multiple_vendors"]).unwrap();
    engine.submit_decision("t", 2, &["online", "minimum_compliance"]).unwrap();
    assert!(engine.state("t").unwrap().risk_flag);

    let events = engine.reset("t").unwrap();
    assert_eq!(events, vec![SimEvent::SessionReset { team: "t".into() }]);

    let fresh = SessionState::new(engine.catalog());
    let state = engine.state("t").unwrap();
    assert_eq!(state, &fresh);
    assert_eq!(state.round, 1);
    assert_eq!(state.budget, 1_000_000);
    assert_eq!(state.morale, 60);
    assert!(state.history.is_empty());
    assert!(!state.risk_flag);
    assert_eq!(state.active_scenario, None);
}

#[test]
fn reset_after_completion_allows_a_new_game() {
    let mut engine = SimEngine::build_test("replay".into(), 11, "change_pulse").unwrap();
    engine.submit_decision("t", 1, &["say_nothing"]).unwrap();
    engine.submit_decision("t", 2, &["vendor_bootcamp"]).unwrap();
    assert_eq!(engine.state("t").unwrap().phase(engine.catalog()), SessionPhase::Terminal);

    engine.reset("t").unwrap();
    assert!(engine.summary("t").is_none());
    engine.submit_decision("t", 1, &["town_hall"]).unwrap();
    assert_eq!(engine.state("t").unwrap().history, vec!["Round 1: B. Town Hall".to_string()]);
}

/// Resetting one team leaves every other team alone.
#[test]
fn reset_is_per_team() {
    let mut engine = SimEngine::build_test("iso".into(), 11, "change_pulse").unwrap();
    engine.submit_decision("a", 1, &["town_hall"]).unwrap();
    engine.submit_decision("b", 1, &["email_memo"]).unwrap();
    let b_before = engine.state("b").unwrap().clone();

    engine.reset("a").unwrap();
    assert_eq!(engine.state("a").unwrap().round, 1);
    assert_eq!(engine.state("b").unwrap(), &b_before);
}

#[test]
fn reset_of_unknown_team_creates_a_fresh_session() {
    let config = SimConfig::default_test();
    let mut engine = SimEngine::build("cold".into(), 1, &config, "department_rollout").unwrap();
    let events = engine.reset("Team 4: Legal").unwrap();
    assert!(matches!(events.first(), Some(SimEvent::SessionStarted { .. })));
    assert!(matches!(events.last(), Some(SimEvent::SessionReset { .. })));
    assert_eq!(engine.state("Team 4: Legal").unwrap().morale, 55);
}
