//! The simulation engine: one classroom run of one variant.
//!
//! RULES:
//!   - Each team owns exactly one SessionState. Nothing is shared across teams.
//!   - All mutation goes through submit_decision() and reset().
//!   - All randomness flows through the RngBank, one stream per team.
//!   - Every accepted operation returns the events it produced; the engine
//!     never persists anything itself.

use crate::{
    command::PlayerCommand,
    config::{SimConfig, VariantCatalog},
    error::{SimError, SimResult},
    event::SimEvent,
    render::SessionView,
    rng::{RngBank, SessionRng},
    scoring::FinalSummary,
    snapshot::SessionSnapshot,
    state::SessionState,
    types::{Round, RunId, TeamId},
};
use chrono::Utc;
use std::collections::BTreeMap;
use uuid::Uuid;

/// One team's session: its state plus the RNG stream that feeds it.
#[derive(Debug, Clone)]
pub struct TeamSession {
    pub session_id: Uuid,
    pub state:      SessionState,
    rng:            SessionRng,
    resets:         u64,
}

/// High bit marks RNG epochs used by restored sessions, keeping them
/// apart from the reset counter's epochs.
const RESTORE_EPOCH: u64 = 1 << 63;

pub struct SimEngine {
    pub run_id: RunId,
    catalog:    VariantCatalog,
    rng_bank:   RngBank,
    sessions:   BTreeMap<TeamId, TeamSession>,
}

impl SimEngine {
    pub fn new(run_id: RunId, seed: u64, catalog: VariantCatalog) -> Self {
        Self {
            run_id,
            catalog,
            rng_bank: RngBank::new(seed),
            sessions: BTreeMap::new(),
        }
    }

    /// Build an engine for one variant of a loaded config.
    pub fn build(run_id: RunId, seed: u64, config: &SimConfig, variant_id: &str) -> SimResult<Self> {
        let catalog = config.catalog(variant_id)?.clone();
        log::info!(
            "run={run_id} variant={} v{} seed={seed}",
            catalog.variant_id,
            catalog.version
        );
        Ok(Self::new(run_id, seed, catalog))
    }

    /// Engine over the built-in catalogs. Used by tests and tooling.
    pub fn build_test(run_id: RunId, seed: u64, variant_id: &str) -> SimResult<Self> {
        let config = SimConfig::builtin()?;
        Self::build(run_id, seed, &config, variant_id)
    }

    pub fn catalog(&self) -> &VariantCatalog {
        &self.catalog
    }

    pub fn seed(&self) -> u64 {
        self.rng_bank.master_seed()
    }

    /// Teams with a session, in name order.
    pub fn teams(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }

    pub fn session(&self, team: &str) -> Option<&TeamSession> {
        self.sessions.get(team.trim())
    }

    pub fn state(&self, team: &str) -> Option<&SessionState> {
        self.session(team).map(|s| &s.state)
    }

    /// The final summary, once the team's session is terminal.
    pub fn summary(&self, team: &str) -> Option<FinalSummary> {
        self.state(team)
            .and_then(|state| FinalSummary::of(&self.catalog, state))
    }

    /// The render model for one team's screen. Pure read.
    pub fn view(&self, team: &str) -> Option<SessionView> {
        let team = team.trim();
        self.state(team)
            .map(|state| SessionView::of(team, &self.catalog, state))
    }

    /// Create the team's session with catalog defaults. Idempotent: an
    /// existing session is left alone and no event is returned.
    pub fn start_session(&mut self, team: &str) -> SimResult<Vec<SimEvent>> {
        let team = require_identity(team)?;
        if self.sessions.contains_key(&team) {
            return Ok(vec![]);
        }
        let (session, event) = self.new_session(&team);
        self.insert_session(team, session);
        Ok(vec![event])
    }

    /// Submit the decisions for `round`. The session is created on first
    /// interaction, but only once that first submission is accepted. On any
    /// rejection the engine is left untouched.
    pub fn submit_decision<S: AsRef<str>>(
        &mut self,
        team: &str,
        round: Round,
        choices: &[S],
    ) -> SimResult<Vec<SimEvent>> {
        let team = require_identity(team)?;
        let mut fresh = (!self.sessions.contains_key(&team)).then(|| self.new_session(&team));

        let session = match fresh.as_mut() {
            Some((session, _)) => session,
            None => self
                .sessions
                .get_mut(&team)
                .ok_or(SimError::MissingIdentity)?,
        };

        let transition = match session.state.apply_decision(&self.catalog, round, choices, &mut session.rng) {
            Ok(t) => t,
            Err(e) => {
                log::debug!("team='{team}' round={round} rejected: {e}");
                return Err(e);
            }
        };

        log::debug!(
            "team='{team}' round={} -> {:?} budget={} morale={} adoption={} roi={}",
            transition.completed_round,
            transition.phase,
            session.state.budget,
            session.state.morale,
            session.state.adoption,
            session.state.roi
        );
        let summary = FinalSummary::of(&self.catalog, &session.state);

        let mut events = Vec::new();
        if let Some((session, started)) = fresh {
            self.insert_session(team.clone(), session);
            events.push(started);
        }
        events.push(SimEvent::DecisionSubmitted {
            team:    team.clone(),
            round:   transition.completed_round,
            labels:  transition.labels,
            cost:    -transition.effect.budget_delta,
            summary: transition.history_entry,
        });
        if let Some(draw) = transition.scenario {
            events.push(SimEvent::ScenarioDrawn {
                team:     team.clone(),
                round:    draw.round,
                scenario: draw.name,
                forced:   draw.forced,
            });
        }
        if let Some(summary) = summary {
            log::info!(
                "team='{team}' complete: score={} budget={} outcome={}",
                summary.final_score,
                summary.budget,
                summary.outcome.label()
            );
            events.push(SimEvent::SessionCompleted {
                team,
                final_score: summary.final_score,
                budget:      summary.budget,
                outcome:     summary.outcome,
            });
        }
        Ok(events)
    }

    /// Restore the team's session to catalog defaults. The RNG moves to a
    /// fresh stream so a replay may draw a different scenario.
    pub fn reset(&mut self, team: &str) -> SimResult<Vec<SimEvent>> {
        let team = require_identity(team)?;
        let mut events = self.start_session(&team)?;
        if let Some(session) = self.sessions.get_mut(&team) {
            session.resets += 1;
            session.state.reset(&self.catalog);
            session.rng = self.rng_bank.for_team(&team, session.resets);
        }
        log::info!("team='{team}' session reset");
        events.push(SimEvent::SessionReset { team });
        Ok(events)
    }

    /// Dispatch a player command.
    pub fn execute(&mut self, team: &str, command: &PlayerCommand) -> SimResult<Vec<SimEvent>> {
        match command {
            PlayerCommand::Start => self.start_session(team),
            PlayerCommand::Submit { round, choices } => {
                self.submit_decision(team, *round, choices.as_slice())
            }
            PlayerCommand::Reset => self.reset(team),
        }
    }

    pub fn snapshot(&self, team: &str) -> Option<SessionSnapshot> {
        let team = team.trim();
        self.sessions.get(team).map(|session| SessionSnapshot {
            run_id:          self.run_id.clone(),
            team:            team.to_string(),
            variant_id:      self.catalog.variant_id.clone(),
            catalog_version: self.catalog.version.clone(),
            taken_at:        Utc::now(),
            state:           session.state.clone(),
        })
    }

    fn new_session(&self, team: &str) -> (TeamSession, SimEvent) {
        let session = TeamSession {
            session_id: Uuid::new_v4(),
            state:      SessionState::new(&self.catalog),
            rng:        self.rng_bank.for_team(team, 0),
            resets:     0,
        };
        let event = SimEvent::SessionStarted {
            team:            team.to_string(),
            session_id:      session.session_id,
            variant_id:      self.catalog.variant_id.clone(),
            catalog_version: self.catalog.version.clone(),
        };
        (session, event)
    }

    fn insert_session(&mut self, team: TeamId, session: TeamSession) {
        log::info!("run={} team='{team}' session started", self.run_id);
        self.sessions.insert(team, session);
    }

    /// Resume a session from a snapshot, replacing any live session for
    /// that team. The RNG restarts on a stream keyed by the restored round.
    pub fn restore(&mut self, snapshot: SessionSnapshot) -> SimResult<()> {
        let team = require_identity(&snapshot.team)?;
        snapshot.check(&self.catalog)?;
        let epoch = RESTORE_EPOCH | snapshot.state.round as u64;
        let session = TeamSession {
            session_id: Uuid::new_v4(),
            state:      snapshot.state,
            rng:        self.rng_bank.for_team(&team, epoch),
            resets:     0,
        };
        log::info!("team='{team}' resumed at round {}", session.state.round);
        self.sessions.insert(team, session);
        Ok(())
    }
}

fn require_identity(team: &str) -> SimResult<TeamId> {
    let team = team.trim();
    if team.is_empty() {
        return Err(SimError::MissingIdentity);
    }
    Ok(team.to_string())
}
