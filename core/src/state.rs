//! Per-team session state and the decision transition.
//!
//! RULE: `apply_decision` validates everything before it touches a field.
//! A rejected submission leaves the state exactly as it was.
//!
//! Invariant after every completed submission:
//!   history.len() == round - 1

use crate::{
    config::{Effect, RoundConfig, VariantCatalog},
    error::{SimError, SimResult},
    phase::SessionPhase,
    rng::SessionRng,
    types::{Money, Round},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub round:           Round,
    pub budget:          Money,
    pub morale:          i64,
    pub adoption:        i64,
    pub roi:             i64,
    pub history:         Vec<String>,
    pub risk_flag:       bool,
    /// Scenario drawn on entering the current round, if it is a scenario round.
    pub active_scenario: Option<String>,
}

/// What one accepted submission did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub completed_round: Round,
    pub effect:          Effect,
    pub labels:          Vec<String>,
    pub history_entry:   String,
    pub scenario:        Option<ScenarioDraw>,
    pub phase:           SessionPhase,
}

/// A scenario chosen on entering a scenario round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioDraw {
    pub round:  Round,
    pub name:   String,
    pub forced: bool,
}

impl SessionState {
    pub fn new(catalog: &VariantCatalog) -> Self {
        let initial = catalog.initial;
        Self {
            round:           1,
            budget:          initial.budget,
            morale:          initial.morale,
            adoption:        initial.adoption,
            roi:             initial.roi,
            history:         Vec::new(),
            risk_flag:       false,
            active_scenario: None,
        }
    }

    /// Restore every field to the catalog defaults.
    pub fn reset(&mut self, catalog: &VariantCatalog) {
        *self = Self::new(catalog);
    }

    pub fn phase(&self, catalog: &VariantCatalog) -> SessionPhase {
        SessionPhase::of(self.round, catalog.terminal_round())
    }

    pub fn is_bankrupt(&self) -> bool {
        self.budget < 0
    }

    /// Validate and apply one round's decisions, then advance the round.
    ///
    /// `choices` holds one choice id (or exact label) per active slot, in
    /// slot order. The RNG is only consulted when the next round draws a
    /// scenario, so a rejected call never advances the stream.
    pub fn apply_decision<S: AsRef<str>>(
        &mut self,
        catalog: &VariantCatalog,
        round: Round,
        choices: &[S],
        rng: &mut SessionRng,
    ) -> SimResult<Transition> {
        if round != self.round {
            return Err(SimError::OutOfOrderSubmission {
                expected: self.round,
                actual:   round,
            });
        }
        let round_config = match self.phase(catalog) {
            SessionPhase::Terminal => return Err(SimError::SessionComplete { round }),
            SessionPhase::Round(r) => catalog.round(r).ok_or_else(|| SimError::InvalidCatalog {
                variant_id: catalog.variant_id.clone(),
                reason:     format!("round {r} is missing"),
            })?,
        };

        let (effect, labels) = self.resolve_choices(catalog, round_config, choices)?;

        // ── Commit: nothing below can fail. ─────────────────────────
        let history_entry = match &self.active_scenario {
            Some(scenario) => format!("Round {round} ({scenario}): {}", labels.join(" + ")),
            None => format!("Round {round}: {}", labels.join(" + ")),
        };

        self.budget += effect.budget_delta;
        self.morale += effect.morale_delta;
        self.adoption += effect.adoption_delta;
        self.roi += effect.roi_delta;
        if effect.sets_risk_flag {
            self.risk_flag = true;
        }
        self.history.push(history_entry.clone());
        self.round += 1;
        self.active_scenario = None;

        let scenario = catalog
            .round(self.round)
            .filter(|next| next.is_scenario_round())
            .and_then(|next| self.enter_scenario_round(next, rng));

        debug_assert_eq!(self.history.len() as Round, self.round - 1);

        Ok(Transition {
            completed_round: round,
            effect,
            labels,
            history_entry,
            scenario,
            phase: self.phase(catalog),
        })
    }

    /// Look up every choice against the active slots. Pure: no mutation.
    fn resolve_choices<S: AsRef<str>>(
        &self,
        catalog: &VariantCatalog,
        round_config: &RoundConfig,
        choices: &[S],
    ) -> SimResult<(Effect, Vec<String>)> {
        let slots = round_config
            .active_slots(self.active_scenario.as_deref())
            .ok_or_else(|| SimError::InvalidCatalog {
                variant_id: catalog.variant_id.clone(),
                reason: format!(
                    "round {} has no drawn scenario to decide on",
                    round_config.round
                ),
            })?;

        if choices.len() != slots.len() {
            return Err(SimError::SlotCountMismatch {
                round:    round_config.round,
                expected: slots.len(),
                actual:   choices.len(),
            });
        }

        let mut effect = Effect::default();
        let mut labels = Vec::with_capacity(slots.len());
        for (slot, choice) in slots.iter().zip(choices) {
            let choice = choice.as_ref();
            let option = slot.find(choice).ok_or_else(|| SimError::InvalidChoice {
                round:  round_config.round,
                slot:   slot.slot_id.clone(),
                choice: choice.to_string(),
            })?;
            effect = effect.combine(option.effect);
            labels.push(option.label.clone());
        }
        Ok((effect, labels))
    }

    /// One-shot scenario selection on round entry. The result is persisted
    /// in `active_scenario` and never re-rolled by reads.
    fn enter_scenario_round(
        &mut self,
        round_config: &RoundConfig,
        rng: &mut SessionRng,
    ) -> Option<ScenarioDraw> {
        let forced = round_config
            .risk_forced_scenario
            .as_ref()
            .filter(|_| self.risk_flag);

        let (name, forced) = match forced {
            Some(name) => (name.clone(), true),
            None => (rng.pick(&round_config.scenarios)?.name.clone(), false),
        };

        log::debug!(
            "team={} round={} scenario='{name}' forced={forced}",
            rng.team,
            round_config.round
        );
        self.active_scenario = Some(name.clone());
        Some(ScenarioDraw {
            round: round_config.round,
            name,
            forced,
        })
    }
}
