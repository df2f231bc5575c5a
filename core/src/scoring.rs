//! Final scoring and outcome classification.
//!
//! final_score = roi + adoption + floor(morale / 2)
//!
//! Morale halves with floor division (`div_euclid`), so an odd morale
//! drops its half point and a negative morale rounds toward minus infinity.

use crate::{
    config::{OutcomeThresholds, VariantCatalog},
    state::SessionState,
    types::Money,
};
use serde::{Deserialize, Serialize};

pub fn final_score(roi: i64, adoption: i64, morale: i64) -> i64 {
    roi + adoption + morale.div_euclid(2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Morale held and adoption reached the target.
    Adopted,
    /// Morale held but adoption fell short.
    Stalled,
    /// Morale collapsed below the floor.
    Resistance,
}

impl Outcome {
    pub fn classify(morale: i64, adoption: i64, thresholds: &OutcomeThresholds) -> Self {
        if morale < thresholds.min_morale {
            Self::Resistance
        } else if adoption >= thresholds.min_adoption {
            Self::Adopted
        } else {
            Self::Stalled
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Adopted    => "Adopted",
            Self::Stalled    => "Stalled",
            Self::Resistance => "Resistance",
        }
    }
}

/// The read-only summary shown once a session reaches its terminal round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalSummary {
    pub final_score: i64,
    pub budget:      Money,
    pub bankrupt:    bool,
    pub morale:      i64,
    pub adoption:    i64,
    pub roi:         i64,
    pub outcome:     Outcome,
    pub history:     Vec<String>,
}

impl FinalSummary {
    /// None until the session is terminal.
    pub fn of(catalog: &VariantCatalog, state: &SessionState) -> Option<Self> {
        if !state.phase(catalog).is_terminal() {
            return None;
        }
        Some(Self {
            final_score: final_score(state.roi, state.adoption, state.morale),
            budget:      state.budget,
            bankrupt:    state.is_bankrupt(),
            morale:      state.morale,
            adoption:    state.adoption,
            roi:         state.roi,
            outcome:     Outcome::classify(state.morale, state.adoption, &catalog.outcome),
            history:     state.history.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLDS: OutcomeThresholds = OutcomeThresholds { min_morale: 40, min_adoption: 30 };

    #[test]
    fn odd_morale_floors() {
        assert_eq!(final_score(20, 25, 65), 77);
        assert_eq!(final_score(0, 0, 64), 32);
        assert_eq!(final_score(0, 0, -5), -3);
    }

    #[test]
    fn outcome_boundaries() {
        assert_eq!(Outcome::classify(39, 100, &THRESHOLDS), Outcome::Resistance);
        assert_eq!(Outcome::classify(40, 30, &THRESHOLDS), Outcome::Adopted);
        assert_eq!(Outcome::classify(65, 25, &THRESHOLDS), Outcome::Stalled);
    }
}
