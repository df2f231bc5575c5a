//! Session phase: where a session sits in the linear round sequence.
//!
//! The phase is derived from `SessionState::round` and the catalog's
//! terminal round. It is never stored separately.

use crate::types::Round;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "round", rename_all = "snake_case")]
pub enum SessionPhase {
    /// Waiting for the decisions of this round.
    Round(Round),
    /// All rounds played. Read-only until reset.
    Terminal,
}

impl SessionPhase {
    pub fn of(round: Round, terminal_round: Round) -> Self {
        if round >= terminal_round {
            Self::Terminal
        } else {
            Self::Round(round)
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal)
    }

    /// The phase after one successful submission.
    pub fn next(self, terminal_round: Round) -> Self {
        match self {
            Self::Round(r) => Self::of(r + 1, terminal_round),
            Self::Terminal => Self::Terminal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_advance_linearly_to_terminal() {
        let mut phase = SessionPhase::of(1, 4);
        let mut seen = vec![phase];
        while !phase.is_terminal() {
            phase = phase.next(4);
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                SessionPhase::Round(1),
                SessionPhase::Round(2),
                SessionPhase::Round(3),
                SessionPhase::Terminal,
            ]
        );
        assert_eq!(SessionPhase::Terminal.next(4), SessionPhase::Terminal);
    }
}
