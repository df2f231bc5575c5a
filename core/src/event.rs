//! Session events: the append-only record of what happened.
//!
//! The engine returns events from every accepted operation. It never
//! writes them anywhere itself; the caller decides whether to log them.

use crate::{
    scoring::Outcome,
    types::{Money, Round, RunId, TeamId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Variants are only ever appended, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    SessionStarted {
        team:            TeamId,
        session_id:      Uuid,
        variant_id:      String,
        catalog_version: String,
    },
    DecisionSubmitted {
        team:    TeamId,
        round:   Round,
        labels:  Vec<String>,
        /// Budget spent this round (negated budget delta).
        cost:    Money,
        summary: String,
    },
    ScenarioDrawn {
        team:     TeamId,
        round:    Round,
        scenario: String,
        forced:   bool,
    },
    SessionCompleted {
        team:        TeamId,
        final_score: i64,
        budget:      Money,
        outcome:     Outcome,
    },
    SessionReset {
        team: TeamId,
    },
}

impl SimEvent {
    /// Stable name for the event_type column in event_log.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. }    => "session_started",
            Self::DecisionSubmitted { .. } => "decision_submitted",
            Self::ScenarioDrawn { .. }     => "scenario_drawn",
            Self::SessionCompleted { .. }  => "session_completed",
            Self::SessionReset { .. }      => "session_reset",
        }
    }

    pub fn team(&self) -> &str {
        match self {
            Self::SessionStarted { team, .. }
            | Self::DecisionSubmitted { team, .. }
            | Self::ScenarioDrawn { team, .. }
            | Self::SessionCompleted { team, .. }
            | Self::SessionReset { team } => team,
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:          Option<i64>,
    pub run_id:      RunId,
    pub team:        TeamId,
    pub recorded_at: DateTime<Utc>,
    pub event_type:  String,
    pub payload:     String, // JSON-serialized SimEvent
}
