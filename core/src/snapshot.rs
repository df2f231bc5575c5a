//! Snapshot serialization: one team's session to/from JSON.
//!
//! A snapshot captures everything needed to resume a session later
//! without replaying its decisions. It is pinned to the catalog
//! version it was taken against.

use crate::{
    config::VariantCatalog,
    error::{SimError, SimResult},
    state::SessionState,
    types::{RunId, TeamId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub run_id:          RunId,
    pub team:            TeamId,
    pub variant_id:      String,
    pub catalog_version: String,
    pub taken_at:        DateTime<Utc>,
    pub state:           SessionState,
}

impl SessionSnapshot {
    /// Check the snapshot can be resumed against `catalog`.
    pub fn check(&self, catalog: &VariantCatalog) -> SimResult<()> {
        let mismatch = |reason: String| SimError::SnapshotMismatch {
            team: self.team.clone(),
            reason,
        };
        if self.variant_id != catalog.variant_id {
            return Err(mismatch(format!(
                "taken for variant '{}', engine runs '{}'",
                self.variant_id, catalog.variant_id
            )));
        }
        if self.catalog_version != catalog.version {
            return Err(mismatch(format!(
                "taken against catalog v{}, engine has v{}",
                self.catalog_version, catalog.version
            )));
        }
        let round = self.state.round;
        if round == 0 || round > catalog.terminal_round() {
            return Err(mismatch(format!("round {round} is out of range")));
        }
        if self.state.history.len() as u32 != round - 1 {
            return Err(mismatch(format!(
                "{} history entries for round {round}",
                self.state.history.len()
            )));
        }
        let round_config = catalog.round(round);
        let fits = match (&self.state.active_scenario, round_config) {
            (Some(name), Some(r)) => r.scenario(name).is_some(),
            (None, Some(r))       => !r.is_scenario_round(),
            (None, None)          => true, // terminal
            (Some(_), None)       => false,
        };
        if !fits {
            return Err(mismatch(format!("scenario state does not fit round {round}")));
        }
        Ok(())
    }
}
