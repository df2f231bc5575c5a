use serde::{Deserialize, Serialize};
use crate::types::Round;

/// All player-issued commands against a team session.
/// Variants are only ever appended, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlayerCommand {
    /// Create the session if it does not exist yet.
    Start,
    /// Decide the current round: one choice id or label per slot.
    Submit {
        round:   Round,
        choices: Vec<String>,
    },
    /// Restore the session to catalog defaults.
    Reset,
}
