use crate::types::Round;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid choice '{choice}' for round {round}, slot '{slot}'")]
    InvalidChoice {
        round:  Round,
        slot:   String,
        choice: String,
    },

    #[error("Out-of-order submission: session is in round {expected}, got round {actual}")]
    OutOfOrderSubmission { expected: Round, actual: Round },

    #[error("Round {round} expects {expected} choice(s), got {actual}")]
    SlotCountMismatch {
        round:    Round,
        expected: usize,
        actual:   usize,
    },

    #[error("Session already complete at round {round}; reset to play again")]
    SessionComplete { round: Round },

    #[error("Enter a team name before making decisions")]
    MissingIdentity,

    #[error("Unknown simulation variant '{variant_id}'")]
    UnknownVariant { variant_id: String },

    #[error("Invalid catalog '{variant_id}': {reason}")]
    InvalidCatalog { variant_id: String, reason: String },

    #[error("Snapshot for team '{team}' cannot be resumed: {reason}")]
    SnapshotMismatch { team: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SimError {
    /// True for rejections caused by player input. The session is unchanged
    /// and the caller may re-submit.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidChoice { .. }
                | Self::OutOfOrderSubmission { .. }
                | Self::SlotCountMismatch { .. }
                | Self::SessionComplete { .. }
                | Self::MissingIdentity
        )
    }
}

pub type SimResult<T> = Result<T, SimError>;
