//! Domain error taxonomy.
//!
//! Nothing here is fatal: `MatchNotFound` and `MatchFull` are actionable
//! messages for the user who tried to join, `StatUpdatePartialFailure` is
//! retried by the caller, and store errors are recoverable at the operation
//! boundary. Illegal moves never reach this type; the match service swallows
//! them by design (see [`crate::MatchService::attempt_move`]).

use derive_more::{Display, Error};

use crate::model::{MatchId, PlayerId};
use crate::store::StoreError;

/// Error surfaced by the matchmaking, match, and stats services.
#[derive(Debug, Clone, Display, Error)]
pub enum GameError {
    /// The addressed match does not exist.
    #[display("match '{_0}' was not found")]
    MatchNotFound(#[error(not(source))] MatchId),
    /// The match already seats two players.
    #[display("match '{_0}' is already full")]
    MatchFull(#[error(not(source))] MatchId),
    /// Some per-player stat updates did not land; `stats_applied` stays
    /// false so a retry can still credit them.
    #[display("stat updates still pending for players: {players:?}")]
    StatUpdatePartialFailure {
        /// Players whose stats records were not updated.
        players: Vec<PlayerId>,
    },
    /// The storage collaborator failed.
    #[display("storage error: {_0}")]
    Store(#[error(source)] StoreError),
}

impl From<StoreError> for GameError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl GameError {
    /// Maps a store-level missing document onto the domain `MatchNotFound`.
    pub(crate) fn match_not_found(err: StoreError, match_id: &str) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::MatchNotFound(match_id.to_string()),
            other => Self::Store(other),
        }
    }
}
