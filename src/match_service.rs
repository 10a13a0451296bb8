//! Match state machine: transactional move application and restart.
//!
//! Every mutation is a single atomic read-modify-write against the match
//! document. Two clients clicking at the same instant serialize through the
//! store; the loser's transaction revalidates against the committed snapshot
//! and quietly does nothing.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::error::GameError;
use crate::model::{MATCHES, MatchDoc, MatchStatus};
use crate::store::{DocumentStore, TransactOutcome, TypedSubscription, get_as, transact_as};

/// How a move attempt landed.
///
/// An ignored attempt is not an error: stale renders, double clicks, and
/// lost races are expected traffic, and surfacing them would punish the UI
/// for conditions it cannot see. Callers that care can still branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The move was applied and play continues.
    Applied,
    /// The move was applied and ended the match (win or draw).
    Finished,
    /// Validation failed against the current snapshot; nothing changed.
    Ignored,
}

/// Operations on a live match document.
#[derive(Clone)]
pub struct MatchService {
    store: Arc<dyn DocumentStore>,
}

impl MatchService {
    /// Creates a match service over the given store.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Reads the current match snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MatchNotFound`] if no such match exists.
    #[instrument(skip(self))]
    pub async fn get_match(&self, match_id: &str) -> Result<MatchDoc, GameError> {
        get_as::<MatchDoc>(self.store.as_ref(), MATCHES, match_id)
            .await?
            .ok_or_else(|| GameError::MatchNotFound(match_id.to_string()))
    }

    /// Subscribes to live snapshots of the match; the current state arrives
    /// first, then every committed change in store delivery order.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Store`] if the store cannot register the
    /// subscription.
    #[instrument(skip(self))]
    pub async fn subscribe_match(
        &self,
        match_id: &str,
    ) -> Result<TypedSubscription<MatchDoc>, GameError> {
        let sub = self.store.subscribe(MATCHES, match_id).await?;
        Ok(TypedSubscription::new(sub))
    }

    /// Attempts to place `player_id`'s mark at `cell`.
    ///
    /// Runs as one transaction: validate against the snapshot (match in
    /// play, player's turn, cell empty), apply, check win/draw for the
    /// moving mark only, pass the turn or finish. A failed validation is a
    /// silent no-op logged at debug; see [`MoveOutcome::Ignored`].
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MatchNotFound`] if no such match exists. Illegal
    /// moves are not errors.
    #[instrument(skip(self))]
    pub async fn attempt_move(
        &self,
        match_id: &str,
        player_id: &str,
        cell: usize,
    ) -> Result<MoveOutcome, GameError> {
        let mut rejection = None;
        let mut finished = false;
        transact_as::<MatchDoc, _>(self.store.as_ref(), MATCHES, match_id, |m| {
            match m.with_move(player_id, cell) {
                Ok(next) => {
                    finished = *next.status() == MatchStatus::Finished;
                    Some(next)
                }
                Err(why) => {
                    rejection = Some(why);
                    None
                }
            }
        })
        .await
        .map_err(|e| GameError::match_not_found(e, match_id))?;

        match rejection {
            Some(why) => {
                debug!(match_id, player_id, cell, %why, "Move ignored");
                Ok(MoveOutcome::Ignored)
            }
            None if finished => {
                debug!(match_id, player_id, cell, "Move finished the match");
                Ok(MoveOutcome::Finished)
            }
            None => Ok(MoveOutcome::Applied),
        }
    }

    /// Restarts a finished match for a rematch: empty board, X to move, no
    /// winner, ledger re-armed.
    ///
    /// This is UI policy rather than a game rule, but it is the only path
    /// out of the terminal state. A restart of a match that is not finished
    /// is refused (warned, nothing written).
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MatchNotFound`] if no such match exists.
    #[instrument(skip(self))]
    pub async fn restart(&self, match_id: &str) -> Result<(), GameError> {
        let outcome = transact_as::<MatchDoc, _>(self.store.as_ref(), MATCHES, match_id, |m| {
            (*m.status() == MatchStatus::Finished).then(|| m.restarted())
        })
        .await
        .map_err(|e| GameError::match_not_found(e, match_id))?;

        if outcome == TransactOutcome::Unchanged {
            warn!(match_id, "Restart refused, match is not finished");
        }
        Ok(())
    }
}
