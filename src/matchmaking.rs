//! Matchmaking: creating a match and seating the second player.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::error::GameError;
use crate::model::{MATCHES, MatchDoc, MatchId};
use crate::store::{DocumentStore, encode, transact_as};

/// What the join transaction decided about the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinVerdict {
    /// Seated as the second player; play begins.
    Joined,
    /// Already a member; idempotent rejoin (page reload, stale tab).
    AlreadySeated,
    /// Two other players hold the seats.
    Full,
}

/// Creates matches and seats players in them.
///
/// Both operations go through the store's transaction primitive, so two
/// clients racing for the last seat resolve to exactly one winner.
#[derive(Clone)]
pub struct Matchmaker {
    store: Arc<dyn DocumentStore>,
}

impl Matchmaker {
    /// Creates a matchmaker over the given store.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Creates a match with the host seated at X and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Store`] if the insert fails.
    #[instrument(skip(self))]
    pub async fn create_and_join(
        &self,
        host_id: &str,
        host_name: &str,
    ) -> Result<MatchId, GameError> {
        let doc = MatchDoc::new(host_id, host_name);
        let match_id = self.store.insert(MATCHES, encode(&doc)?).await?;
        info!(match_id = %match_id, host_id, "Match created, waiting for opponent");
        Ok(match_id)
    }

    /// Seats `player_id` as the second player and starts play.
    ///
    /// Joining a match the player already sits in is a no-op, so a reloaded
    /// page can safely re-run its join.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MatchNotFound`] if no such match exists and
    /// [`GameError::MatchFull`] if both seats are taken by other players.
    #[instrument(skip(self))]
    pub async fn join_match(
        &self,
        match_id: &str,
        player_id: &str,
        player_name: &str,
    ) -> Result<(), GameError> {
        let mut verdict = JoinVerdict::Full;
        transact_as::<MatchDoc, _>(self.store.as_ref(), MATCHES, match_id, |m| {
            if m.is_member(player_id) {
                verdict = JoinVerdict::AlreadySeated;
                None
            } else if m.has_open_seat() {
                verdict = JoinVerdict::Joined;
                Some(m.with_second_player(player_id, player_name))
            } else {
                verdict = JoinVerdict::Full;
                None
            }
        })
        .await
        .map_err(|e| GameError::match_not_found(e, match_id))?;

        match verdict {
            JoinVerdict::Joined => {
                info!(match_id, player_id, "Player joined, match is live");
                Ok(())
            }
            JoinVerdict::AlreadySeated => {
                debug!(match_id, player_id, "Player already seated, rejoin is a no-op");
                Ok(())
            }
            JoinVerdict::Full => {
                warn!(match_id, player_id, "Join rejected, match is full");
                Err(GameError::MatchFull(match_id.to_string()))
            }
        }
    }
}

/// Extracts a match id from user input: either a bare id or an invite URL
/// carrying a `gId` query parameter.
pub fn parse_match_id(input: &str) -> Option<MatchId> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    match input.split_once("gId=") {
        Some((_, rest)) => {
            let id = rest.split(['&', '#']).next().unwrap_or("");
            (!id.is_empty()).then(|| id.to_string())
        }
        None => Some(input.to_string()),
    }
}

/// Builds the invite URL a host shares with an opponent.
pub fn invite_url(base: &str, match_id: &str) -> String {
    format!("{}?gId={}", base.trim_end_matches('?'), match_id)
}
