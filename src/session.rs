//! Per-client session state.
//!
//! The original client kept the current user and game in process-wide
//! mutable variables; here that state is an explicit object. A context is
//! created once identity is established, owns the live subscriptions for
//! whatever match it is watching, and tears them all down on leave.

use tracing::{debug, info};

use crate::model::{MatchDoc, MatchId, PlayerId, PlayerStats};
use crate::store::TypedSubscription;

/// One client's session: who they are and which match they are in.
#[derive(Debug)]
pub struct SessionContext {
    player_id: PlayerId,
    display_name: String,
    current_match: Option<MatchId>,
    match_updates: Option<TypedSubscription<MatchDoc>>,
    stat_updates: Vec<TypedSubscription<PlayerStats>>,
}

impl SessionContext {
    /// Creates a session for an established identity.
    pub fn new(player_id: impl Into<PlayerId>, display_name: impl Into<String>) -> Self {
        let player_id = player_id.into();
        info!(player_id = %player_id, "Session established");
        Self {
            player_id,
            display_name: display_name.into(),
            current_match: None,
            match_updates: None,
            stat_updates: Vec::new(),
        }
    }

    /// This client's player id.
    pub fn player_id(&self) -> &PlayerId {
        &self.player_id
    }

    /// This client's display name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The match this session is currently in, if any.
    pub fn current_match(&self) -> Option<&MatchId> {
        self.current_match.as_ref()
    }

    /// Enters a match, taking ownership of its live subscription. Any
    /// previously watched match is left first.
    pub fn enter_match(
        &mut self,
        match_id: impl Into<MatchId>,
        updates: TypedSubscription<MatchDoc>,
    ) {
        self.leave();
        let match_id = match_id.into();
        debug!(player_id = %self.player_id, match_id = %match_id, "Entered match");
        self.current_match = Some(match_id);
        self.match_updates = Some(updates);
    }

    /// Adds a live per-player stats subscription (the in-game W/L/D panels);
    /// torn down with the match on leave.
    pub fn watch_stats(&mut self, updates: TypedSubscription<PlayerStats>) {
        self.stat_updates.push(updates);
    }

    /// Mutable access to the match subscription for polling.
    pub fn match_updates(&mut self) -> Option<&mut TypedSubscription<MatchDoc>> {
        self.match_updates.as_mut()
    }

    /// Leaves the current match, cancelling every subscription this session
    /// holds. In-flight transactions are unaffected; they complete or fail
    /// on their own.
    pub fn leave(&mut self) {
        if let Some(match_id) = self.current_match.take() {
            info!(player_id = %self.player_id, match_id = %match_id, "Left match");
        }
        self.match_updates = None;
        self.stat_updates.clear();
    }
}
