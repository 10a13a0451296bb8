//! Shared document types for matches and player statistics.
//!
//! These are the values that live in the document store. All transitions are
//! pure (`&self -> Self`) so the services can run them inside a store
//! transaction against whatever snapshot the transaction hands them.

use std::collections::HashMap;

use derive_getters::Getters;
use derive_more::Display;
use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::board::{Board, IllegalMove, Mark};

/// Store collection holding match documents.
pub const MATCHES: &str = "matches";

/// Store collection holding per-player statistics documents, keyed by
/// player id.
pub const PLAYER_STATS: &str = "player_stats";

/// Unique identifier for a match document.
pub type MatchId = String;

/// Unique identifier for a player (caller-supplied; identity provisioning is
/// an external collaborator).
pub type PlayerId = String;

/// Lifecycle phase of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MatchStatus {
    /// One player registered, waiting for an opponent.
    Waiting,
    /// Two players, moves alternating.
    Playing,
    /// Terminal: win or draw recorded.
    Finished,
}

/// A player's seat in one match: assigned mark plus display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct PlayerSeat {
    /// Mark this player moves with.
    mark: Mark,
    /// Display name shown to the opponent.
    name: String,
}

/// Why a move attempt was not applied.
///
/// The match state machine swallows these (logged, never surfaced to the
/// initiating user); they exist so the log line can say what happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum MoveRejection {
    /// Match is not in the playing phase.
    #[display("match is not in play")]
    NotPlaying,
    /// The player is not seated in this match.
    #[display("player is not a member of this match")]
    UnknownPlayer,
    /// It is the other player's turn.
    #[display("not this player's turn")]
    OutOfTurn,
    /// The cell is occupied or out of bounds.
    #[display("illegal cell: {_0}")]
    Cell(IllegalMove),
}

/// One match document.
///
/// Invariants held by every constructor and transition:
/// - `player_order` is append-only with at most two entries, each keyed in
///   `players`, and the two seats (when both present) hold distinct marks;
/// - `status` is `Waiting` iff exactly one player is seated;
/// - `status` is `Playing` only with two players and no win or draw on the
///   board;
/// - `status` is `Finished` iff the board shows a complete line or is full;
/// - `winner` is set only when `Finished` via a win, never on a draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct MatchDoc {
    /// Seats keyed by player id.
    players: HashMap<PlayerId, PlayerSeat>,
    /// Join order; the host is first.
    player_order: Vec<PlayerId>,
    /// Current board.
    board: Board,
    /// Lifecycle phase.
    status: MatchStatus,
    /// Mark whose move is legal next; meaningful only while playing.
    current_turn: Mark,
    /// Winning mark; `None` while live and on a draw.
    winner: Option<Mark>,
    /// True once the statistics ledger has credited this match's outcome.
    stats_applied: bool,
}

impl MatchDoc {
    /// Creates a match with the host seated at X, waiting for an opponent.
    pub fn new(host_id: impl Into<PlayerId>, host_name: impl Into<String>) -> Self {
        let host_id = host_id.into();
        let mut players = HashMap::new();
        players.insert(host_id.clone(), PlayerSeat::new(Mark::X, host_name.into()));
        let doc = Self {
            players,
            player_order: vec![host_id],
            board: Board::new(),
            status: MatchStatus::Waiting,
            current_turn: Mark::X,
            winner: None,
            stats_applied: false,
        };
        doc.check_invariants();
        doc
    }

    /// Debug-build verification of the structural invariants listed on
    /// [`MatchDoc`]. Every constructor and transition runs this on its
    /// output; release builds compile it away.
    fn check_invariants(&self) {
        debug_assert!(self.player_order.len() <= 2, "more than two seats");
        debug_assert!(
            self.player_order.iter().all(|id| self.players.contains_key(id)),
            "player_order references an unseated player"
        );
        if let [a, b] = self.player_order.as_slice() {
            debug_assert_ne!(
                self.players[a].mark(),
                self.players[b].mark(),
                "both seats hold the same mark"
            );
        }
        debug_assert_eq!(
            self.status == MatchStatus::Waiting,
            self.player_order.len() == 1,
            "waiting status and a single seat must coincide"
        );
        match self.status {
            MatchStatus::Waiting => {}
            MatchStatus::Playing => {
                debug_assert_eq!(self.player_order.len(), 2, "playing without two seats");
                debug_assert!(
                    self.board.winner().is_none() && !self.board.is_full(),
                    "playing with a decided board"
                );
                debug_assert!(self.winner.is_none(), "winner set while playing");
            }
            MatchStatus::Finished => {
                debug_assert!(
                    self.board.winner().is_some() || self.board.is_full(),
                    "finished without a win or a full board"
                );
            }
        }
        if let Some(mark) = self.winner {
            debug_assert_eq!(self.status, MatchStatus::Finished, "winner set while live");
            debug_assert!(self.board.has_win(mark), "winner has no completed line");
        }
    }

    /// Checks whether `player_id` holds a seat in this match.
    pub fn is_member(&self, player_id: &str) -> bool {
        self.players.contains_key(player_id)
    }

    /// Returns the seat for `player_id`, if seated.
    pub fn seat(&self, player_id: &str) -> Option<&PlayerSeat> {
        self.players.get(player_id)
    }

    /// Returns the id of the player seated at `mark`, if any.
    pub fn player_with_mark(&self, mark: Mark) -> Option<&PlayerId> {
        self.player_order
            .iter()
            .find(|id| self.players.get(*id).map(|s| *s.mark()) == Some(mark))
    }

    /// Checks whether the match has room for a second player.
    pub fn has_open_seat(&self) -> bool {
        self.player_order.len() < 2
    }

    /// Returns a copy with the second player seated at O and play started.
    ///
    /// Callers validate capacity and membership first (the matchmaker does
    /// this inside its join transaction).
    pub fn with_second_player(
        &self,
        player_id: impl Into<PlayerId>,
        player_name: impl Into<String>,
    ) -> Self {
        let player_id = player_id.into();
        let mut next = self.clone();
        next.players
            .insert(player_id.clone(), PlayerSeat::new(Mark::O, player_name.into()));
        next.player_order.push(player_id);
        next.status = MatchStatus::Playing;
        next.check_invariants();
        next
    }

    /// Returns a copy with `player_id`'s move applied at `cell`, or the
    /// reason the move is not legal against this snapshot.
    ///
    /// On success the turn passes to the opponent unless the move finished
    /// the match. Win detection runs only for the moving mark.
    pub fn with_move(&self, player_id: &str, cell: usize) -> Result<Self, MoveRejection> {
        if self.status != MatchStatus::Playing {
            return Err(MoveRejection::NotPlaying);
        }
        let mark = *self
            .seat(player_id)
            .ok_or(MoveRejection::UnknownPlayer)?
            .mark();
        if mark != self.current_turn {
            return Err(MoveRejection::OutOfTurn);
        }
        let board = self.board.with_move(cell, mark).map_err(MoveRejection::Cell)?;

        let mut next = self.clone();
        next.board = board;
        next.current_turn = mark.opponent();
        if board.has_win(mark) {
            next.status = MatchStatus::Finished;
            next.winner = Some(mark);
        } else if board.is_full() {
            next.status = MatchStatus::Finished;
            next.winner = None;
        }
        next.check_invariants();
        Ok(next)
    }

    /// Returns a copy reset for a rematch: empty board, X to move, no winner,
    /// ledger re-armed. Meaningful only from `Finished`; the match service
    /// guards that transition.
    pub fn restarted(&self) -> Self {
        let mut next = self.clone();
        next.board = Board::new();
        next.status = MatchStatus::Playing;
        next.current_turn = Mark::X;
        next.winner = None;
        next.stats_applied = false;
        next.check_invariants();
        next
    }

    /// Returns a copy with the ledger flag set. The stats service writes
    /// this only after every per-player update has landed.
    pub fn with_stats_applied(&self) -> Self {
        let mut next = self.clone();
        next.stats_applied = true;
        next
    }

    /// Reports the outcome of this match from `player_id`'s perspective.
    ///
    /// Returns `None` unless the match is finished and the player is seated.
    pub fn outcome_for(&self, player_id: &str) -> Option<PlayerOutcome> {
        if self.status != MatchStatus::Finished {
            return None;
        }
        let seat = self.seat(player_id)?;
        Some(match self.winner {
            None => PlayerOutcome::Draw,
            Some(w) if w == *seat.mark() => PlayerOutcome::Win,
            Some(_) => PlayerOutcome::Loss,
        })
    }
}

/// Match outcome from one player's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum PlayerOutcome {
    /// Player held the winning mark.
    #[display("win")]
    Win,
    /// A winner exists and it was the opponent.
    #[display("loss")]
    Loss,
    /// Board filled with no winner.
    #[display("draw")]
    Draw,
}

/// Aggregated win/loss/draw record for one player, keyed by player id.
///
/// Created zero-initialized at identity registration and incremented exactly
/// once per finished match the player took part in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct PlayerStats {
    /// Display name, denormalized for leaderboard rendering.
    name: String,
    /// Matches won.
    wins: u32,
    /// Matches lost.
    losses: u32,
    /// Matches drawn.
    draws: u32,
}

impl PlayerStats {
    /// Creates a zeroed record for a newly registered player.
    pub fn zeroed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            wins: 0,
            losses: 0,
            draws: 0,
        }
    }

    /// Returns a copy with `outcome` credited.
    pub fn credited(&self, outcome: PlayerOutcome) -> Self {
        let mut next = self.clone();
        match outcome {
            PlayerOutcome::Win => next.wins += 1,
            PlayerOutcome::Loss => next.losses += 1,
            PlayerOutcome::Draw => next.draws += 1,
        }
        next
    }

    /// Total matches recorded.
    pub fn total(&self) -> u32 {
        self.wins + self.losses + self.draws
    }
}
