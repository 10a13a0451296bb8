//! Gridmatch - transactional core for real-time two-player tic-tac-toe
//!
//! Board rules, match lifecycle, matchmaking, and an idempotent statistics
//! ledger, all expressed as atomic transactions against a small document
//! store capability interface. The store is the single source of truth:
//! every multi-party race (two clicks on one cell, two clients grabbing the
//! last seat) resolves through its transaction primitive, never through
//! client-side locks.
//!
//! # Architecture
//!
//! - **Board**: pure move legality and win/draw detection
//! - **MatchService**: waiting → playing → finished state machine with
//!   transactional move application and explicit restart
//! - **Matchmaker**: match creation and capacity-checked joins
//! - **StatsService**: at-most-once win/loss/draw aggregation plus the
//!   leaderboard
//! - **store**: the `DocumentStore` seam and an in-memory reference
//!   implementation
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use gridmatch::{DocumentStore, Matchmaker, MatchService, MemoryStore};
//!
//! # async fn example() -> Result<(), gridmatch::GameError> {
//! let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
//! let matchmaker = Matchmaker::new(store.clone());
//! let matches = MatchService::new(store);
//!
//! let match_id = matchmaker.create_and_join("p1", "Ada").await?;
//! matchmaker.join_match(&match_id, "p2", "Brin").await?;
//! matches.attempt_move(&match_id, "p1", 4).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod board;
mod error;
mod match_service;
mod matchmaking;
mod model;
mod session;
mod stats_service;
mod store;

// Crate-level exports - board rules
pub use board::{BOARD_CELLS, Board, IllegalMove, Mark, WIN_LINES};

// Crate-level exports - document model
pub use model::{
    MATCHES, MatchDoc, MatchId, MatchStatus, MoveRejection, PLAYER_STATS, PlayerId, PlayerOutcome,
    PlayerSeat, PlayerStats,
};

// Crate-level exports - errors
pub use error::GameError;

// Crate-level exports - services
pub use match_service::{MatchService, MoveOutcome};
pub use matchmaking::{Matchmaker, invite_url, parse_match_id};
pub use stats_service::{LeaderboardEntry, StatsService};

// Crate-level exports - session management
pub use session::SessionContext;

// Crate-level exports - storage capability
pub use store::{
    DocId, Document, DocumentStore, MemoryStore, Query, SortDirection, StoreError, Subscription,
    TransactFn, TransactOutcome, TransactStep, TypedQuerySubscription, TypedSubscription, decode,
    encode, get_as, transact_as,
};
