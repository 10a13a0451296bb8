//! Statistics ledger: idempotent win/loss/draw aggregation and leaderboard.

use std::sync::Arc;

use derive_getters::Getters;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::error::GameError;
use crate::model::{
    MATCHES, MatchDoc, MatchStatus, PLAYER_STATS, PlayerId, PlayerOutcome, PlayerStats,
};
use crate::store::{
    DocumentStore, Query, StoreError, TypedQuerySubscription, TypedSubscription, encode, get_as,
    transact_as,
};

/// In-call retry budget for one player's stat transaction.
const MAX_CREDIT_ATTEMPTS: u32 = 3;

/// One leaderboard row: player id plus their aggregated record.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct LeaderboardEntry {
    /// Stats document id, which is the player id.
    player_id: PlayerId,
    /// The player's aggregated record.
    stats: PlayerStats,
}

/// Maintains per-player statistics documents and the leaderboard view.
#[derive(Clone)]
pub struct StatsService {
    store: Arc<dyn DocumentStore>,
}

impl StatsService {
    /// Creates a stats service over the given store.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Checks whether any registered player already uses `name`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Store`] if the query fails.
    #[instrument(skip(self))]
    pub async fn is_name_taken(&self, name: &str) -> Result<bool, GameError> {
        let query = Query::new().where_eq("name", json!(name)).limit(1);
        let hits = self.store.query(PLAYER_STATS, &query).await?;
        Ok(!hits.is_empty())
    }

    /// Creates the zero-initialized stats record for a newly established
    /// identity. Callers wanting unique display names check
    /// [`StatsService::is_name_taken`] first.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Store`] if the write fails.
    #[instrument(skip(self))]
    pub async fn register_player(&self, player_id: &str, name: &str) -> Result<(), GameError> {
        self.store
            .set(PLAYER_STATS, player_id, encode(&PlayerStats::zeroed(name))?)
            .await?;
        info!(player_id, name, "Player registered with zeroed stats");
        Ok(())
    }

    /// Reads one player's current record, or `None` if never registered.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Store`] if the read fails.
    #[instrument(skip(self))]
    pub async fn stats(&self, player_id: &str) -> Result<Option<PlayerStats>, GameError> {
        Ok(get_as(self.store.as_ref(), PLAYER_STATS, player_id).await?)
    }

    /// Subscribes to one player's record (the in-game W/L/D panel).
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Store`] if the store cannot register the
    /// subscription.
    #[instrument(skip(self))]
    pub async fn subscribe_player(
        &self,
        player_id: &str,
    ) -> Result<TypedSubscription<PlayerStats>, GameError> {
        let sub = self.store.subscribe(PLAYER_STATS, player_id).await?;
        Ok(TypedSubscription::new(sub))
    }

    /// Credits the terminal outcome of a match to every participant, at most
    /// once per match.
    ///
    /// No-op when the match's ledger flag is already set, so re-delivered
    /// terminal snapshots cannot double-count. Each player's increment is
    /// its own transaction with a small in-call retry budget; the flag is
    /// written only after every player's update landed.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MatchNotFound`] for a missing match and
    /// [`GameError::StatUpdatePartialFailure`] naming the players still
    /// uncredited; the flag stays false so a retry can finish the job.
    #[instrument(skip(self))]
    pub async fn record_outcome(&self, match_id: &str) -> Result<(), GameError> {
        let m: MatchDoc = get_as(self.store.as_ref(), MATCHES, match_id)
            .await?
            .ok_or_else(|| GameError::MatchNotFound(match_id.to_string()))?;

        if *m.stats_applied() {
            debug!(match_id, "Outcome already recorded, skipping");
            return Ok(());
        }
        if *m.status() != MatchStatus::Finished {
            warn!(match_id, status = %m.status(), "Match is not terminal, nothing to record");
            return Ok(());
        }

        let mut pending = Vec::new();
        for player_id in m.player_order() {
            // outcome_for is Some for every seated player of a finished match
            let Some(outcome) = m.outcome_for(player_id) else {
                continue;
            };
            if let Err(err) = self.credit_player(&m, player_id, outcome).await {
                warn!(match_id, player_id = %player_id, error = %err, "Stat credit failed");
                pending.push(player_id.clone());
            }
        }

        if !pending.is_empty() {
            return Err(GameError::StatUpdatePartialFailure { players: pending });
        }

        transact_as::<MatchDoc, _>(self.store.as_ref(), MATCHES, match_id, |m| {
            (!*m.stats_applied()).then(|| m.with_stats_applied())
        })
        .await
        .map_err(|e| GameError::match_not_found(e, match_id))?;
        info!(match_id, winner = ?m.winner(), "Match outcome recorded");
        Ok(())
    }

    /// One player's increment as an independent, bounded-retry transaction.
    async fn credit_player(
        &self,
        m: &MatchDoc,
        player_id: &str,
        outcome: PlayerOutcome,
    ) -> Result<(), StoreError> {
        let mut last_err = None;
        for attempt in 1..=MAX_CREDIT_ATTEMPTS {
            let result = transact_as::<PlayerStats, _>(
                self.store.as_ref(),
                PLAYER_STATS,
                player_id,
                |stats| Some(stats.credited(outcome)),
            )
            .await;
            match result {
                Ok(_) => {
                    debug!(player_id, %outcome, "Stat credited");
                    return Ok(());
                }
                // Missing record: the player skipped registration (original
                // behavior: start from zeroes and credit).
                Err(StoreError::NotFound { .. }) => {
                    let name = m
                        .seat(player_id)
                        .map(|s| s.name().clone())
                        .unwrap_or_default();
                    let seeded = PlayerStats::zeroed(name).credited(outcome);
                    self.store
                        .set(PLAYER_STATS, player_id, encode(&seeded)?)
                        .await?;
                    debug!(player_id, %outcome, "Stat record seeded and credited");
                    return Ok(());
                }
                // Transient conflict: retry against the fresh snapshot.
                Err(err @ StoreError::Conflict { .. }) => {
                    debug!(player_id, attempt, error = %err, "Retrying stat credit");
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err.unwrap_or(StoreError::Closed))
    }

    /// Returns up to `limit` players ordered by wins, best first.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Store`] if the query fails.
    #[instrument(skip(self))]
    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, GameError> {
        let query = Query::new().order_by_desc("wins").limit(limit);
        let docs = self.store.query(PLAYER_STATS, &query).await?;
        let mut entries = Vec::with_capacity(docs.len());
        for doc in docs {
            match crate::store::decode::<PlayerStats>(&doc.data) {
                Ok(stats) => entries.push(LeaderboardEntry {
                    player_id: doc.id,
                    stats,
                }),
                Err(err) => warn!(doc_id = %doc.id, error = %err, "Skipping malformed stats record"),
            }
        }
        Ok(entries)
    }

    /// Live leaderboard: the current ranking arrives first, then a fresh
    /// ranking after every stats write.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Store`] if the store cannot register the
    /// subscription.
    #[instrument(skip(self))]
    pub async fn subscribe_leaderboard(
        &self,
        limit: usize,
    ) -> Result<TypedQuerySubscription<PlayerStats>, GameError> {
        let query = Query::new().order_by_desc("wins").limit(limit);
        let sub = self.store.subscribe_query(PLAYER_STATS, &query).await?;
        Ok(TypedQuerySubscription::new(sub))
    }
}
