//! Tests for the statistics ledger: idempotent outcome recording and the
//! leaderboard.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use gridmatch::{
    DocId, Document, DocumentStore, GameError, MatchService, Matchmaker, MemoryStore, PLAYER_STATS,
    PlayerStats, Query, StatsService, StoreError, Subscription, TransactFn, TransactOutcome,
};

struct Fixture {
    matchmaker: Matchmaker,
    matches: MatchService,
    stats: StatsService,
}

fn fixture() -> Fixture {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    Fixture {
        matchmaker: Matchmaker::new(store.clone()),
        matches: MatchService::new(store.clone()),
        stats: StatsService::new(store),
    }
}

impl Fixture {
    /// Registers both players and plays one match to completion.
    /// `script` alternates host/guest moves starting with the host.
    async fn play_match(&self, script: &[usize]) -> String {
        self.stats.register_player("host", "Ada").await.expect("Register failed");
        self.stats.register_player("guest", "Brin").await.expect("Register failed");
        let match_id = self
            .matchmaker
            .create_and_join("host", "Ada")
            .await
            .expect("Create failed");
        self.matchmaker
            .join_match(&match_id, "guest", "Brin")
            .await
            .expect("Join failed");
        self.run_script(&match_id, script).await;
        match_id
    }

    async fn run_script(&self, match_id: &str, script: &[usize]) {
        for (turn, &cell) in script.iter().enumerate() {
            let mover = if turn % 2 == 0 { "host" } else { "guest" };
            self.matches
                .attempt_move(match_id, mover, cell)
                .await
                .expect("Move failed");
        }
    }

    async fn stats_of(&self, player_id: &str) -> PlayerStats {
        self.stats
            .stats(player_id)
            .await
            .expect("Stats read failed")
            .expect("Stats record missing")
    }
}

/// Store wrapper that fails `transact` on one stats record for a configurable
/// number of calls, then behaves normally. Everything else delegates.
struct FlakyStore {
    inner: MemoryStore,
    fail_id: String,
    faults_left: AtomicU32,
}

impl FlakyStore {
    fn new(fail_id: &str, faults: u32) -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_id: fail_id.to_string(),
            faults_left: AtomicU32::new(faults),
        }
    }

    fn clear_faults(&self) {
        self.faults_left.store(0, Ordering::SeqCst);
    }

    fn take_fault(&self, collection: &str, id: &str) -> bool {
        collection == PLAYER_STATS
            && id == self.fail_id
            && self
                .faults_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn insert(&self, collection: &str, data: Value) -> Result<DocId, StoreError> {
        self.inner.insert(collection, data).await
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        self.inner.set(collection, id, data).await
    }

    async fn transact(
        &self,
        collection: &str,
        id: &str,
        apply: TransactFn<'_>,
    ) -> Result<TransactOutcome, StoreError> {
        if self.take_fault(collection, id) {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        self.inner.transact(collection, id, apply).await
    }

    async fn subscribe(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Subscription<Document>, StoreError> {
        self.inner.subscribe(collection, id).await
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.inner.query(collection, query).await
    }

    async fn subscribe_query(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Subscription<Vec<Document>>, StoreError> {
        self.inner.subscribe_query(collection, query).await
    }
}

/// Fixture whose store fails stat transactions for `fail_id` until the fault
/// budget runs out. The concrete handle is kept for clearing faults.
fn flaky_fixture(fail_id: &str, faults: u32) -> (Arc<FlakyStore>, Fixture) {
    let store = Arc::new(FlakyStore::new(fail_id, faults));
    let dyn_store: Arc<dyn DocumentStore> = store.clone();
    let fx = Fixture {
        matchmaker: Matchmaker::new(dyn_store.clone()),
        matches: MatchService::new(dyn_store.clone()),
        stats: StatsService::new(dyn_store),
    };
    (store, fx)
}

/// Host wins on the 0-4-8 diagonal.
const HOST_WIN: [usize; 5] = [0, 1, 4, 2, 8];

/// Alternating fill, no line, draw.
const DRAW: [usize; 9] = [0, 1, 2, 4, 3, 5, 7, 6, 8];

#[tokio::test]
async fn test_win_credits_winner_and_loser() {
    let fx = fixture();
    let match_id = fx.play_match(&HOST_WIN).await;
    fx.stats.record_outcome(&match_id).await.expect("Record failed");

    let host = fx.stats_of("host").await;
    assert_eq!((*host.wins(), *host.losses(), *host.draws()), (1, 0, 0));
    let guest = fx.stats_of("guest").await;
    assert_eq!((*guest.wins(), *guest.losses(), *guest.draws()), (0, 1, 0));
}

#[tokio::test]
async fn test_draw_credits_both_players_once() {
    let fx = fixture();
    let match_id = fx.play_match(&DRAW).await;
    fx.stats.record_outcome(&match_id).await.expect("Record failed");

    for player in ["host", "guest"] {
        let s = fx.stats_of(player).await;
        assert_eq!((*s.wins(), *s.losses(), *s.draws()), (0, 0, 1));
    }
}

#[tokio::test]
async fn test_record_outcome_is_idempotent() {
    let fx = fixture();
    let match_id = fx.play_match(&HOST_WIN).await;

    // The renderer may see the same terminal snapshot many times.
    fx.stats.record_outcome(&match_id).await.expect("First record failed");
    fx.stats.record_outcome(&match_id).await.expect("Second record failed");
    fx.stats.record_outcome(&match_id).await.expect("Third record failed");

    let host = fx.stats_of("host").await;
    assert_eq!(*host.wins(), 1);
    let guest = fx.stats_of("guest").await;
    assert_eq!(*guest.losses(), 1);

    let m = fx.matches.get_match(&match_id).await.expect("Get failed");
    assert!(*m.stats_applied());
}

#[tokio::test]
async fn test_partial_stat_failure_names_player_and_leaves_flag_unset() {
    // The guest's stats document rejects every transaction until cleared.
    let (store, fx) = flaky_fixture("guest", u32::MAX);
    let match_id = fx.play_match(&HOST_WIN).await;

    match fx.stats.record_outcome(&match_id).await {
        Err(GameError::StatUpdatePartialFailure { players }) => {
            assert_eq!(players, vec!["guest".to_string()]);
        }
        other => panic!("Expected a partial stat failure, got {other:?}"),
    }

    // The flag stays down and the failed player is uncredited, so a retry
    // can finish the job.
    let m = fx.matches.get_match(&match_id).await.expect("Get failed");
    assert!(!*m.stats_applied());
    let guest = fx.stats_of("guest").await;
    assert_eq!(guest.total(), 0);

    store.clear_faults();
    fx.stats.record_outcome(&match_id).await.expect("Retry record failed");

    let guest = fx.stats_of("guest").await;
    assert_eq!(*guest.losses(), 1);
    let m = fx.matches.get_match(&match_id).await.expect("Get failed");
    assert!(*m.stats_applied());
}

#[tokio::test]
async fn test_transient_conflict_is_absorbed_by_in_call_retry() {
    // A single conflict is below the per-player retry budget, so one call
    // still credits everyone and sets the flag.
    let (_store, fx) = flaky_fixture("guest", 1);
    let match_id = fx.play_match(&HOST_WIN).await;

    fx.stats.record_outcome(&match_id).await.expect("Record failed");

    let host = fx.stats_of("host").await;
    assert_eq!(*host.wins(), 1);
    let guest = fx.stats_of("guest").await;
    assert_eq!((*guest.wins(), *guest.losses(), *guest.draws()), (0, 1, 0));
    let m = fx.matches.get_match(&match_id).await.expect("Get failed");
    assert!(*m.stats_applied());
}

#[tokio::test]
async fn test_record_outcome_on_live_match_is_noop() {
    let fx = fixture();
    let match_id = fx.play_match(&[0, 1]).await;
    fx.stats.record_outcome(&match_id).await.expect("Record should not error");

    let host = fx.stats_of("host").await;
    assert_eq!(host.total(), 0);
    let m = fx.matches.get_match(&match_id).await.expect("Get failed");
    assert!(!*m.stats_applied());
}

#[tokio::test]
async fn test_record_outcome_missing_match_fails() {
    let fx = fixture();
    let result = fx.stats.record_outcome("no-such-match").await;
    assert!(matches!(result, Err(GameError::MatchNotFound(_))));
}

#[tokio::test]
async fn test_unregistered_player_gets_seeded_record() {
    let fx = fixture();
    // No registration: play directly.
    let match_id = fx
        .matchmaker
        .create_and_join("host", "Ada")
        .await
        .expect("Create failed");
    fx.matchmaker
        .join_match(&match_id, "guest", "Brin")
        .await
        .expect("Join failed");
    fx.run_script(&match_id, &HOST_WIN).await;

    fx.stats.record_outcome(&match_id).await.expect("Record failed");

    let host = fx.stats_of("host").await;
    assert_eq!(host.name(), "Ada");
    assert_eq!(*host.wins(), 1);
}

#[tokio::test]
async fn test_restart_rearms_the_ledger() {
    let fx = fixture();
    let match_id = fx.play_match(&HOST_WIN).await;
    fx.stats.record_outcome(&match_id).await.expect("Record failed");

    fx.matches.restart(&match_id).await.expect("Restart failed");
    fx.run_script(&match_id, &HOST_WIN).await;
    fx.stats.record_outcome(&match_id).await.expect("Second record failed");

    let host = fx.stats_of("host").await;
    assert_eq!(*host.wins(), 2);
    let guest = fx.stats_of("guest").await;
    assert_eq!(*guest.losses(), 2);
}

#[tokio::test]
async fn test_is_name_taken() {
    let fx = fixture();
    assert!(!fx.stats.is_name_taken("Ada").await.expect("Query failed"));
    fx.stats.register_player("host", "Ada").await.expect("Register failed");
    assert!(fx.stats.is_name_taken("Ada").await.expect("Query failed"));
    assert!(!fx.stats.is_name_taken("Brin").await.expect("Query failed"));
}

#[tokio::test]
async fn test_leaderboard_orders_by_wins_desc() {
    let fx = fixture();
    let match_id = fx.play_match(&HOST_WIN).await;
    fx.stats.record_outcome(&match_id).await.expect("Record failed");

    // A second host win via rematch.
    fx.matches.restart(&match_id).await.expect("Restart failed");
    fx.run_script(&match_id, &HOST_WIN).await;
    fx.stats.record_outcome(&match_id).await.expect("Record failed");

    let board = fx.stats.leaderboard(10).await.expect("Leaderboard failed");
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].player_id(), "host");
    assert_eq!(*board[0].stats().wins(), 2);
    assert_eq!(board[1].player_id(), "guest");

    let top_one = fx.stats.leaderboard(1).await.expect("Leaderboard failed");
    assert_eq!(top_one.len(), 1);
    assert_eq!(top_one[0].player_id(), "host");
}

#[tokio::test]
async fn test_leaderboard_subscription_tracks_updates() {
    let fx = fixture();
    fx.stats.register_player("host", "Ada").await.expect("Register failed");
    let mut subscription = fx
        .stats
        .subscribe_leaderboard(10)
        .await
        .expect("Subscribe failed");

    let initial = subscription.next().await.expect("Initial ranking missing");
    assert_eq!(initial.len(), 1);

    fx.stats.register_player("guest", "Brin").await.expect("Register failed");
    let updated = subscription.next().await.expect("Updated ranking missing");
    assert_eq!(updated.len(), 2);
}
