//! Tests for match creation and joining.

use std::sync::Arc;

use gridmatch::{
    DocumentStore, GameError, Mark, MatchService, MatchStatus, Matchmaker, MemoryStore,
    invite_url, parse_match_id,
};

fn services() -> (Matchmaker, MatchService) {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    (Matchmaker::new(store.clone()), MatchService::new(store))
}

#[tokio::test]
async fn test_create_seats_host_at_x_waiting() {
    let (matchmaker, matches) = services();
    let match_id = matchmaker
        .create_and_join("host", "Ada")
        .await
        .expect("Create failed");

    let m = matches.get_match(&match_id).await.expect("Get failed");
    assert_eq!(*m.status(), MatchStatus::Waiting);
    assert_eq!(m.player_order(), &vec!["host".to_string()]);
    assert_eq!(*m.seat("host").expect("Host seated").mark(), Mark::X);
    assert_eq!(*m.current_turn(), Mark::X);
    assert!(!*m.stats_applied());
}

#[tokio::test]
async fn test_join_seats_guest_at_o_and_starts_play() {
    let (matchmaker, matches) = services();
    let match_id = matchmaker.create_and_join("host", "Ada").await.expect("Create failed");
    matchmaker
        .join_match(&match_id, "guest", "Brin")
        .await
        .expect("Join failed");

    let m = matches.get_match(&match_id).await.expect("Get failed");
    assert_eq!(*m.status(), MatchStatus::Playing);
    assert_eq!(m.player_order().len(), 2);
    assert_eq!(*m.seat("guest").expect("Guest seated").mark(), Mark::O);
    // The two seats hold distinct marks.
    assert_ne!(
        m.seat("host").expect("Host seated").mark(),
        m.seat("guest").expect("Guest seated").mark()
    );
}

#[tokio::test]
async fn test_third_player_is_rejected_and_match_unchanged() {
    let (matchmaker, matches) = services();
    let match_id = matchmaker.create_and_join("host", "Ada").await.expect("Create failed");
    matchmaker.join_match(&match_id, "guest", "Brin").await.expect("Join failed");

    let before = matches.get_match(&match_id).await.expect("Get failed");
    let result = matchmaker.join_match(&match_id, "intruder", "Eve").await;
    assert!(matches!(result, Err(GameError::MatchFull(_))));

    let after = matches.get_match(&match_id).await.expect("Get failed");
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_rejoin_is_idempotent() {
    let (matchmaker, matches) = services();
    let match_id = matchmaker.create_and_join("host", "Ada").await.expect("Create failed");
    matchmaker.join_match(&match_id, "guest", "Brin").await.expect("Join failed");

    // Page reload: the same player joins again.
    matchmaker
        .join_match(&match_id, "guest", "Brin")
        .await
        .expect("Rejoin should be a no-op");

    let m = matches.get_match(&match_id).await.expect("Get failed");
    assert_eq!(m.player_order().len(), 2);
}

#[tokio::test]
async fn test_host_rejoin_own_waiting_match_is_noop() {
    let (matchmaker, matches) = services();
    let match_id = matchmaker.create_and_join("host", "Ada").await.expect("Create failed");

    matchmaker
        .join_match(&match_id, "host", "Ada")
        .await
        .expect("Host rejoin should be a no-op");

    let m = matches.get_match(&match_id).await.expect("Get failed");
    assert_eq!(*m.status(), MatchStatus::Waiting);
    assert_eq!(m.player_order().len(), 1);
}

#[tokio::test]
async fn test_join_missing_match_fails() {
    let (matchmaker, _) = services();
    let result = matchmaker.join_match("no-such-match", "guest", "Brin").await;
    assert!(matches!(result, Err(GameError::MatchNotFound(_))));
}

#[test]
fn test_parse_match_id_accepts_bare_id() {
    assert_eq!(parse_match_id("abc123"), Some("abc123".to_string()));
    assert_eq!(parse_match_id("  abc123  "), Some("abc123".to_string()));
}

#[test]
fn test_parse_match_id_accepts_invite_url() {
    let url = invite_url("https://example.com/play", "abc123");
    assert_eq!(parse_match_id(&url), Some("abc123".to_string()));
    assert_eq!(
        parse_match_id("https://example.com/play?gId=abc123&utm=x"),
        Some("abc123".to_string())
    );
}

#[test]
fn test_parse_match_id_rejects_empty() {
    assert_eq!(parse_match_id(""), None);
    assert_eq!(parse_match_id("   "), None);
    assert_eq!(parse_match_id("https://example.com/play?gId="), None);
}
