//! Gridmatch demo binary.
//!
//! Drives two simulated clients through the full surface: registration,
//! matchmaking via invite URL, a racing out-of-turn click, scripted play to
//! a win or a draw, outcome recording, a rematch, and the leaderboard.

#![warn(missing_docs)]

mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use gridmatch::{
    DocumentStore, MatchDoc, MatchService, Matchmaker, MemoryStore, SessionContext, StatsService,
    TypedSubscription, invite_url, parse_match_id,
};
use tokio::time::timeout;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// X's moves interleaved with O's, ending in the X diagonal win.
const WIN_SCRIPT: [usize; 5] = [0, 1, 4, 2, 8];

/// Alternating fill with no complete line; ends in a draw.
const DRAW_SCRIPT: [usize; 9] = [0, 1, 2, 4, 3, 5, 7, 6, 8];

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Simulate { games, leaderboard } => simulate(games, leaderboard).await,
    }
}

/// Runs the scripted simulation against one shared in-memory store.
#[instrument]
async fn simulate(games: u32, leaderboard: usize) -> Result<()> {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let matchmaker = Matchmaker::new(store.clone());
    let matches = MatchService::new(store.clone());
    let stats = StatsService::new(store);

    let host = register(&stats, "Ada").await?;
    let guest = register(&stats, "Brin").await?;
    let mut host_session = SessionContext::new(host.clone(), "Ada");
    let mut guest_session = SessionContext::new(guest.clone(), "Brin");

    for game in 0..games {
        let match_id = matchmaker
            .create_and_join(host_session.player_id(), host_session.display_name())
            .await?;
        let url = invite_url("https://gridmatch.example/play", &match_id);
        info!(%url, "Invite link for the opponent");

        // The guest joins the way a browser would: by pasting the URL.
        let joined_id = parse_match_id(&url).context("invite URL lost its match id")?;
        matchmaker
            .join_match(&joined_id, guest_session.player_id(), guest_session.display_name())
            .await?;

        host_session.enter_match(match_id.clone(), matches.subscribe_match(&match_id).await?);
        guest_session.enter_match(match_id.clone(), matches.subscribe_match(&match_id).await?);
        host_session.watch_stats(stats.subscribe_player(&guest).await?);
        guest_session.watch_stats(stats.subscribe_player(&host).await?);

        // A stale click: the guest tries to move first and is ignored.
        matches.attempt_move(&match_id, &guest, 4).await?;

        let script: &[usize] = if game % 2 == 0 { &WIN_SCRIPT } else { &DRAW_SCRIPT };
        play_script(&matches, &match_id, &host, &guest, script).await?;
        report(&mut host_session).await;

        stats.record_outcome(&match_id).await?;

        // Rematch on the final game to show the ledger re-arming.
        if game + 1 == games {
            matches.restart(&match_id).await?;
            play_script(&matches, &match_id, &host, &guest, &WIN_SCRIPT).await?;
            report(&mut host_session).await;
            stats.record_outcome(&match_id).await?;
        }

        host_session.leave();
        guest_session.leave();
    }

    for (rank, entry) in stats.leaderboard(leaderboard).await?.iter().enumerate() {
        let s = entry.stats();
        println!(
            "{:>2}. {:<12} W:{} / L:{} / D:{}",
            rank + 1,
            s.name(),
            s.wins(),
            s.losses(),
            s.draws()
        );
    }
    Ok(())
}

/// Registers a player with a fresh id, refusing a taken display name.
async fn register(stats: &StatsService, name: &str) -> Result<String> {
    anyhow::ensure!(
        !stats.is_name_taken(name).await?,
        "display name '{name}' is already taken"
    );
    let player_id = Uuid::new_v4().to_string();
    stats.register_player(&player_id, name).await?;
    Ok(player_id)
}

/// Plays a move script, host and guest alternating from the host.
async fn play_script(
    matches: &MatchService,
    match_id: &str,
    host: &str,
    guest: &str,
    script: &[usize],
) -> Result<()> {
    for (turn, &cell) in script.iter().enumerate() {
        let mover = if turn % 2 == 0 { host } else { guest };
        matches.attempt_move(match_id, mover, cell).await?;
    }
    Ok(())
}

/// Drains the session's snapshot stream and logs the latest board.
async fn report(session: &mut SessionContext) {
    let Some(updates) = session.match_updates() else {
        return;
    };
    if let Some(snapshot) = latest(updates).await {
        info!(
            status = %snapshot.status(),
            winner = ?snapshot.winner(),
            "\n{}",
            snapshot.board().render()
        );
    }
}

/// Consumes buffered snapshots, returning the most recent one.
async fn latest(updates: &mut TypedSubscription<MatchDoc>) -> Option<MatchDoc> {
    let mut last = None;
    while let Ok(Some(snapshot)) = timeout(Duration::from_millis(20), updates.next()).await {
        last = Some(snapshot);
    }
    last
}
