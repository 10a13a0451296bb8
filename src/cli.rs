//! Command-line interface for the gridmatch demo binary.

use clap::{Parser, Subcommand};

/// Gridmatch - transactional tic-tac-toe match core
#[derive(Parser, Debug)]
#[command(name = "gridmatch")]
#[command(about = "Simulate synchronized tic-tac-toe matches over the in-memory store", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a scripted two-client simulation against one shared store
    Simulate {
        /// Number of matches to play (win and draw scripts alternate)
        #[arg(long, default_value_t = 2)]
        games: u32,

        /// Leaderboard size printed after the run
        #[arg(long, default_value_t = 10)]
        leaderboard: usize,
    },
}
