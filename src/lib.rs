// Team Picker - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod balance;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod player;
pub mod stats;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use balance::{BalanceResult, BalanceWeights, Team, TeamBalancer, RED_TEAM, YELLOW_TEAM};
pub use config::Config;
pub use db::{
    setup_database, open_database,
    insert_player, upsert_player, update_player, get_player, get_all_players, get_available_players,
    count_players, seed_default_players, load_players_csv, read_players_csv, import_players,
    SqliteLedgerStore, DEFAULT_PLAYERS,
};
pub use error::{BalanceError, LedgerError, PlayerError, StoreError};
pub use ledger::{
    Game, GameFilter, GameId, GameScore, LedgerSnapshot, LedgerStore, MatchLedger,
    MemoryLedgerStore, RecordedGame, Side,
};
pub use player::{Player, PlayerAttributes};
pub use stats::{
    leaderboard, partnerships, stats_for, win_rate, LeaderboardEntry, PartnerStats, PlayerStats,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
