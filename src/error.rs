// Error taxonomy for the player pool, the balancing engine and the ledger.
// Every variant here is a caller error except the storage/database ones.

use thiserror::Error;

// ============================================================================
// PLAYER VALIDATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerError {
    #[error("Player name must not be empty")]
    EmptyName,

    #[error("{attribute} rating for '{player}' must be between 1 and 10, got {value}")]
    AttributeOutOfRange {
        player: String,
        attribute: &'static str,
        value: u8,
    },
}

// ============================================================================
// BALANCING ENGINE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BalanceError {
    #[error("Expected 10 or 12 available players, got {0}")]
    InvalidPoolSize(usize),

    #[error("Player '{0}' appears more than once in the pool")]
    DuplicatePlayer(String),

    #[error("Player '{0}' is not available")]
    UnavailablePlayer(String),

    #[error(transparent)]
    InvalidPlayer(#[from] PlayerError),
}

// ============================================================================
// MATCH LEDGER
// ============================================================================

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Scores must be non-negative, got {red_score}-{yellow_score}")]
    InvalidScore { red_score: i64, yellow_score: i64 },

    #[error("{0} team has no players")]
    EmptyTeam(&'static str),

    #[error("Ledger storage failed: {0:#}")]
    Storage(#[from] anyhow::Error),
}

// ============================================================================
// PLAYER POOL STORE
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Player '{0}' already exists")]
    PlayerExists(String),

    #[error("Player '{0}' not found")]
    PlayerNotFound(String),

    #[error(transparent)]
    InvalidPlayer(#[from] PlayerError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
