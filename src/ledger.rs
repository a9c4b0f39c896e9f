// 📒 Match Ledger - append-only record of completed games
// One writer at a time; readers work from immutable snapshots
//
// Append order is the ledger's only ordering. `date` is caller-supplied
// metadata and is never used to re-sort.

use crate::balance::{Team, RED_TEAM, YELLOW_TEAM};
use crate::error::LedgerError;
use crate::stats::{self, PlayerStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{info, warn};

// ============================================================================
// GAME
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameScore {
    pub red_score: i64,
    pub yellow_score: i64,
}

impl GameScore {
    pub fn new(red_score: i64, yellow_score: i64) -> Self {
        GameScore {
            red_score,
            yellow_score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Red,
    Yellow,
}

fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    /// Caller-supplied date (YYYY-MM-DD); today when omitted
    #[serde(default = "today")]
    pub date: String,
    pub red_team: Team,
    pub yellow_team: Team,
    pub score: GameScore,
}

impl Game {
    pub fn new(date: impl Into<String>, red_team: Team, yellow_team: Team, score: GameScore) -> Self {
        Game {
            date: date.into(),
            red_team,
            yellow_team,
            score,
        }
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.score.red_score < 0 || self.score.yellow_score < 0 {
            return Err(LedgerError::InvalidScore {
                red_score: self.score.red_score,
                yellow_score: self.score.yellow_score,
            });
        }
        if self.red_team.is_empty() {
            return Err(LedgerError::EmptyTeam(RED_TEAM));
        }
        if self.yellow_team.is_empty() {
            return Err(LedgerError::EmptyTeam(YELLOW_TEAM));
        }
        Ok(())
    }

    /// Which team the player was fielded on, if any
    pub fn side_of(&self, name: &str) -> Option<Side> {
        if self.red_team.contains(name) {
            Some(Side::Red)
        } else if self.yellow_team.contains(name) {
            Some(Side::Yellow)
        } else {
            None
        }
    }

    pub fn team(&self, side: Side) -> &Team {
        match side {
            Side::Red => &self.red_team,
            Side::Yellow => &self.yellow_team,
        }
    }

    /// None on a draw
    pub fn winner(&self) -> Option<Side> {
        use std::cmp::Ordering;

        match self.score.red_score.cmp(&self.score.yellow_score) {
            Ordering::Greater => Some(Side::Red),
            Ordering::Less => Some(Side::Yellow),
            Ordering::Equal => None,
        }
    }
}

// ============================================================================
// RECORDED GAME
// ============================================================================

/// Position of a game in the ledger (1-based, append order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedGame {
    pub id: GameId,

    /// When the ledger accepted the game
    pub recorded_at: DateTime<Utc>,

    #[serde(flatten)]
    pub game: Game,
}

// ============================================================================
// FILTER
// ============================================================================

/// Optional narrowing for `MatchLedger::list`; bounds are inclusive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameFilter {
    pub player: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
}

impl GameFilter {
    pub fn for_player(name: impl Into<String>) -> Self {
        GameFilter {
            player: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, game: &Game) -> bool {
        if let Some(name) = &self.player {
            if game.side_of(name).is_none() {
                return false;
            }
        }
        // YYYY-MM-DD sorts correctly as text
        if let Some(since) = &self.since {
            if game.date.as_str() < since.as_str() {
                return false;
            }
        }
        if let Some(until) = &self.until {
            if game.date.as_str() > until.as_str() {
                return false;
            }
        }
        true
    }
}

// ============================================================================
// STORAGE BACKEND
// ============================================================================

/// Durable append-only storage behind the ledger.
/// `load_all` must return games in append order.
pub trait LedgerStore: Send {
    fn append(&mut self, game: &Game, recorded_at: DateTime<Utc>) -> anyhow::Result<GameId>;

    fn load_all(&self) -> anyhow::Result<Vec<RecordedGame>>;
}

/// Volatile backend for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    games: Vec<RecordedGame>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_games(games: Vec<RecordedGame>) -> Self {
        MemoryLedgerStore { games }
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn append(&mut self, game: &Game, recorded_at: DateTime<Utc>) -> anyhow::Result<GameId> {
        let id = GameId(self.games.len() as u64 + 1);
        self.games.push(RecordedGame {
            id,
            recorded_at,
            game: game.clone(),
        });
        Ok(id)
    }

    fn load_all(&self) -> anyhow::Result<Vec<RecordedGame>> {
        Ok(self.games.clone())
    }
}

// ============================================================================
// LEDGER
// ============================================================================

/// Immutable view of the ledger at one point in time
pub type LedgerSnapshot = Arc<Vec<Arc<RecordedGame>>>;

pub struct MatchLedger {
    /// Held for the whole append so appends form a single total order
    store: Mutex<Box<dyn LedgerStore>>,

    /// Only ever replaced by a complete vector
    published: RwLock<LedgerSnapshot>,
}

impl MatchLedger {
    /// Open a ledger over a backend, replaying what it already holds
    pub fn new<S: LedgerStore + 'static>(store: S) -> Result<Self, LedgerError> {
        let games = store.load_all()?;
        info!(games = games.len(), "ledger opened");

        Ok(MatchLedger {
            store: Mutex::new(Box::new(store)),
            published: RwLock::new(Arc::new(games.into_iter().map(Arc::new).collect())),
        })
    }

    pub fn in_memory() -> Self {
        MatchLedger {
            store: Mutex::new(Box::new(MemoryLedgerStore::new())),
            published: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Validate, persist and publish one game. All-or-nothing: a storage
    /// failure leaves the published ledger untouched.
    pub fn append(&self, game: Game) -> Result<GameId, LedgerError> {
        if let Err(e) = game.validate() {
            warn!(error = %e, "rejected game");
            return Err(e);
        }

        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        let recorded_at = Utc::now();
        let id = store.append(&game, recorded_at)?;

        let score = game.score;
        let recorded = Arc::new(RecordedGame {
            id,
            recorded_at,
            game,
        });

        {
            let mut published = self.published.write().unwrap_or_else(PoisonError::into_inner);
            Arc::make_mut(&mut *published).push(recorded);
        }
        drop(store);

        info!(
            game_id = %id,
            red_score = score.red_score,
            yellow_score = score.yellow_score,
            "game recorded"
        );
        Ok(id)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let published = self.published.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&published)
    }

    /// Games in append order
    pub fn list(&self, filter: &GameFilter) -> Vec<RecordedGame> {
        self.snapshot()
            .iter()
            .filter(|g| filter.matches(&g.game))
            .map(|g| RecordedGame::clone(g))
            .collect()
    }

    pub fn get(&self, id: GameId) -> Option<RecordedGame> {
        self.snapshot()
            .iter()
            .find(|g| g.id == id)
            .map(|g| RecordedGame::clone(g))
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats_for(&self, name: &str) -> PlayerStats {
        let snapshot = self.snapshot();
        stats::stats_for(snapshot.iter().map(|g| &g.game), name)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{Player, PlayerAttributes};
    use std::thread;

    fn team(name: &str, players: &[&str]) -> Team {
        Team::new(
            name,
            players
                .iter()
                .map(|p| Player::new(*p, PlayerAttributes::uniform(5)))
                .collect(),
        )
    }

    fn game(date: &str, red: &[&str], yellow: &[&str], red_score: i64, yellow_score: i64) -> Game {
        Game::new(
            date,
            team("Red", red),
            team("Yellows", yellow),
            GameScore::new(red_score, yellow_score),
        )
    }

    struct FailingStore;

    impl LedgerStore for FailingStore {
        fn append(&mut self, _game: &Game, _recorded_at: DateTime<Utc>) -> anyhow::Result<GameId> {
            anyhow::bail!("disk full")
        }

        fn load_all(&self) -> anyhow::Result<Vec<RecordedGame>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_append_then_list_preserves_order() {
        let ledger = MatchLedger::in_memory();

        for i in 0..5 {
            let id = ledger.append(game("2024-01-15", &["A"], &["B"], i, 0)).unwrap();
            assert_eq!(id, GameId(i as u64 + 1));
        }

        let games = ledger.list(&GameFilter::default());
        assert_eq!(games.len(), 5);
        let scores: Vec<i64> = games.iter().map(|g| g.game.score.red_score).collect();
        assert_eq!(scores, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_out_of_order_dates_are_not_resorted() {
        let ledger = MatchLedger::in_memory();
        ledger.append(game("2024-03-01", &["A"], &["B"], 1, 0)).unwrap();
        ledger.append(game("2024-01-01", &["A"], &["B"], 2, 0)).unwrap();
        ledger.append(game("2024-02-01", &["A"], &["B"], 3, 0)).unwrap();

        let dates: Vec<String> = ledger
            .list(&GameFilter::default())
            .into_iter()
            .map(|g| g.game.date)
            .collect();
        assert_eq!(dates, vec!["2024-03-01", "2024-01-01", "2024-02-01"]);
    }

    #[test]
    fn test_negative_score_rejected() {
        let ledger = MatchLedger::in_memory();

        let err = ledger.append(game("2024-01-15", &["A"], &["B"], -1, 2)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidScore { red_score: -1, yellow_score: 2 }
        ));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_empty_team_rejected() {
        let ledger = MatchLedger::in_memory();

        let err = ledger.append(game("2024-01-15", &[], &["B"], 1, 2)).unwrap_err();
        assert!(matches!(err, LedgerError::EmptyTeam("Red")));

        let err = ledger.append(game("2024-01-15", &["A"], &[], 1, 2)).unwrap_err();
        assert!(matches!(err, LedgerError::EmptyTeam("Yellows")));
        assert!(err.to_string().contains("Yellows"));
        assert_eq!(ledger.len(), 0);
    }

    #[test]
    fn test_storage_failure_leaves_ledger_untouched() {
        let ledger = MatchLedger::new(FailingStore).unwrap();

        let err = ledger.append(game("2024-01-15", &["A"], &["B"], 1, 0)).unwrap_err();
        assert!(matches!(err, LedgerError::Storage(_)));
        assert!(err.to_string().contains("disk full"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_appends() {
        let ledger = MatchLedger::in_memory();
        ledger.append(game("2024-01-15", &["A"], &["B"], 1, 0)).unwrap();

        let before = ledger.snapshot();
        ledger.append(game("2024-01-22", &["A"], &["B"], 2, 0)).unwrap();

        assert_eq!(before.len(), 1);
        assert_eq!(ledger.snapshot().len(), 2);
    }

    #[test]
    fn test_concurrent_appends_are_linearized() {
        let ledger = Arc::new(MatchLedger::in_memory());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for i in 0..25 {
                        ledger
                            .append(game("2024-01-15", &[format!("T{}", t).as_str()], &["B"], i, 0))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let games = ledger.list(&GameFilter::default());
        assert_eq!(games.len(), 200);
        for (i, g) in games.iter().enumerate() {
            assert_eq!(g.id, GameId(i as u64 + 1));
        }
    }

    #[test]
    fn test_reopen_replays_existing_games() {
        let mut store = MemoryLedgerStore::new();
        store.append(&game("2024-01-15", &["A"], &["B"], 3, 2), Utc::now()).unwrap();
        store.append(&game("2024-01-22", &["A"], &["C"], 0, 1), Utc::now()).unwrap();

        let ledger = MatchLedger::new(store).unwrap();
        assert_eq!(ledger.len(), 2);

        let id = ledger.append(game("2024-01-29", &["A"], &["B"], 1, 1)).unwrap();
        assert_eq!(id, GameId(3));
        assert_eq!(ledger.get(GameId(2)).unwrap().game.date, "2024-01-22");
    }

    #[test]
    fn test_filter_by_player_and_dates() {
        let ledger = MatchLedger::in_memory();
        ledger.append(game("2024-01-01", &["Dylan"], &["Matt"], 1, 0)).unwrap();
        ledger.append(game("2024-02-01", &["Will"], &["Matt"], 1, 0)).unwrap();
        ledger.append(game("2024-03-01", &["Dom"], &["Dylan"], 1, 0)).unwrap();

        assert_eq!(ledger.list(&GameFilter::for_player("Dylan")).len(), 2);
        assert_eq!(ledger.list(&GameFilter::for_player("Nobody")).len(), 0);

        let february_on = GameFilter {
            since: Some("2024-02-01".to_string()),
            ..GameFilter::default()
        };
        assert_eq!(ledger.list(&february_on).len(), 2);

        let window = GameFilter {
            player: Some("Matt".to_string()),
            since: Some("2024-01-15".to_string()),
            until: Some("2024-02-28".to_string()),
        };
        let games = ledger.list(&window);
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].id, GameId(2));
    }

    #[test]
    fn test_winner_and_side() {
        let g = game("2024-01-15", &["A"], &["B"], 3, 2);
        assert_eq!(g.winner(), Some(Side::Red));
        assert_eq!(g.side_of("B"), Some(Side::Yellow));
        assert_eq!(g.side_of("C"), None);
        assert_eq!(game("2024-01-15", &["A"], &["B"], 2, 2).winner(), None);
    }

    #[test]
    fn test_recorded_game_serializes_flat() {
        let ledger = MatchLedger::in_memory();
        let id = ledger.append(game("2024-01-15", &["Player1"], &["Player2"], 3, 2)).unwrap();

        let json = serde_json::to_value(ledger.get(id).unwrap()).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["date"], "2024-01-15");
        assert_eq!(json["score"]["red_score"], 3);
        assert_eq!(json["red_team"]["players"][0]["name"], "Player1");
        assert!(json["recorded_at"].is_string());
    }

    #[test]
    fn test_missing_date_defaults_to_today() {
        let json = r#"{
            "red_team": {"players": [{"name": "A", "attributes": {"attacking": 5, "defending": 5, "goalkeeping": 5, "energy": 5}}]},
            "yellow_team": {"players": [{"name": "B", "attributes": {"attacking": 5, "defending": 5, "goalkeeping": 5, "energy": 5}}]},
            "score": {"red_score": 1, "yellow_score": 0}
        }"#;
        let game: Game = serde_json::from_str(json).unwrap();
        assert_eq!(game.date, Utc::now().format("%Y-%m-%d").to_string());
        assert_eq!(game.red_team.name, "");
    }
}
