use crate::error::StoreError;
use crate::ledger::{Game, GameId, GameScore, LedgerStore, RecordedGame};
use crate::player::{Player, PlayerAttributes};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Roster the original club started with: (name, [attacking, defending, goalkeeping, energy])
pub const DEFAULT_PLAYERS: [(&str, [u8; 4]); 23] = [
    ("Dermot", [4, 8, 6, 8]),
    ("Tom", [3, 7, 4, 7]),
    ("Connor", [5, 9, 6, 7]),
    ("Rodney", [5, 7, 7, 8]),
    ("Danny G", [8, 7, 6, 6]),
    ("Jamie Sully", [9, 4, 4, 7]),
    ("Glenn", [7, 7, 6, 8]),
    ("Joseph Smash", [7, 7, 6, 5]),
    ("David", [7, 5, 4, 5]),
    ("Zenon", [6, 6, 6, 7]),
    ("Dylan", [9, 9, 7, 9]),
    ("Matt", [9, 9, 7, 9]),
    ("Will", [8, 8, 9, 6]),
    ("Dom", [9, 8, 7, 8]),
    ("Liam", [10, 6, 4, 7]),
    ("Mikael", [5, 8, 8, 8]),
    ("Callum", [7, 6, 7, 7]),
    ("Adulai", [9, 7, 6, 8]),
    ("Ringer1", [5, 5, 5, 5]),
    ("Ringer2", [5, 5, 5, 5]),
    ("Ringer3", [5, 5, 5, 5]),
    ("Ringer4", [5, 5, 5, 5]),
    ("Ringer5", [5, 5, 5, 5]),
];

pub fn setup_database(conn: &Connection) -> rusqlite::Result<()> {
    // Enable WAL mode for crash recovery (in-memory databases answer "memory")
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;

    // ==========================================================================
    // Players Table (the player pool, keyed by name)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS players (
            name TEXT PRIMARY KEY,
            attacking INTEGER NOT NULL,
            defending INTEGER NOT NULL,
            goalkeeping INTEGER NOT NULL,
            energy INTEGER NOT NULL,
            available BOOLEAN DEFAULT 1
        )",
        [],
    )?;

    // ==========================================================================
    // Games Table (append-only ledger; teams stored as JSON snapshots)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS games (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            red_team TEXT NOT NULL,
            yellow_team TEXT NOT NULL,
            red_score INTEGER NOT NULL,
            yellow_score INTEGER NOT NULL,
            recorded_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute("CREATE INDEX IF NOT EXISTS idx_games_date ON games(date)", [])?;

    Ok(())
}

/// Open (or create) the database file and make sure the tables exist
pub fn open_database(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database: {:?}", db_path))?;
    setup_database(&conn).context("Failed to set up database")?;
    Ok(conn)
}

// ============================================================================
// PLAYER POOL
// ============================================================================

fn row_to_player(row: &Row<'_>) -> rusqlite::Result<Player> {
    // Rows written before the column existed have NULL availability
    let available: Option<bool> = row.get(5)?;

    Ok(Player {
        name: row.get(0)?,
        attributes: PlayerAttributes {
            attacking: row.get(1)?,
            defending: row.get(2)?,
            goalkeeping: row.get(3)?,
            energy: row.get(4)?,
        },
        available: available.unwrap_or(true),
    })
}

/// Insert a new player; the name must not be taken
pub fn insert_player(conn: &Connection, player: &Player) -> Result<(), StoreError> {
    player.validate()?;

    let result = conn.execute(
        "INSERT INTO players (name, attacking, defending, goalkeeping, energy, available)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            player.name,
            player.attributes.attacking,
            player.attributes.defending,
            player.attributes.goalkeeping,
            player.attributes.energy,
            player.available,
        ],
    );

    match result {
        Ok(_) => {
            debug!(player = %player.name, "player created");
            Ok(())
        }
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(StoreError::PlayerExists(player.name.clone()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Insert or replace by name
pub fn upsert_player(conn: &Connection, player: &Player) -> Result<(), StoreError> {
    player.validate()?;

    conn.execute(
        "INSERT OR REPLACE INTO players (name, attacking, defending, goalkeeping, energy, available)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            player.name,
            player.attributes.attacking,
            player.attributes.defending,
            player.attributes.goalkeeping,
            player.attributes.energy,
            player.available,
        ],
    )?;

    Ok(())
}

/// Overwrite an existing player's attributes and availability
pub fn update_player(conn: &Connection, player: &Player) -> Result<(), StoreError> {
    player.validate()?;

    let changed = conn.execute(
        "UPDATE players
         SET attacking = ?2, defending = ?3, goalkeeping = ?4, energy = ?5, available = ?6
         WHERE name = ?1",
        params![
            player.name,
            player.attributes.attacking,
            player.attributes.defending,
            player.attributes.goalkeeping,
            player.attributes.energy,
            player.available,
        ],
    )?;

    if changed == 0 {
        return Err(StoreError::PlayerNotFound(player.name.clone()));
    }

    debug!(player = %player.name, "player updated");
    Ok(())
}

pub fn get_player(conn: &Connection, name: &str) -> Result<Option<Player>, StoreError> {
    let player = conn
        .query_row(
            "SELECT name, attacking, defending, goalkeeping, energy, available
             FROM players WHERE name = ?1",
            [name],
            row_to_player,
        )
        .optional()?;

    Ok(player)
}

pub fn get_all_players(conn: &Connection) -> Result<Vec<Player>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name, attacking, defending, goalkeeping, energy, available
         FROM players
         ORDER BY name",
    )?;

    let players = stmt
        .query_map([], row_to_player)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(players)
}

pub fn get_available_players(conn: &Connection) -> Result<Vec<Player>, StoreError> {
    Ok(get_all_players(conn)?
        .into_iter()
        .filter(|p| p.available)
        .collect())
}

pub fn count_players(conn: &Connection) -> Result<i64, StoreError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))?;

    Ok(count)
}

/// Insert the default roster, but only into an empty table
pub fn seed_default_players(conn: &Connection) -> Result<usize, StoreError> {
    let existing = count_players(conn)?;
    if existing > 0 {
        info!(existing, "player pool already populated, skipping seed");
        return Ok(0);
    }

    let tx = conn.unchecked_transaction()?;
    for (name, [a, d, g, e]) in DEFAULT_PLAYERS {
        insert_player(&tx, &Player::new(name, PlayerAttributes::new(a, d, g, e)))?;
    }
    tx.commit()?;

    info!(players = DEFAULT_PLAYERS.len(), "seeded default players");
    Ok(DEFAULT_PLAYERS.len())
}

// ============================================================================
// CSV IMPORT
// ============================================================================

#[derive(Debug, Deserialize)]
struct PlayerRow {
    name: String,
    attacking: u8,
    defending: u8,
    goalkeeping: u8,
    energy: u8,
    #[serde(default)]
    available: Option<bool>,
}

/// Parse players from CSV with a header row:
/// `name,attacking,defending,goalkeeping,energy[,available]`
pub fn read_players_csv<R: Read>(reader: R) -> Result<Vec<Player>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut players = Vec::new();

    for (index, result) in rdr.deserialize().enumerate() {
        let line = index + 2;
        let row: PlayerRow =
            result.with_context(|| format!("Failed to deserialize player on line {}", line))?;

        let player = Player {
            name: row.name.trim().to_string(),
            attributes: PlayerAttributes::new(row.attacking, row.defending, row.goalkeeping, row.energy),
            available: row.available.unwrap_or(true),
        };
        player
            .validate()
            .with_context(|| format!("Invalid player on line {}", line))?;

        players.push(player);
    }

    Ok(players)
}

pub fn load_players_csv(csv_path: &Path) -> Result<Vec<Player>> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file: {:?}", csv_path))?;
    read_players_csv(file)
}

/// Upsert every player in one transaction; returns how many rows were written.
/// Nothing is written if any player is rejected.
pub fn import_players(conn: &Connection, players: &[Player]) -> Result<usize, StoreError> {
    let tx = conn.unchecked_transaction()?;
    for player in players {
        upsert_player(&tx, player)?;
    }
    tx.commit()?;
    Ok(players.len())
}

// ============================================================================
// LEDGER BACKEND
// ============================================================================

/// SQLite storage for the match ledger. Rows are read back by id, which is
/// append order.
pub struct SqliteLedgerStore {
    conn: Connection,
}

impl SqliteLedgerStore {
    pub fn new(conn: Connection) -> Result<Self> {
        setup_database(&conn).context("Failed to prepare games table")?;
        Ok(SqliteLedgerStore { conn })
    }

    pub fn open(db_path: &Path) -> Result<Self> {
        Ok(SqliteLedgerStore {
            conn: open_database(db_path)?,
        })
    }
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

impl LedgerStore for SqliteLedgerStore {
    fn append(&mut self, game: &Game, recorded_at: DateTime<Utc>) -> Result<GameId> {
        let red_team = serde_json::to_string(&game.red_team)?;
        let yellow_team = serde_json::to_string(&game.yellow_team)?;

        self.conn
            .execute(
                "INSERT INTO games (date, red_team, yellow_team, red_score, yellow_score, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    game.date,
                    red_team,
                    yellow_team,
                    game.score.red_score,
                    game.score.yellow_score,
                    recorded_at.to_rfc3339(),
                ],
            )
            .context("Failed to insert game")?;

        Ok(GameId(self.conn.last_insert_rowid() as u64))
    }

    fn load_all(&self) -> Result<Vec<RecordedGame>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, red_team, yellow_team, red_score, yellow_score, recorded_at
             FROM games
             ORDER BY id",
        )?;

        let games = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let recorded_at_str: String = row.get(6)?;
                let recorded_at = DateTime::parse_from_rfc3339(&recorded_at_str)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?
                    .with_timezone(&Utc);

                Ok(RecordedGame {
                    id: GameId(id as u64),
                    recorded_at,
                    game: Game {
                        date: row.get(1)?,
                        red_team: json_column(row, 2)?,
                        yellow_team: json_column(row, 3)?,
                        score: GameScore::new(row.get(4)?, row.get(5)?),
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to load games")?;

        Ok(games)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::Team;
    use crate::error::PlayerError;
    use crate::ledger::{GameFilter, MatchLedger};

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn create_test_player(name: &str, a: u8, d: u8, g: u8, e: u8) -> Player {
        Player::new(name, PlayerAttributes::new(a, d, g, e))
    }

    fn create_test_game(date: &str, red: &str, yellow: &str, red_score: i64, yellow_score: i64) -> Game {
        Game::new(
            date,
            Team::new("Red", vec![create_test_player(red, 7, 6, 3, 8)]),
            Team::new("Yellows", vec![create_test_player(yellow, 6, 7, 4, 7)]),
            GameScore::new(red_score, yellow_score),
        )
    }

    #[test]
    fn test_save_and_load_player() {
        let conn = test_db();
        let player = create_test_player("Test Player", 7, 6, 3, 8);

        insert_player(&conn, &player).unwrap();
        let loaded = get_player(&conn, "Test Player").unwrap().unwrap();

        assert_eq!(loaded, player);
        assert!(get_player(&conn, "Missing").unwrap().is_none());
    }

    #[test]
    fn test_insert_rejects_existing_name() {
        let conn = test_db();
        insert_player(&conn, &create_test_player("Tom", 3, 7, 4, 7)).unwrap();

        let err = insert_player(&conn, &create_test_player("Tom", 9, 9, 9, 9)).unwrap_err();
        assert!(matches!(err, StoreError::PlayerExists(name) if name == "Tom"));
        assert_eq!(get_player(&conn, "Tom").unwrap().unwrap().attributes.attacking, 3);
    }

    #[test]
    fn test_insert_rejects_invalid_player() {
        let conn = test_db();

        let err = insert_player(&conn, &create_test_player("Liam", 11, 6, 4, 7)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidPlayer(PlayerError::AttributeOutOfRange { .. })
        ));
        assert_eq!(count_players(&conn).unwrap(), 0);
    }

    #[test]
    fn test_update_player() {
        let conn = test_db();
        insert_player(&conn, &create_test_player("Test Player", 7, 6, 3, 8)).unwrap();

        let updated = create_test_player("Test Player", 8, 7, 4, 9).unavailable();
        update_player(&conn, &updated).unwrap();

        let loaded = get_player(&conn, "Test Player").unwrap().unwrap();
        assert_eq!(loaded.attributes.attacking, 8);
        assert_eq!(loaded.attributes.defending, 7);
        assert!(!loaded.available);
    }

    #[test]
    fn test_update_missing_player() {
        let conn = test_db();

        let err = update_player(&conn, &create_test_player("Ghost", 5, 5, 5, 5)).unwrap_err();
        assert!(matches!(err, StoreError::PlayerNotFound(name) if name == "Ghost"));
    }

    #[test]
    fn test_get_all_and_available_players() {
        let conn = test_db();
        insert_player(&conn, &create_test_player("Player2", 6, 7, 4, 7)).unwrap();
        insert_player(&conn, &create_test_player("Player1", 7, 6, 3, 8)).unwrap();
        insert_player(&conn, &create_test_player("Player3", 5, 5, 5, 5).unavailable()).unwrap();

        let all: Vec<String> = get_all_players(&conn).unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(all, vec!["Player1", "Player2", "Player3"]);

        let available = get_available_players(&conn).unwrap();
        assert_eq!(available.len(), 2);
        assert!(available.iter().all(|p| p.available));
    }

    #[test]
    fn test_seed_is_idempotent() {
        let conn = test_db();

        assert_eq!(seed_default_players(&conn).unwrap(), 23);
        assert_eq!(seed_default_players(&conn).unwrap(), 0);
        assert_eq!(count_players(&conn).unwrap(), 23);

        let liam = get_player(&conn, "Liam").unwrap().unwrap();
        assert_eq!(liam.attributes, PlayerAttributes::new(10, 6, 4, 7));
    }

    #[test]
    fn test_import_is_all_or_nothing() {
        let conn = test_db();
        insert_player(&conn, &Player::new("Tom", PlayerAttributes::new(3, 7, 4, 7))).unwrap();

        let players = vec![
            Player::new("Tom", PlayerAttributes::new(4, 7, 4, 7)),
            Player::new("Liam", PlayerAttributes::new(10, 6, 4, 7)),
            Player::new("Bad", PlayerAttributes::new(11, 6, 4, 7)),
        ];
        let err = import_players(&conn, &players).unwrap_err();
        assert!(matches!(err, StoreError::InvalidPlayer(_)));

        assert_eq!(count_players(&conn).unwrap(), 1);
        let tom = get_player(&conn, "Tom").unwrap().unwrap();
        assert_eq!(tom.attributes.attacking, 3);

        assert_eq!(import_players(&conn, &players[..2]).unwrap(), 2);
        assert_eq!(count_players(&conn).unwrap(), 2);
        assert_eq!(get_player(&conn, "Tom").unwrap().unwrap().attributes.attacking, 4);
    }

    #[test]
    fn test_seed_rolls_back_on_failure() {
        let conn = test_db();
        // A trigger rejecting one roster name makes the seed fail partway
        conn.execute_batch(
            "CREATE TRIGGER reject_liam BEFORE INSERT ON players
             WHEN NEW.name = 'Liam'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();

        assert!(seed_default_players(&conn).is_err());
        assert_eq!(count_players(&conn).unwrap(), 0);

        conn.execute_batch("DROP TRIGGER reject_liam").unwrap();
        assert_eq!(seed_default_players(&conn).unwrap(), 23);
    }

    #[test]
    fn test_read_players_csv() {
        let data = "name,attacking,defending,goalkeeping,energy,available\n\
                    Dermot,4,8,6,8,true\n\
                    Tom,3,7,4,7,false\n\
                    Connor,5,9,6,7,\n";

        let players = read_players_csv(data.as_bytes()).unwrap();
        assert_eq!(players.len(), 3);
        assert!(players[0].available);
        assert!(!players[1].available);
        assert!(players[2].available);

        let conn = test_db();
        assert_eq!(import_players(&conn, &players).unwrap(), 3);
        assert_eq!(count_players(&conn).unwrap(), 3);
    }

    #[test]
    fn test_read_players_csv_rejects_out_of_range() {
        let data = "name,attacking,defending,goalkeeping,energy\n\
                    Dermot,4,8,6,8\n\
                    Tom,3,12,4,7\n";

        let err = read_players_csv(data.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 3"));
    }

    #[test]
    fn test_ledger_store_round_trip_in_append_order() {
        let store = SqliteLedgerStore::new(Connection::open_in_memory().unwrap()).unwrap();
        let ledger = MatchLedger::new(store).unwrap();

        ledger.append(create_test_game("2024-02-01", "Player1", "Player2", 3, 2)).unwrap();
        ledger.append(create_test_game("2024-01-15", "Player2", "Player1", 0, 0)).unwrap();

        let games = ledger.list(&GameFilter::default());
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].id, GameId(1));
        assert_eq!(games[0].game.date, "2024-02-01");
        assert_eq!(games[1].game.date, "2024-01-15");
    }

    #[test]
    fn test_ledger_survives_reopen() {
        let path = std::env::temp_dir().join(format!(
            "team_picker_ledger_{}_{}.db",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));

        {
            let ledger = MatchLedger::new(SqliteLedgerStore::open(&path).unwrap()).unwrap();
            ledger.append(create_test_game("2024-01-15", "Player1", "Player2", 3, 2)).unwrap();
            ledger.append(create_test_game("2024-01-22", "Player1", "Player2", 1, 4)).unwrap();
        }

        let reopened = MatchLedger::new(SqliteLedgerStore::open(&path).unwrap()).unwrap();
        let games = reopened.list(&GameFilter::default());
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].game.score, GameScore::new(3, 2));
        assert_eq!(games[1].game.red_team.players[0].attributes.goalkeeping, 3);
        assert_eq!(games[1].game.red_team.name, "Red");

        let stats = reopened.stats_for("Player1");
        assert_eq!((stats.games_played, stats.wins, stats.losses), (2, 1, 1));

        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }
}
