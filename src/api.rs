// 🌐 REST API - the contract the React/Next front-ends call
// Every error body is {"detail": "..."}, which the UI reads as
// `e.response.data.detail`

use crate::balance::{BalanceResult, TeamBalancer};
use crate::config::Config;
use crate::db::{self, SqliteLedgerStore};
use crate::error::{BalanceError, LedgerError, StoreError};
use crate::ledger::{Game, GameFilter, MatchLedger, RecordedGame};
use crate::player::Player;
use crate::stats::{self, LeaderboardEntry, PartnerStats, PlayerStats};
use anyhow::Context;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
    ledger: Arc<MatchLedger>,
    balancer: Arc<TeamBalancer>,
}

impl AppState {
    pub fn new(conn: Connection, ledger: MatchLedger, balancer: TeamBalancer) -> Self {
        AppState {
            db: Arc::new(Mutex::new(conn)),
            ledger: Arc::new(ledger),
            balancer: Arc::new(balancer),
        }
    }

    /// Open the configured database for both the player pool and the ledger
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let conn = db::open_database(&config.database_path)?;
        if config.seed_default_players {
            db::seed_default_players(&conn).context("Failed to seed default players")?;
        }

        let ledger = MatchLedger::new(SqliteLedgerStore::open(&config.database_path)?)?;
        info!(path = ?config.database_path, games = ledger.len(), "state opened");

        Ok(Self::new(conn, ledger, TeamBalancer::with_weights(config.weights)))
    }

    /// Throwaway state with an empty pool and ledger
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        db::setup_database(&conn)?;
        Ok(Self::new(conn, MatchLedger::in_memory(), TeamBalancer::new()))
    }

    fn db(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".to_string()))
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unprocessable(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(d) => (StatusCode::BAD_REQUEST, d),
            ApiError::NotFound(d) => (StatusCode::NOT_FOUND, d),
            ApiError::Conflict(d) => (StatusCode::CONFLICT, d),
            ApiError::Unprocessable(d) => (StatusCode::UNPROCESSABLE_ENTITY, d),
            ApiError::Internal(d) => {
                error!(detail = %d, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, d)
            }
        };

        (status, Json(ErrorBody { detail })).into_response()
    }
}

impl From<BalanceError> for ApiError {
    fn from(e: BalanceError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Storage(_) => ApiError::Internal(e.to_string()),
            _ => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::PlayerExists(_) => ApiError::Conflict(e.to_string()),
            StoreError::PlayerNotFound(_) => ApiError::NotFound(e.to_string()),
            StoreError::InvalidPlayer(_) => ApiError::Unprocessable(e.to_string()),
            StoreError::Database(_) | StoreError::Serialization(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Unprocessable(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct BalanceTeamsRequest {
    pub players: Vec<Player>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlayerQuery {
    pub available: Option<bool>,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    players: i64,
    games: usize,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET / - Service banner
async fn root() -> impl IntoResponse {
    Json(MessageResponse {
        message: "Football Team Selector API",
    })
}

/// GET /health - Health check
async fn health_check(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let players = db::count_players(&*state.db()?)?;

    Ok(Json(HealthResponse {
        status: "ok",
        players,
        games: state.ledger.len(),
    }))
}

/// GET /players/ - All players, optionally only the available ones
async fn list_players(
    State(state): State<AppState>,
    query: Result<Query<PlayerQuery>, QueryRejection>,
) -> Result<Json<Vec<Player>>, ApiError> {
    let Query(query) = query?;
    let conn = state.db()?;
    let players = match query.available {
        Some(true) => db::get_available_players(&conn)?,
        Some(false) => db::get_all_players(&conn)?
            .into_iter()
            .filter(|p| !p.available)
            .collect(),
        None => db::get_all_players(&conn)?,
    };

    Ok(Json(players))
}

/// POST /players/ - Create a player (available defaults to true)
async fn create_player(
    State(state): State<AppState>,
    payload: Result<Json<Player>, JsonRejection>,
) -> Result<(StatusCode, Json<Player>), ApiError> {
    let Json(player) = payload?;
    db::insert_player(&*state.db()?, &player)?;
    info!(player = %player.name, "player created");

    Ok((StatusCode::CREATED, Json(player)))
}

/// PUT /players/:name - Update an existing player
async fn update_player(
    State(state): State<AppState>,
    name: Result<Path<String>, PathRejection>,
    payload: Result<Json<Player>, JsonRejection>,
) -> Result<Json<Player>, ApiError> {
    let Path(name) = name?;
    let Json(player) = payload?;
    if player.name != name {
        return Err(ApiError::BadRequest(
            "Player name in URL must match player data".to_string(),
        ));
    }

    db::update_player(&*state.db()?, &player)?;
    Ok(Json(player))
}

/// GET /players/:name/stats - Win/loss record from the ledger
async fn player_stats(
    State(state): State<AppState>,
    name: Result<Path<String>, PathRejection>,
) -> Result<Json<PlayerStats>, ApiError> {
    let Path(name) = name?;
    Ok(Json(state.ledger.stats_for(&name)))
}

/// GET /players/:name/partners - Record alongside each teammate
async fn player_partners(
    State(state): State<AppState>,
    name: Result<Path<String>, PathRejection>,
) -> Result<Json<Vec<PartnerStats>>, ApiError> {
    let Path(name) = name?;
    let snapshot = state.ledger.snapshot();
    Ok(Json(stats::partnerships(snapshot.iter().map(|g| &g.game), &name)))
}

/// POST /teams/balance - Split the submitted pool into Red and Yellows
async fn balance_teams(
    State(state): State<AppState>,
    payload: Result<Json<BalanceTeamsRequest>, JsonRejection>,
) -> Result<Json<BalanceResult>, ApiError> {
    let Json(request) = payload?;
    let result = state.balancer.balance(&request.players)?;

    Ok(Json(result))
}

/// GET /games/ - Game history in the order it was recorded
async fn list_games(
    State(state): State<AppState>,
    filter: Result<Query<GameFilter>, QueryRejection>,
) -> Result<Json<Vec<RecordedGame>>, ApiError> {
    let Query(filter) = filter?;
    Ok(Json(state.ledger.list(&filter)))
}

/// POST /games/ - Append a finished game
async fn record_game(
    State(state): State<AppState>,
    payload: Result<Json<Game>, JsonRejection>,
) -> Result<(StatusCode, Json<RecordedGame>), ApiError> {
    let Json(game) = payload?;
    let id = state.ledger.append(game)?;

    let recorded = state
        .ledger
        .get(id)
        .ok_or_else(|| ApiError::Internal(format!("game {} missing after append", id)))?;

    Ok((StatusCode::CREATED, Json(recorded)))
}

/// GET /stats/ - Every player in the ledger, best record first
async fn leaderboard(State(state): State<AppState>) -> Json<Vec<LeaderboardEntry>> {
    let snapshot = state.ledger.snapshot();
    Json(stats::leaderboard(snapshot.iter().map(|g| &g.game)))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/players", get(list_players).post(create_player))
        .route("/players/", get(list_players).post(create_player))
        .route("/players/:name", put(update_player))
        .route("/players/:name/stats", get(player_stats))
        .route("/players/:name/partners", get(player_partners))
        .route("/teams/balance", post(balance_teams))
        .route("/games", get(list_games).post(record_game))
        .route("/games/", get(list_games).post(record_game))
        .route("/stats", get(leaderboard))
        .route("/stats/", get(leaderboard))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Tests
// ============================================================================
