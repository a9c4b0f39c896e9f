// Team Picker - Web Server
// REST API consumed by the React/Next front-ends

use anyhow::{Context, Result};
use team_picker::api::{router, AppState};
use team_picker::{logging, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init("info");

    let config = Config::load()?;
    let state = AppState::open(&config)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, db = ?config.database_path, "⚽ Football Team Selector API running");

    axum::serve(listener, app)
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}
