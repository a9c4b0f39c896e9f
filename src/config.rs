// ⚙️ Configuration - settings as data
// JSON file first, then environment overrides

use crate::balance::BalanceWeights;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "TEAM_PICKER_CONFIG";
pub const DATABASE_ENV: &str = "TEAM_PICKER_DB";
pub const BIND_ENV: &str = "TEAM_PICKER_ADDR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file holding players and games
    pub database_path: PathBuf,

    /// Address the HTTP server listens on
    pub bind_addr: String,

    /// Insert the default roster when the player table is empty
    pub seed_default_players: bool,

    /// Badness score weights used by the balancer
    pub weights: BalanceWeights,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from("football_teams.db"),
            bind_addr: "0.0.0.0:8000".to_string(),
            seed_default_players: true,
            weights: BalanceWeights::default(),
        }
    }
}

impl Config {
    /// Load from a JSON file; missing keys keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config = serde_json::from_str(&content).context("Failed to parse config JSON")?;
        config.validate()?;

        Ok(config)
    }

    /// Defaults, or the file named by TEAM_PICKER_CONFIG, with
    /// TEAM_PICKER_DB / TEAM_PICKER_ADDR applied on top
    pub fn load() -> Result<Self> {
        let base = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        Ok(base.with_overrides(|key| std::env::var(key).ok()))
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(DATABASE_ENV) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(addr) = lookup(BIND_ENV) {
            self.bind_addr = addr;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.weights
            .validate()
            .map_err(|e| anyhow!("Invalid balance weights: {}", e))
    }
}
