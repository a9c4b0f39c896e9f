// ⚖️ Team Balancing Engine - exhaustive search over every 5v5 / 6v6 split
// Pure function of its input: no stored state, safe to call from any thread

use crate::error::BalanceError;
use crate::player::Player;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

pub const RED_TEAM: &str = "Red";
pub const YELLOW_TEAM: &str = "Yellows";

/// Pool sizes the engine accepts
pub const POOL_SIZES: [usize; 2] = [10, 12];

const MAX_POOL: usize = 12;

/// attacking, defending, goalkeeping, energy, total rating
type Profile = [i32; 5];

// ============================================================================
// WEIGHTS
// ============================================================================

/// Weight of each per-attribute difference in the badness score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceWeights {
    pub attacking: f64,
    pub defending: f64,
    pub goalkeeping: f64,
    pub energy: f64,

    /// Weight of the difference in summed ratings
    pub total: f64,
}

impl Default for BalanceWeights {
    fn default() -> Self {
        // Goalkeeping imbalance shows up most in results
        BalanceWeights {
            attacking: 1.0,
            defending: 1.0,
            goalkeeping: 2.0,
            energy: 1.0,
            total: 1.0,
        }
    }
}

impl BalanceWeights {
    fn as_array(&self) -> [f64; 5] {
        [
            self.attacking,
            self.defending,
            self.goalkeeping,
            self.energy,
            self.total,
        ]
    }

    /// Every weight must be finite and non-negative
    pub fn validate(&self) -> Result<(), String> {
        let names = ["attacking", "defending", "goalkeeping", "energy", "total"];
        for (name, weight) in names.iter().zip(self.as_array()) {
            if !weight.is_finite() || weight < 0.0 {
                return Err(format!(
                    "weight '{}' must be a finite non-negative number, got {}",
                    name, weight
                ));
            }
        }
        Ok(())
    }

    fn score(&self, diff: &Profile) -> f64 {
        self.as_array()
            .iter()
            .zip(diff)
            .map(|(w, d)| w * f64::from(*d))
            .sum()
    }
}

// ============================================================================
// TEAMS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    #[serde(default)]
    pub name: String,
    pub players: Vec<Player>,
}

impl Team {
    pub fn new(name: impl Into<String>, players: Vec<Player>) -> Self {
        Team {
            name: name.into(),
            players,
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.players.iter().any(|p| p.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.players.iter().map(|p| p.name.as_str()).collect()
    }

    fn totals(&self) -> Profile {
        let mut totals = [0; 5];
        for player in &self.players {
            add_profile(&mut totals, &profile(player));
        }
        totals
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceResult {
    pub red_team: Team,
    pub yellow_team: Team,
}

fn profile(player: &Player) -> Profile {
    let [a, d, g, e] = player.attributes.as_array().map(i32::from);
    [a, d, g, e, a + d + g + e]
}

fn add_profile(acc: &mut Profile, p: &Profile) {
    for (slot, value) in acc.iter_mut().zip(p) {
        *slot += value;
    }
}

fn abs_diff(a: &Profile, b: &Profile) -> Profile {
    let mut diff = [0; 5];
    for (k, slot) in diff.iter_mut().enumerate() {
        *slot = (a[k] - b[k]).abs();
    }
    diff
}

// ============================================================================
// BALANCER
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct TeamBalancer {
    weights: BalanceWeights,
}

impl TeamBalancer {
    /// Balancer with the default weights
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: BalanceWeights) -> Self {
        TeamBalancer { weights }
    }

    pub fn weights(&self) -> &BalanceWeights {
        &self.weights
    }

    /// Badness score of an arbitrary split (lower is better)
    pub fn badness(&self, red: &Team, yellow: &Team) -> f64 {
        self.weights.score(&abs_diff(&red.totals(), &yellow.totals()))
    }

    /// Split a pool of 10 or 12 available players into the globally best
    /// pair of teams.
    ///
    /// Players are ordered by name and player `i` maps to bit `n - 1 - i`, so
    /// walking masks from the top down visits red-team combinations in
    /// lexicographic order. Only masks holding player 0 are scored (the
    /// complement is the same split), and a candidate replaces the best one
    /// only when strictly better, so ties go to the first combination.
    pub fn balance(&self, players: &[Player]) -> Result<BalanceResult, BalanceError> {
        self.validate_pool(players)?;

        let n = players.len();
        let mut sorted: Vec<&Player> = players.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));

        let mut profiles = [[0; 5]; MAX_POOL];
        let mut grand = [0; 5];
        for (slot, player) in profiles.iter_mut().zip(&sorted) {
            *slot = profile(player);
            add_profile(&mut grand, slot);
        }
        let profiles = &profiles[..n];

        let half = (n / 2) as u32;
        let lead = 1u32 << (n - 1);
        let mut best: Option<(u32, f64)> = None;
        let mut candidates = 0usize;

        for mask in (lead..(1u32 << n)).rev() {
            if mask.count_ones() != half {
                continue;
            }
            candidates += 1;

            let score = self.score_mask(profiles, &grand, mask);
            if best.map_or(true, |(_, best_score)| score < best_score) {
                best = Some((mask, score));
            }
        }

        let Some((mask, score)) = best else {
            return Err(BalanceError::InvalidPoolSize(n));
        };
        debug!(candidates, badness = score, "partition search complete");

        let mut red = Vec::with_capacity(n / 2);
        let mut yellow = Vec::with_capacity(n / 2);
        for (i, player) in sorted.into_iter().enumerate() {
            if mask & (1 << (n - 1 - i)) != 0 {
                red.push(player.clone());
            } else {
                yellow.push(player.clone());
            }
        }

        info!(pool = n, badness = score, "balanced teams");

        Ok(BalanceResult {
            red_team: Team::new(RED_TEAM, red),
            yellow_team: Team::new(YELLOW_TEAM, yellow),
        })
    }

    fn validate_pool(&self, players: &[Player]) -> Result<(), BalanceError> {
        if !POOL_SIZES.contains(&players.len()) {
            warn!(pool = players.len(), "rejected pool size");
            return Err(BalanceError::InvalidPoolSize(players.len()));
        }

        for player in players {
            player.validate()?;
        }

        let mut seen = HashSet::with_capacity(players.len());
        for player in players {
            if !seen.insert(player.name.as_str()) {
                return Err(BalanceError::DuplicatePlayer(player.name.clone()));
            }
        }

        if let Some(player) = players.iter().find(|p| !p.available) {
            return Err(BalanceError::UnavailablePlayer(player.name.clone()));
        }

        Ok(())
    }

    fn score_mask(&self, profiles: &[Profile], grand: &Profile, mask: u32) -> f64 {
        let n = profiles.len();
        let mut red = [0; 5];
        for (i, p) in profiles.iter().enumerate() {
            if mask & (1 << (n - 1 - i)) != 0 {
                add_profile(&mut red, p);
            }
        }

        let mut yellow = *grand;
        for (slot, r) in yellow.iter_mut().zip(&red) {
            *slot -= r;
        }

        self.weights.score(&abs_diff(&red, &yellow))
    }
}

// ============================================================================
// TESTS
// ============================================================================
