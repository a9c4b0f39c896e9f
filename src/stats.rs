// 📊 Statistics Aggregator - read-side projections over the match ledger
// Everything here is a pure fold over a sequence of games; nothing is stored

use crate::ledger::{Game, Side};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// ============================================================================
// PLAYER STATS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,

    /// Percentage, two decimal places
    pub win_rate: f64,
}

impl PlayerStats {
    /// Tied games count toward games_played only
    pub fn draws(&self) -> u32 {
        self.games_played - self.wins - self.losses
    }
}

/// wins / games * 100, rounded to two places after the division.
/// Zero when no games were played.
pub fn win_rate(wins: u32, games: u32) -> f64 {
    if games == 0 {
        return 0.0;
    }
    let rate = f64::from(wins) / f64::from(games) * 100.0;
    (rate * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    games: u32,
    wins: u32,
    losses: u32,
}

impl Tally {
    fn record(&mut self, side: Side, winner: Option<Side>) {
        self.games += 1;
        match winner {
            Some(w) if w == side => self.wins += 1,
            Some(_) => self.losses += 1,
            None => {}
        }
    }

    fn finish(self) -> PlayerStats {
        PlayerStats {
            games_played: self.games,
            wins: self.wins,
            losses: self.losses,
            win_rate: win_rate(self.wins, self.games),
        }
    }
}

/// Stats for one player. A name that never appears yields the zero value.
pub fn stats_for<'a, I>(games: I, name: &str) -> PlayerStats
where
    I: IntoIterator<Item = &'a Game>,
{
    let mut tally = Tally::default();
    for game in games {
        if let Some(side) = game.side_of(name) {
            tally.record(side, game.winner());
        }
    }
    tally.finish()
}

// ============================================================================
// LEADERBOARD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub stats: PlayerStats,
}

/// Stats for every name in the ledger: best win rate first, then most games,
/// then name
pub fn leaderboard<'a, I>(games: I) -> Vec<LeaderboardEntry>
where
    I: IntoIterator<Item = &'a Game>,
{
    let mut tallies: BTreeMap<&'a str, Tally> = BTreeMap::new();

    for game in games {
        let winner = game.winner();
        let mut seen = HashSet::new();
        for side in [Side::Red, Side::Yellow] {
            for player in &game.team(side).players {
                // first listing wins if a name was fielded twice
                if seen.insert(player.name.as_str()) {
                    tallies.entry(player.name.as_str()).or_default().record(side, winner);
                }
            }
        }
    }

    let mut entries: Vec<LeaderboardEntry> = tallies
        .into_iter()
        .map(|(name, tally)| LeaderboardEntry {
            name: name.to_string(),
            stats: tally.finish(),
        })
        .collect();

    entries.sort_by(|a, b| {
        b.stats
            .win_rate
            .total_cmp(&a.stats.win_rate)
            .then(b.stats.games_played.cmp(&a.stats.games_played))
            .then_with(|| a.name.cmp(&b.name))
    });
    entries
}

// ============================================================================
// PARTNERSHIPS
// ============================================================================

/// How a player fares alongside one teammate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerStats {
    pub partner: String,
    pub games_together: u32,
    pub wins_together: u32,
    pub win_rate: f64,
}

pub fn partnerships<'a, I>(games: I, name: &str) -> Vec<PartnerStats>
where
    I: IntoIterator<Item = &'a Game>,
{
    let mut together: BTreeMap<&'a str, (u32, u32)> = BTreeMap::new();

    for game in games {
        let Some(side) = game.side_of(name) else {
            continue;
        };
        let won = game.winner() == Some(side);

        let mut seen = HashSet::new();
        for teammate in &game.team(side).players {
            if teammate.name == name || !seen.insert(teammate.name.as_str()) {
                continue;
            }
            let entry = together.entry(teammate.name.as_str()).or_default();
            entry.0 += 1;
            if won {
                entry.1 += 1;
            }
        }
    }

    let mut partners: Vec<PartnerStats> = together
        .into_iter()
        .map(|(partner, (games, wins))| PartnerStats {
            partner: partner.to_string(),
            games_together: games,
            wins_together: wins,
            win_rate: win_rate(wins, games),
        })
        .collect();

    partners.sort_by(|a, b| {
        b.games_together
            .cmp(&a.games_together)
            .then_with(|| a.partner.cmp(&b.partner))
    });
    partners
}

// ============================================================================
// TESTS
// ============================================================================
