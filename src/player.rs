// 🧍 Player model - the snapshot every component passes around
// Name is the identity; attributes are values captured at balance/record time

use crate::error::PlayerError;
use serde::{Deserialize, Serialize};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 10;

/// The four skill ratings, each in [1, 10]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerAttributes {
    pub attacking: u8,
    pub defending: u8,
    pub goalkeeping: u8,
    pub energy: u8,
}

impl PlayerAttributes {
    pub fn new(attacking: u8, defending: u8, goalkeeping: u8, energy: u8) -> Self {
        PlayerAttributes {
            attacking,
            defending,
            goalkeeping,
            energy,
        }
    }

    /// Same rating for every attribute
    pub fn uniform(value: u8) -> Self {
        Self::new(value, value, value, value)
    }

    /// Ratings in a fixed order: attacking, defending, goalkeeping, energy
    pub fn as_array(&self) -> [u8; 4] {
        [self.attacking, self.defending, self.goalkeeping, self.energy]
    }

    /// Scalar rating (4..=40)
    pub fn total(&self) -> u32 {
        self.as_array().iter().map(|&v| v as u32).sum()
    }

    fn named(&self) -> [(&'static str, u8); 4] {
        [
            ("attacking", self.attacking),
            ("defending", self.defending),
            ("goalkeeping", self.goalkeeping),
            ("energy", self.energy),
        ]
    }
}

fn default_available() -> bool {
    true
}

/// A player record, or an immutable snapshot of one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub attributes: PlayerAttributes,

    /// Eligible for selection into a balancing request
    #[serde(default = "default_available")]
    pub available: bool,
}

impl Player {
    pub fn new(name: impl Into<String>, attributes: PlayerAttributes) -> Self {
        Player {
            name: name.into(),
            attributes,
            available: true,
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn rating(&self) -> u32 {
        self.attributes.total()
    }

    /// Reject empty names and out-of-range ratings; values are never clamped
    pub fn validate(&self) -> Result<(), PlayerError> {
        if self.name.trim().is_empty() {
            return Err(PlayerError::EmptyName);
        }

        for (attribute, value) in self.attributes.named() {
            if !(MIN_RATING..=MAX_RATING).contains(&value) {
                return Err(PlayerError::AttributeOutOfRange {
                    player: self.name.clone(),
                    attribute,
                    value,
                });
            }
        }

        Ok(())
    }
}
