//! Team identity and alliance rules.
//!
//! A [`Team`] is a small `Copy` value: an identifier plus a bitmask of the
//! team ids it is allied with. Team `0` is neutral. Neutral entities are
//! never enemies and never allies of anyone but themselves, which is what
//! lets debris and asteroids sit outside every faction's target lists.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest team id that can appear in an alliance mask.
pub const MAX_TEAM_ID: u8 = 31;

/// Team membership with alliance rules.
///
/// # Example
///
/// ```
/// use driftfire_core::team::Team;
///
/// let player = Team::new(1).with_ally(3);
/// let pirates = Team::new(2);
/// let traders = Team::new(3);
///
/// assert!(player.is_enemy_of(pirates));
/// assert!(!player.is_enemy_of(traders));
/// assert!(!Team::NEUTRAL.is_enemy_of(player));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Team {
    id: u8,
    #[serde(default)]
    allies: u32,
}

impl Team {
    /// The neutral team.
    pub const NEUTRAL: Self = Self { id: 0, allies: 0 };

    /// Creates a team with no allies.
    ///
    /// Ids above [`MAX_TEAM_ID`] are accepted but cannot be named as allies.
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self { id, allies: 0 }
    }

    /// Returns a copy of this team that treats `other` as an ally.
    #[must_use]
    pub const fn with_ally(mut self, other: u8) -> Self {
        if other <= MAX_TEAM_ID {
            self.allies |= 1_u32 << (other as u32);
        }
        self
    }

    /// Returns the raw team id.
    #[must_use]
    pub const fn id(self) -> u8 {
        self.id
    }

    /// Returns `true` for the neutral team.
    #[must_use]
    pub const fn is_neutral(self) -> bool {
        self.id == 0
    }

    const fn lists_ally(self, other: u8) -> bool {
        other <= MAX_TEAM_ID && self.allies & (1_u32 << (other as u32)) != 0
    }

    /// Returns `true` if both teams fight on the same side.
    ///
    /// Alliance is symmetric: it holds if either side lists the other.
    #[must_use]
    pub const fn is_allied_with(self, other: Self) -> bool {
        if self.id == other.id {
            return true;
        }
        if self.is_neutral() || other.is_neutral() {
            return false;
        }
        self.lists_ally(other.id) || other.lists_ally(self.id)
    }

    /// Returns `true` if the two teams are hostile to each other.
    #[must_use]
    pub const fn is_enemy_of(self, other: Self) -> bool {
        !self.is_neutral() && !other.is_neutral() && !self.is_allied_with(other)
    }
}

/// Relation used to filter entities by team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamRelation {
    /// Same side (see [`Team::is_allied_with`]).
    Allies,
    /// Opposing side (see [`Team::is_enemy_of`]).
    Enemies,
}

impl TeamRelation {
    /// Returns `true` if `other` stands in this relation to `own`.
    #[must_use]
    pub const fn holds(self, own: Team, other: Team) -> bool {
        match self {
            Self::Allies => own.is_allied_with(other),
            Self::Enemies => own.is_enemy_of(other),
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_neutral() {
            write!(f, "neutral")
        } else {
            write!(f, "team-{}", self.id)
        }
    }
}
