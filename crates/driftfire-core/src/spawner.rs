//! Periodic wave spawners with weighted blueprint selection.
//!
//! A [`Spawner`] only decides *what* to spawn and *where*; the
//! [`Simulation`](crate::simulation::Simulation) owns the blueprints,
//! assembles the ships and schedules the next wave through the task queue.

use std::collections::BTreeSet;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{check_finite, check_non_negative, check_positive, ConfigError};
use crate::entity::EntityId;
use crate::geometry::{random_point_in_disc, weighted_random_index};
use crate::registry::Registry;
use crate::team::Team;

/// Spawner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnerConfig {
    /// Name used in logs and errors.
    pub name: String,
    /// Seconds between waves.
    pub interval: f32,
    /// Seconds before the first wave.
    #[serde(default)]
    pub initial_delay: f32,
    /// Center of the spawn area.
    #[serde(default)]
    pub position: Vec2,
    /// Radius of the spawn area.
    #[serde(default)]
    pub spread: f32,
    /// Facing of spawned ships in degrees.
    #[serde(default)]
    pub rotation: f32,
    /// Team of spawned ships.
    #[serde(default)]
    pub team: Team,
    /// Blueprint names to choose from.
    pub options: Vec<String>,
    /// Relative weight of each option. Empty means uniform.
    #[serde(default)]
    pub probabilities: Vec<f32>,
    /// Cap on live ships from this spawner.
    #[serde(default)]
    pub max_alive: Option<usize>,
    /// Number of waves before the spawner stops. `None` runs forever.
    #[serde(default)]
    pub waves: Option<u32>,
    /// Ships per wave.
    #[serde(default = "default_wave_size")]
    pub wave_size: usize,
}

fn default_wave_size() -> usize {
    1
}

impl SpawnerConfig {
    /// Creates a spawner config choosing uniformly among `options`.
    #[must_use]
    pub fn new(name: impl Into<String>, interval: f32, options: Vec<String>) -> Self {
        Self {
            name: name.into(),
            interval,
            initial_delay: 0.0,
            position: Vec2::ZERO,
            spread: 0.0,
            rotation: 0.0,
            team: Team::NEUTRAL,
            options,
            probabilities: Vec::new(),
            max_alive: None,
            waves: None,
            wave_size: 1,
        }
    }

    /// Validates timings and reconciles the probability list with the
    /// option list.
    ///
    /// An empty probability list becomes uniform. A list of the wrong
    /// length is truncated or padded with zeros, with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error for non-finite or negative timings and for an empty
    /// option list.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        let field = |f: &str| format!("spawners.{}.{f}", self.name);
        check_positive(&field("interval"), self.interval)?;
        check_non_negative(&field("initial_delay"), self.initial_delay)?;
        check_non_negative(&field("spread"), self.spread)?;
        check_finite(&field("rotation"), self.rotation)?;
        check_finite(&field("position.x"), self.position.x)?;
        check_finite(&field("position.y"), self.position.y)?;
        if self.options.is_empty() {
            return Err(ConfigError::EmptySpawnerOptions {
                spawner: self.name.clone(),
            });
        }

        if self.probabilities.is_empty() {
            self.probabilities = vec![1.0; self.options.len()];
        } else if self.probabilities.len() != self.options.len() {
            warn!(
                spawner = %self.name,
                options = self.options.len(),
                probabilities = self.probabilities.len(),
                "probability list length mismatch, resized"
            );
            self.probabilities.resize(self.options.len(), 0.0);
        }
        for p in &mut self.probabilities {
            if !p.is_finite() || *p < 0.0 {
                warn!(spawner = %self.name, probability = *p, "invalid probability, zeroed");
                *p = 0.0;
            }
        }
        if self.probabilities.iter().all(|p| *p <= 0.0) {
            warn!(spawner = %self.name, "no option has a positive probability");
        }
        Ok(())
    }
}

/// One ship a wave asks the simulation to spawn.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnOrder {
    /// Blueprint name.
    pub blueprint: String,
    /// Spawn position.
    pub position: Vec2,
    /// Facing in degrees.
    pub rotation: f32,
    /// Team of the ship.
    pub team: Team,
}

/// Runtime state of a spawner.
///
/// # Example
///
/// ```
/// use driftfire_core::registry::Registry;
/// use driftfire_core::spawner::{Spawner, SpawnerConfig};
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha8Rng;
///
/// let mut config = SpawnerConfig::new("gate", 2.0, vec!["drone".into()]);
/// config.wave_size = 3;
/// config.validate().unwrap();
///
/// let mut spawner = Spawner::new(config);
/// let mut rng = ChaCha8Rng::seed_from_u64(7);
/// let orders = spawner.plan_wave(&mut rng, &Registry::new());
/// assert_eq!(orders.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct Spawner {
    config: SpawnerConfig,
    alive: BTreeSet<EntityId>,
    waves_spawned: u32,
}

impl Spawner {
    /// Wraps a validated config.
    #[must_use]
    pub fn new(config: SpawnerConfig) -> Self {
        Self {
            config,
            alive: BTreeSet::new(),
            waves_spawned: 0,
        }
    }

    /// The spawner's settings.
    #[must_use]
    pub fn config(&self) -> &SpawnerConfig {
        &self.config
    }

    /// Waves triggered so far.
    #[must_use]
    pub const fn waves_spawned(&self) -> u32 {
        self.waves_spawned
    }

    /// Ships from this spawner still alive at the last wave.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.alive.len()
    }

    /// Returns `true` once the configured wave count is reached.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.config
            .waves
            .is_some_and(|waves| self.waves_spawned >= waves)
    }

    /// Time of the wave after one triggered at `now`, if any remain.
    #[must_use]
    pub fn next_wake(&self, now: f32) -> Option<f32> {
        (!self.is_exhausted()).then(|| now + self.config.interval)
    }

    /// Plans the next wave.
    ///
    /// Dead ships are forgotten first, then up to `wave_size` orders are
    /// produced without exceeding `max_alive`.
    pub fn plan_wave<R: Rng + ?Sized>(&mut self, rng: &mut R, registry: &Registry) -> Vec<SpawnOrder> {
        self.alive.retain(|id| registry.contains(*id));
        if self.is_exhausted() {
            return Vec::new();
        }
        self.waves_spawned += 1;

        let room = self.config.max_alive.map_or(self.config.wave_size, |max| {
            max.saturating_sub(self.alive.len()).min(self.config.wave_size)
        });
        let mut orders = Vec::with_capacity(room);
        for _ in 0..room {
            let Some(index) = weighted_random_index(rng, &self.config.probabilities) else {
                break;
            };
            let Some(blueprint) = self.config.options.get(index) else {
                break;
            };
            orders.push(SpawnOrder {
                blueprint: blueprint.clone(),
                position: random_point_in_disc(rng, self.config.position, self.config.spread),
                rotation: self.config.rotation,
                team: self.config.team,
            });
        }
        orders
    }

    /// Tracks a ship spawned from one of this spawner's orders.
    pub fn record(&mut self, id: EntityId) {
        self.alive.insert(id);
    }
}
