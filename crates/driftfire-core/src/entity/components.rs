//! Component structs carried by entities.
//!
//! Shared components (transform, body, team) live directly on
//! [`Entity`](super::Entity); the structs here are the per-type bundles
//! stored in [`EntityInner`](super::EntityInner).

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::action::{AiIntents, EntityInput};
use crate::ai::AiController;
use crate::damage::{DamageCategory, DamagePayload};
use crate::entity::EntityId;
use crate::mover::EntityMover;

/// Position and facing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformState {
    /// World-space position.
    pub position: Vec2,
    /// Facing in degrees (`0` faces `+Y`).
    pub rotation: f32,
}

impl TransformState {
    /// Creates a transform at `position` facing `rotation` degrees.
    #[must_use]
    pub const fn new(position: Vec2, rotation: f32) -> Self {
        Self { position, rotation }
    }
}

/// Hit points plus per-category damage immunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    /// Current hit points.
    pub hp: f32,
    /// Maximum hit points.
    pub max_hp: f32,
    /// Immunity per damage category, in `[0, 1]`. `1` ignores the category.
    #[serde(default)]
    pub immunities: BTreeMap<DamageCategory, f32>,
    /// Last entity that dealt damage to this one.
    #[serde(skip)]
    pub last_attacker: Option<EntityId>,
}

impl Health {
    /// Creates full health with no immunities.
    #[must_use]
    pub fn new(max_hp: f32) -> Self {
        Self {
            hp: max_hp,
            max_hp,
            immunities: BTreeMap::new(),
            last_attacker: None,
        }
    }

    /// Adds an immunity for `category`, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_immunity(mut self, category: DamageCategory, immunity: f32) -> Self {
        self.immunities.insert(category, immunity.clamp(0.0, 1.0));
        self
    }

    /// Immunity for `category` in `[0, 1]` (zero if none configured).
    #[must_use]
    pub fn immunity(&self, category: DamageCategory) -> f32 {
        self.immunities
            .get(&category)
            .copied()
            .unwrap_or(0.0)
            .clamp(0.0, 1.0)
    }

    /// Fraction of health remaining, for health bars.
    #[must_use]
    pub fn bar_ratio(&self) -> f32 {
        if self.max_hp <= 0.0 {
            return 0.0;
        }
        (self.hp / self.max_hp).clamp(0.0, 1.0)
    }

    /// Returns `true` once hit points are exhausted.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.hp <= 0.0
    }
}

/// Age tracking for entities that expire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Lifetime {
    /// Seconds since spawn.
    pub age: f32,
    /// Age at which the entity is removed, if any.
    pub max_age: Option<f32>,
}

impl Lifetime {
    /// A lifetime that expires after `max_age` seconds.
    #[must_use]
    pub const fn expiring(max_age: f32) -> Self {
        Self {
            age: 0.0,
            max_age: Some(max_age),
        }
    }
}

/// What a gun launches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSpec {
    /// Launch speed relative to the firing ship.
    pub speed: f32,
    /// Collision radius.
    pub radius: f32,
    /// Seconds before the projectile expires.
    pub max_age: f32,
    /// Damage carried by the projectile.
    pub payload: DamagePayload,
}

/// A single gun mount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gun {
    /// Seconds between shots.
    pub reload_time: f32,
    /// Muzzle offset in the ship's local frame (`+Y` is forward).
    #[serde(default)]
    pub muzzle: Vec2,
    /// Projectile fired by this gun.
    pub projectile: ProjectileSpec,
    /// Seconds until the gun can fire again.
    #[serde(skip)]
    pub cooldown: f32,
}

impl Gun {
    /// Returns `true` if the gun can fire this tick.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.cooldown <= 0.0
    }
}

/// Guns mounted directly on a ship.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Loadout {
    /// Mounted guns.
    pub guns: Vec<Gun>,
}

/// Runtime damage payload of an in-flight projectile.
///
/// The payload's pools shrink as a piercing projectile passes through
/// targets; `hits` prevents one projectile from hitting the same target
/// twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageDealer {
    /// Remaining damage per category plus flags.
    pub payload: DamagePayload,
    /// Targets already damaged by this projectile.
    #[serde(default)]
    pub hits: BTreeSet<EntityId>,
}

impl DamageDealer {
    /// Wraps a payload with an empty hit list.
    #[must_use]
    pub fn new(payload: DamagePayload) -> Self {
        Self {
            payload,
            hits: BTreeSet::new(),
        }
    }
}

/// Components for ships.
#[derive(Debug, Clone)]
pub struct ShipComponents {
    /// Rotation/drift integrator.
    pub mover: EntityMover,
    /// Input-to-action bindings.
    pub input: EntityInput,
    /// AI state, if this ship is computer controlled.
    pub ai: Option<AiController>,
    /// Intents produced by the AI for the next physics tick.
    pub intents: AiIntents,
    /// Hit points.
    pub health: Health,
    /// Mounted guns.
    pub loadout: Loadout,
    /// Set by the fire action during input processing.
    pub fire_requested: bool,
}

impl ShipComponents {
    /// Creates ship components with no AI.
    #[must_use]
    pub fn new(mover: EntityMover, input: EntityInput, health: Health, loadout: Loadout) -> Self {
        Self {
            mover,
            input,
            ai: None,
            intents: AiIntents::default(),
            health,
            loadout,
            fire_requested: false,
        }
    }

    /// Attaches an AI controller.
    #[must_use]
    pub fn with_ai(mut self, ai: AiController) -> Self {
        self.ai = Some(ai);
        self
    }
}

/// Components for projectiles.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileComponents {
    /// Remaining damage payload.
    pub dealer: DamageDealer,
    /// Age since launch.
    pub lifetime: Lifetime,
}

/// Components for obstacles, debris and indestructible scenery.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObstacleComponents {
    /// Hit points, `None` for indestructible objects.
    pub health: Option<Health>,
    /// Expiry for debris.
    pub lifetime: Option<Lifetime>,
}
