//! Entity types for the simulation.
//!
//! - [`EntityId`]: unique identifier, ordered for deterministic iteration
//! - [`EntityTag`]: what kind of object an entity is
//! - [`ObjectCategory`]: registry partitions an entity can be listed under
//! - [`EntityInner`]: type-specific component bundle
//! - [`Entity`]: shared components plus the inner bundle
//!
//! # Example
//!
//! ```
//! use driftfire_core::entity::{Entity, EntityCore, EntityId, EntityInner, EntityTag, ObstacleComponents};
//! use driftfire_core::team::Team;
//! use glam::Vec2;
//!
//! let rock = Entity::new(
//!     EntityId::new(7),
//!     EntityCore::at(Vec2::new(3.0, 4.0), Team::NEUTRAL, 2.0),
//!     EntityInner::Obstacle(ObstacleComponents::default()),
//! );
//!
//! assert_eq!(rock.id().as_u64(), 7);
//! assert_eq!(rock.tag(), EntityTag::Obstacle);
//! assert_eq!(rock.mass(), 0.0);
//! ```

pub mod components;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::body::{Body, BodyMut};
use crate::damage::DamageTarget;
use crate::team::Team;

pub use components::{
    DamageDealer, Gun, Health, Lifetime, Loadout, ObstacleComponents, ProjectileComponents,
    ProjectileSpec, ShipComponents, TransformState,
};

/// Unique identifier for an entity.
///
/// Ids are assigned monotonically by the [`Registry`](crate::registry::Registry)
/// and never reused, so a stale id simply fails to resolve.
///
/// # Example
///
/// ```
/// use driftfire_core::entity::EntityId;
///
/// let id1 = EntityId::new(1);
/// let id2 = EntityId::new(2);
///
/// assert!(id1 < id2);
/// assert_eq!(id1.as_u64(), 1);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new `EntityId` from a raw `u64` value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` value of this identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

/// Kind of simulated object.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityTag {
    /// Controllable craft, player or AI.
    Ship,
    /// In-flight shot.
    Projectile,
    /// Asteroids, debris, walls.
    Obstacle,
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ship => write!(f, "Ship"),
            Self::Projectile => write!(f, "Projectile"),
            Self::Obstacle => write!(f, "Obstacle"),
        }
    }
}

/// Registry partitions.
///
/// An entity is listed only under the categories it was explicitly added to.
/// Team queries (allies, enemies, closest enemy) search [`ObjectCategory::Entity`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ObjectCategory {
    /// Anything with a team that can be targeted.
    Entity,
    /// Ships specifically.
    Ship,
    /// Objects to steer around.
    Obstacle,
    /// Objects that cannot be destroyed.
    Indestructible,
    /// In-flight projectiles.
    Projectile,
}

impl ObjectCategory {
    /// Every category, in index order.
    pub const ALL: [Self; 5] = [
        Self::Entity,
        Self::Ship,
        Self::Obstacle,
        Self::Indestructible,
        Self::Projectile,
    ];
}

impl fmt::Display for ObjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Entity => "Entity",
            Self::Ship => "Ship",
            Self::Obstacle => "Obstacle",
            Self::Indestructible => "Indestructible",
            Self::Projectile => "Projectile",
        };
        f.write_str(name)
    }
}

/// Type-specific component storage.
#[derive(Debug, Clone)]
pub enum EntityInner {
    /// Ship components (mover, input, AI, health, guns).
    Ship(Box<ShipComponents>),
    /// Projectile components (damage payload, lifetime).
    Projectile(ProjectileComponents),
    /// Obstacle components (optional health and lifetime).
    Obstacle(ObstacleComponents),
}

impl EntityInner {
    /// Returns the tag matching this variant.
    #[must_use]
    pub const fn tag(&self) -> EntityTag {
        match self {
            Self::Ship(_) => EntityTag::Ship,
            Self::Projectile(_) => EntityTag::Projectile,
            Self::Obstacle(_) => EntityTag::Obstacle,
        }
    }
}

/// Components every entity has, independent of its type.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityCore {
    /// Position and facing.
    pub transform: TransformState,
    /// Rigid body, if the entity moves.
    pub body: Option<Body>,
    /// Team membership.
    pub team: Team,
    /// Entity that spawned this one.
    pub parent: Option<EntityId>,
    /// Collision radius.
    pub radius: f32,
}

impl EntityCore {
    /// A static core at `position` facing `0°`.
    #[must_use]
    pub fn at(position: Vec2, team: Team, radius: f32) -> Self {
        Self {
            transform: TransformState::new(position, 0.0),
            body: None,
            team,
            parent: None,
            radius,
        }
    }

    /// Sets the facing.
    #[must_use]
    pub fn facing(mut self, rotation: f32) -> Self {
        self.transform.rotation = rotation;
        self
    }

    /// Attaches a rigid body.
    #[must_use]
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Records the spawning entity.
    #[must_use]
    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// A simulated object.
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    /// Position and facing.
    pub transform: TransformState,
    /// Rigid body, if the entity moves.
    pub body: Option<Body>,
    /// Team membership.
    pub team: Team,
    /// Entity that spawned this one.
    pub parent: Option<EntityId>,
    /// Collision radius.
    pub radius: f32,
    inner: EntityInner,
}

impl Entity {
    /// Assembles an entity from its shared core and type-specific bundle.
    #[must_use]
    pub fn new(id: EntityId, core: EntityCore, inner: EntityInner) -> Self {
        let EntityCore {
            transform,
            body,
            team,
            parent,
            radius,
        } = core;
        Self {
            id,
            transform,
            body,
            team,
            parent,
            radius,
            inner,
        }
    }

    /// Returns the entity's unique identifier.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the entity's type tag.
    #[must_use]
    pub const fn tag(&self) -> EntityTag {
        self.inner.tag()
    }

    /// Returns the type-specific components.
    #[must_use]
    pub const fn inner(&self) -> &EntityInner {
        &self.inner
    }

    /// World-space position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.transform.position
    }

    /// Linear velocity, zero for static entities.
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        self.body.as_ref().map_or(Vec2::ZERO, |b| b.velocity)
    }

    /// Body mass, zero for entities without a body.
    #[must_use]
    pub fn mass(&self) -> f32 {
        self.body.as_ref().map_or(0.0, |b| b.mass)
    }

    /// Returns `true` if this entity is a ship.
    #[must_use]
    pub const fn is_ship(&self) -> bool {
        matches!(self.inner, EntityInner::Ship(_))
    }

    /// Returns `true` if this entity is a projectile.
    #[must_use]
    pub const fn is_projectile(&self) -> bool {
        matches!(self.inner, EntityInner::Projectile(_))
    }

    /// Returns `true` if this entity is an obstacle.
    #[must_use]
    pub const fn is_obstacle(&self) -> bool {
        matches!(self.inner, EntityInner::Obstacle(_))
    }

    /// Ship components, if this is a ship.
    #[must_use]
    pub fn as_ship(&self) -> Option<&ShipComponents> {
        match &self.inner {
            EntityInner::Ship(ship) => Some(ship.as_ref()),
            _ => None,
        }
    }

    /// Mutable ship components, if this is a ship.
    #[must_use]
    pub fn as_ship_mut(&mut self) -> Option<&mut ShipComponents> {
        match &mut self.inner {
            EntityInner::Ship(ship) => Some(ship.as_mut()),
            _ => None,
        }
    }

    /// Projectile components, if this is a projectile.
    #[must_use]
    pub const fn as_projectile(&self) -> Option<&ProjectileComponents> {
        match &self.inner {
            EntityInner::Projectile(projectile) => Some(projectile),
            _ => None,
        }
    }

    /// Mutable projectile components, if this is a projectile.
    #[must_use]
    pub fn as_projectile_mut(&mut self) -> Option<&mut ProjectileComponents> {
        match &mut self.inner {
            EntityInner::Projectile(projectile) => Some(projectile),
            _ => None,
        }
    }

    /// Obstacle components, if this is an obstacle.
    #[must_use]
    pub const fn as_obstacle(&self) -> Option<&ObstacleComponents> {
        match &self.inner {
            EntityInner::Obstacle(obstacle) => Some(obstacle),
            _ => None,
        }
    }

    /// Health, if the entity can be damaged.
    #[must_use]
    pub fn health(&self) -> Option<&Health> {
        match &self.inner {
            EntityInner::Ship(ship) => Some(&ship.health),
            EntityInner::Obstacle(obstacle) => obstacle.health.as_ref(),
            EntityInner::Projectile(_) => None,
        }
    }

    /// Mutable health, if the entity can be damaged.
    #[must_use]
    pub fn health_mut(&mut self) -> Option<&mut Health> {
        match &mut self.inner {
            EntityInner::Ship(ship) => Some(&mut ship.health),
            EntityInner::Obstacle(obstacle) => obstacle.health.as_mut(),
            EntityInner::Projectile(_) => None,
        }
    }

    /// Lifetime, for projectiles and expiring debris.
    #[must_use]
    pub fn lifetime_mut(&mut self) -> Option<&mut Lifetime> {
        match &mut self.inner {
            EntityInner::Projectile(projectile) => Some(&mut projectile.lifetime),
            EntityInner::Obstacle(obstacle) => obstacle.lifetime.as_mut(),
            EntityInner::Ship(_) => None,
        }
    }

    /// Rigid-body view over this entity's transform and body.
    #[must_use]
    pub fn body_mut(&mut self) -> Option<BodyMut<'_>> {
        let body = self.body.as_mut()?;
        Some(BodyMut::new(&mut self.transform, body))
    }

    /// Splits a ship into its rigid body and ship components so both can be
    /// borrowed mutably at once.
    #[must_use]
    pub fn ship_parts_mut(&mut self) -> Option<(BodyMut<'_>, &mut ShipComponents)> {
        let body = self.body.as_mut()?;
        match &mut self.inner {
            EntityInner::Ship(ship) => Some((BodyMut::new(&mut self.transform, body), ship.as_mut())),
            _ => None,
        }
    }

    /// Damage-pipeline view of this entity, if it has health.
    #[must_use]
    pub fn damage_target(&mut self) -> Option<DamageTarget<'_>> {
        let id = self.id;
        let team = self.team;
        let health = self.health_mut()?;
        Some(DamageTarget::new(id, team, health))
    }
}
