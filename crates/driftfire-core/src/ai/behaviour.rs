//! Target-relative steering.
//!
//! [`BehaviourInRelationToTarget`] turns a snapshot of one entity
//! ([`MovementBehaviourData`]) plus the [`Registry`] into a desired movement
//! direction. Three sub-vectors are combined:
//!
//! - **chase**: toward (or away from) the closest enemy in chase range
//! - **obstacle avoidance**: away from nearby allies, obstacles and
//!   indestructibles, weighted by mass over squared distance
//! - **projectile avoidance**: sideways out of the path of incoming shots
//!
//! Each is clamped to unit length before blending, so no single term can
//! dominate through magnitude alone.

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityId, ObjectCategory};
use crate::geometry::{clamp_magnitude, closest_approach, EPSILON};
use crate::registry::Registry;
use crate::team::Team;

/// Own speed above which target and own position prediction kicks in.
pub const PREDICTION_MIN_SPEED: f32 = 2.0;

/// Seconds of warning over which an incoming projectile's weight builds up.
pub const PROJECTILE_HORIZON: f32 = 3.0;

/// How the chase term treats distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChaseStyle {
    /// Hold position at `attack_range`: magnitude is `distance - attack_range`.
    #[default]
    Ranged,
    /// Close in at full strength.
    Melee,
}

/// Whether the chase term points toward or away from the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementMode {
    /// Move toward the target.
    #[default]
    Chasing,
    /// Move away from the target.
    Avoiding,
}

/// Snapshot of the steering entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementBehaviourData {
    /// The entity being steered.
    pub self_id: EntityId,
    /// Current position.
    pub position: Vec2,
    /// Current velocity.
    pub velocity: Vec2,
    /// Team of the entity.
    pub team: Team,
    /// Ship size, used as the projectile danger radius.
    pub radius: f32,
    /// Entity that spawned this one, if any.
    pub parent: Option<EntityId>,
}

impl MovementBehaviourData {
    /// Snapshots an entity.
    #[must_use]
    pub fn from_entity(entity: &Entity) -> Self {
        Self {
            self_id: entity.id(),
            position: entity.position(),
            velocity: entity.velocity(),
            team: entity.team,
            radius: entity.radius,
            parent: entity.parent,
        }
    }

    /// Returns `true` if `other` is this entity, its parent, a child, or a
    /// sibling.
    #[must_use]
    pub fn is_substructure(&self, other: &Entity) -> bool {
        let id = other.id();
        if id == self.self_id || Some(id) == self.parent {
            return true;
        }
        match other.parent {
            Some(parent) => parent == self.self_id || Some(parent) == self.parent,
            None => false,
        }
    }
}

/// Result of one steering evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SteeringOutput {
    /// Desired movement direction. Not normalized: its length expresses
    /// urgency.
    pub direction: Vec2,
    /// Enemy being chased, if any.
    pub target: Option<EntityId>,
    /// Distance to the target at evaluation time.
    pub target_distance: Option<f32>,
}

/// Chase-and-avoid steering relative to the closest enemy.
///
/// # Example
///
/// ```
/// use driftfire_core::ai::{BehaviourInRelationToTarget, MovementBehaviourData};
/// use driftfire_core::entity::{EntityCore, EntityId, EntityInner, ObjectCategory, ObstacleComponents};
/// use driftfire_core::registry::Registry;
/// use driftfire_core::team::Team;
/// use glam::Vec2;
///
/// let mut registry = Registry::new();
/// let enemy = registry.spawn(
///     EntityCore::at(Vec2::new(0.0, 40.0), Team::new(2), 1.0),
///     EntityInner::Obstacle(ObstacleComponents::default()),
/// );
/// registry.add_object(ObjectCategory::Entity, enemy);
///
/// let me = MovementBehaviourData {
///     self_id: EntityId::new(99),
///     position: Vec2::ZERO,
///     velocity: Vec2::ZERO,
///     team: Team::new(1),
///     radius: 1.0,
///     parent: None,
/// };
/// let steering = BehaviourInRelationToTarget::default().desired_direction(&me, &registry);
///
/// assert_eq!(steering.target, Some(enemy));
/// assert!(steering.direction.y > 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviourInRelationToTarget {
    /// Enemies further than this are ignored.
    pub chase_range: f32,
    /// Preferred distance for ranged chasing.
    pub attack_range: f32,
    /// Obstacles closer than this push the entity away.
    pub avoid_range: f32,
    /// Ranged or melee distance handling.
    pub chase_style: ChaseStyle,
    /// Toward or away from the target.
    pub movement_mode: MovementMode,
    /// Lead with own velocity when predicting.
    pub predict_own_position: bool,
    /// Lead the target's velocity when predicting.
    pub predict_target_position: bool,
    /// Weight of projectile avoidance relative to obstacle avoidance.
    pub projectile_avoidance: f32,
    /// Extra weight given to the avoidance term in the final blend.
    pub entity_avoidance: f32,
}

impl Default for BehaviourInRelationToTarget {
    fn default() -> Self {
        Self {
            chase_range: 100.0,
            attack_range: 15.0,
            avoid_range: 8.0,
            chase_style: ChaseStyle::Ranged,
            movement_mode: MovementMode::Chasing,
            predict_own_position: false,
            predict_target_position: true,
            projectile_avoidance: 1.0,
            entity_avoidance: 0.0,
        }
    }
}

impl BehaviourInRelationToTarget {
    /// Combines chase and avoidance into one desired direction.
    #[must_use]
    pub fn desired_direction(
        &self,
        data: &MovementBehaviourData,
        registry: &Registry,
    ) -> SteeringOutput {
        let (chase, target, target_distance) = match self.find_target(data, registry) {
            Some(target) => {
                let distance = data.position.distance(target.position());
                (self.chase_vector(data, target), Some(target.id()), Some(distance))
            }
            None => (Vec2::ZERO, None, None),
        };
        let obstacle = self.obstacle_avoidance_vector(data, registry);
        let projectile = self.projectile_avoidance_vector(data, registry);

        SteeringOutput {
            direction: self.blend(chase, obstacle, projectile),
            target,
            target_distance,
        }
    }

    /// Closest living enemy within chase range.
    #[must_use]
    pub fn find_target<'r>(
        &self,
        data: &MovementBehaviourData,
        registry: &'r Registry,
    ) -> Option<&'r Entity> {
        let id = registry.closest_enemy_within(data.position, data.team, self.chase_range)?;
        registry.get(id)
    }

    /// Chase term toward `target`.
    ///
    /// Ranged chasing scales by `distance - attack_range`, which turns
    /// negative (backing off) inside the attack range. `Avoiding` mode
    /// negates the result.
    #[must_use]
    pub fn chase_vector(&self, data: &MovementBehaviourData, target: &Entity) -> Vec2 {
        let mut own = data.position;
        let mut aim = target.position();

        let speed = data.velocity.length();
        if speed > PREDICTION_MIN_SPEED {
            let lead = own.distance(aim) / speed;
            if self.predict_own_position {
                own += data.velocity * lead;
            }
            if self.predict_target_position {
                aim += target.velocity() * lead;
            }
        }

        let delta = aim - own;
        let magnitude = match self.chase_style {
            ChaseStyle::Ranged => delta.length() - self.attack_range,
            ChaseStyle::Melee => 1.0,
        };
        let chase = delta.normalize_or_zero() * magnitude;
        match self.movement_mode {
            MovementMode::Chasing => chase,
            MovementMode::Avoiding => -chase,
        }
    }

    /// Repulsion from allies, obstacles and indestructibles inside
    /// `avoid_range`, ignoring the entity's own substructure.
    #[must_use]
    pub fn obstacle_avoidance_vector(&self, data: &MovementBehaviourData, registry: &Registry) -> Vec2 {
        let mut candidates: BTreeSet<EntityId> = registry
            .ally_list(data.team, Some(data.self_id))
            .into_iter()
            .collect();
        for category in [ObjectCategory::Obstacle, ObjectCategory::Indestructible] {
            candidates.extend(registry.objects_in_range(category, data.position, self.chase_range));
        }

        let avoid_sq = self.avoid_range * self.avoid_range;
        candidates
            .into_iter()
            .filter_map(|id| registry.get(id))
            .filter(|other| !data.is_substructure(other))
            .filter_map(|other| {
                let delta = other.position() - data.position;
                let distance_sq = delta.length_squared();
                if distance_sq > avoid_sq || distance_sq < EPSILON {
                    return None;
                }
                Some(-delta.normalize() * other.mass() / distance_sq)
            })
            .sum()
    }

    /// Sideways push away from non-allied projectiles on a collision course.
    ///
    /// A projectile counts when it is approaching in the entity's frame and
    /// its pass line comes within the entity's radius. The push grows as
    /// the time to closest approach drops under [`PROJECTILE_HORIZON`] and
    /// as the miss distance shrinks.
    #[must_use]
    pub fn projectile_avoidance_vector(
        &self,
        data: &MovementBehaviourData,
        registry: &Registry,
    ) -> Vec2 {
        registry
            .objects_in_range(ObjectCategory::Projectile, data.position, self.chase_range)
            .into_iter()
            .filter_map(|id| registry.get(id))
            .filter(|shot| !data.team.is_allied_with(shot.team))
            .filter_map(|shot| {
                let relative = shot.velocity() - data.velocity;
                let approach = closest_approach(shot.position(), relative, data.position)?;
                let miss = approach.miss.length();
                if miss > data.radius {
                    return None;
                }
                let urgency = (PROJECTILE_HORIZON - approach.time).max(0.0);
                let weight = urgency * urgency / miss.max(EPSILON);
                let away = if miss > EPSILON {
                    approach.miss / miss
                } else {
                    relative.perp().normalize_or_zero()
                };
                Some(away * weight)
            })
            .sum()
    }

    /// Mixes the three sub-vectors.
    ///
    /// Avoidance eats into the chase weight: the stronger the avoidance, the
    /// less the chase term contributes.
    #[must_use]
    pub fn blend(&self, chase: Vec2, obstacle: Vec2, projectile: Vec2) -> Vec2 {
        let chase = clamp_magnitude(chase, 1.0);
        let obstacle = clamp_magnitude(obstacle, 1.0);
        let projectile = clamp_magnitude(projectile, 1.0);

        let avoidance = clamp_magnitude(
            obstacle + projectile * (1.0 - obstacle.length()) * self.projectile_avoidance,
            1.0,
        );
        let chase_weight = chase.length() * (1.0 - avoidance.length());

        chase.normalize_or_zero() * chase_weight
            + avoidance.normalize_or_zero() * (1.0 + self.entity_avoidance - chase_weight)
    }
}
