//! Per-entity rotation and velocity integrator.
//!
//! The [`EntityMover`] sits between intent (actions and AI) and the rigid
//! body. Rotation requests during a frame only adjust a *held* angle; the
//! physics step commits that angle, clamped to the configured turn rate around
//! the angle committed on the previous tick. Because every mover clamps
//! against its own history, the order in which entities are processed within
//! a tick has no effect on the result.
//!
//! # Speed limits
//!
//! The mover does not clamp speed. Callers that add thrust are expected to
//! respect [`EntityMover::max_speed`] and [`EntityMover::min_speed`] along the
//! forward axis (see [`ThrustAction`](crate::action::ThrustAction)).
//!
//! # Example
//!
//! ```
//! use driftfire_core::body::{Body, BodyMut};
//! use driftfire_core::entity::TransformState;
//! use driftfire_core::mover::{EntityMover, MoverConfig};
//! use glam::Vec2;
//!
//! let config = MoverConfig { max_turning_speed: 90.0, ..MoverConfig::default() };
//! let mut mover = EntityMover::new(config, 0.0);
//! let mut transform = TransformState::new(Vec2::ZERO, 0.0);
//! let mut body = Body::default();
//! let mut handle = BodyMut::new(&mut transform, &mut body);
//!
//! mover.rotate_towards_vector(&handle, Vec2::new(0.0, -1.0), false, 1.0 / 60.0);
//! mover.fixed_update(&mut handle, 1.0 / 60.0);
//!
//! // One tick at 90°/s turns at most 1.5°.
//! assert!(transform.rotation.abs() <= 1.5 + 1e-4);
//! ```

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::body::RigidBody;
use crate::geometry::{angle_of, delta_angle, direction_from_angle, wrap_angle, EPSILON};

/// Requests smaller than this fraction of the max turn rate snap directly.
const DIRECT_TURN_FRACTION: f32 = 0.1;

/// Movement limits for one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoverConfig {
    /// Highest allowed forward speed (units per second).
    pub max_speed: f32,
    /// Lowest allowed forward speed. Negative values allow reversing.
    pub min_speed: f32,
    /// Maximum turn rate in degrees per second.
    pub max_turning_speed: f32,
    /// Lateral grip: `0` slides freely, `1` removes all sideways velocity
    /// every tick.
    pub drift_factor: f32,
}

impl Default for MoverConfig {
    fn default() -> Self {
        Self {
            max_speed: 10.0,
            min_speed: 0.0,
            max_turning_speed: 180.0,
            drift_factor: 0.5,
        }
    }
}

/// Rotation and drift integrator for a single entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMover {
    config: MoverConfig,
    /// Angle committed on the previous physics tick.
    previous_angle: f32,
    /// Rotation requested since the last commit.
    held_angle: Option<f32>,
    /// Desired movement direction set by the controller.
    input_vector: Vec2,
}

impl EntityMover {
    /// Creates a mover for an entity currently facing `initial_rotation`.
    #[must_use]
    pub fn new(config: MoverConfig, initial_rotation: f32) -> Self {
        Self {
            config,
            previous_angle: initial_rotation,
            held_angle: None,
            input_vector: Vec2::ZERO,
        }
    }

    /// Returns the movement limits.
    #[must_use]
    pub const fn config(&self) -> &MoverConfig {
        &self.config
    }

    /// Highest allowed forward speed.
    #[must_use]
    pub const fn max_speed(&self) -> f32 {
        self.config.max_speed
    }

    /// Lowest allowed forward speed.
    #[must_use]
    pub const fn min_speed(&self) -> f32 {
        self.config.min_speed
    }

    /// Angle committed on the previous tick.
    #[must_use]
    pub const fn previous_angle(&self) -> f32 {
        self.previous_angle
    }

    /// Rotation requested for the next commit, if any.
    #[must_use]
    pub const fn held_angle(&self) -> Option<f32> {
        self.held_angle
    }

    /// Stores the desired movement direction. Has no immediate effect.
    pub fn set_input_vector(&mut self, input: Vec2) {
        self.input_vector = input;
    }

    /// Desired movement direction.
    #[must_use]
    pub const fn input_vector(&self) -> Vec2 {
        self.input_vector
    }

    /// Ratio of current speed to max speed, in `[0, 1]`.
    #[must_use]
    pub fn speed_ratio(&self, body: &dyn RigidBody) -> f32 {
        if self.config.max_speed <= 0.0 {
            return 0.0;
        }
        (body.velocity().length() / self.config.max_speed).clamp(0.0, 1.0)
    }

    fn current_request(&self, body: &dyn RigidBody) -> f32 {
        self.held_angle.unwrap_or_else(|| body.rotation())
    }

    /// Advances the held facing by `degrees_per_second × dt`.
    ///
    /// When `affected_by_velocity` is set the rate is scaled by the speed
    /// ratio, so a ship at rest cannot spin.
    pub fn rotate_by_angle(
        &mut self,
        body: &dyn RigidBody,
        degrees_per_second: f32,
        affected_by_velocity: bool,
        dt: f32,
    ) {
        let scale = if affected_by_velocity {
            self.speed_ratio(body)
        } else {
            1.0
        };
        let base = self.current_request(body);
        self.held_angle = Some(base + degrees_per_second * scale * dt);
    }

    /// Turns the held facing toward `direction` along the shorter arc.
    ///
    /// Deltas under 10% of the max turn rate are applied directly; larger
    /// ones advance by one tick's worth of turning (never overshooting).
    /// A zero direction is ignored.
    pub fn rotate_towards_vector(
        &mut self,
        body: &dyn RigidBody,
        direction: Vec2,
        affected_by_velocity: bool,
        dt: f32,
    ) {
        if direction.length_squared() < EPSILON * EPSILON {
            return;
        }
        let current = self.current_request(body);
        let delta = delta_angle(current, angle_of(direction));
        if delta.abs() < self.config.max_turning_speed * DIRECT_TURN_FRACTION {
            self.held_angle = Some(current + delta);
            return;
        }
        let scale = if affected_by_velocity {
            self.speed_ratio(body)
        } else {
            1.0
        };
        let step = (self.config.max_turning_speed * dt * scale).min(delta.abs());
        self.held_angle = Some(current + step.copysign(delta));
    }

    /// Physics-tick update: removes lateral drift, then commits the held
    /// rotation clamped to the turn rate.
    pub fn fixed_update(&mut self, body: &mut dyn RigidBody, dt: f32) {
        self.dampen_drift(body);

        if let Some(target) = self.held_angle.take() {
            let max_step = self.config.max_turning_speed.max(0.0) * dt;
            let delta = delta_angle(self.previous_angle, target).clamp(-max_step, max_step);
            body.set_rotation(wrap_angle(self.previous_angle + delta));
        }
        self.previous_angle = body.rotation();
    }

    fn dampen_drift(&self, body: &mut dyn RigidBody) {
        let grip = self.config.drift_factor.clamp(0.0, 1.0);
        if grip <= 0.0 {
            return;
        }
        let forward = direction_from_angle(body.rotation());
        let velocity = body.velocity();
        let forward_speed = velocity.dot(forward);
        let lateral = velocity - forward * forward_speed;
        body.set_velocity(forward * forward_speed + lateral * (1.0 - grip));
    }
}
