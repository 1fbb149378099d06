//! Rigid-body capability used by the mover and actions.
//!
//! Movement code never reaches into entity storage directly. It talks to a
//! [`RigidBody`], which exposes only what steering needs: position, linear
//! velocity, facing, mass and force accumulation. [`BodyMut`] implements the
//! trait over an entity's [`TransformState`] and [`Body`]; tests can supply
//! their own implementations.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::entity::components::TransformState;

/// Capability interface over a physics body.
///
/// Rotation is expressed in degrees using the convention from
/// [`geometry`](crate::geometry).
pub trait RigidBody {
    /// World-space position.
    fn position(&self) -> Vec2;
    /// Linear velocity in units per second.
    fn velocity(&self) -> Vec2;
    /// Overwrites the linear velocity.
    fn set_velocity(&mut self, velocity: Vec2);
    /// Facing angle in degrees.
    fn rotation(&self) -> f32;
    /// Overwrites the facing angle.
    fn set_rotation(&mut self, degrees: f32);
    /// Accumulates a force to be integrated on the next physics step.
    fn apply_force(&mut self, force: Vec2);
    /// Body mass. Zero means "no meaningful mass".
    fn mass(&self) -> f32;
}

/// Dynamic state of a rigid body.
///
/// Position and facing live in [`TransformState`]; this struct holds the
/// parts that only moving bodies have.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Linear velocity in units per second.
    pub velocity: Vec2,
    /// Mass used for force integration and avoidance weighting.
    pub mass: f32,
    /// Linear drag coefficient (fraction of velocity lost per second).
    pub linear_drag: f32,
    /// Forces accumulated since the last integration step.
    #[serde(skip)]
    pub force: Vec2,
}

impl Body {
    /// Creates a body with the given mass at rest.
    #[must_use]
    pub fn with_mass(mass: f32) -> Self {
        Self {
            mass,
            ..Self::default()
        }
    }

    /// Creates a body with an initial velocity.
    #[must_use]
    pub fn moving(mass: f32, velocity: Vec2) -> Self {
        Self {
            velocity,
            mass,
            ..Self::default()
        }
    }

    /// Applies accumulated forces and drag over `dt`, clearing the force
    /// accumulator. Returns the displacement for this step.
    pub fn integrate(&mut self, dt: f32) -> Vec2 {
        if self.mass > 0.0 {
            self.velocity += self.force / self.mass * dt;
        }
        self.force = Vec2::ZERO;
        if self.linear_drag > 0.0 {
            self.velocity *= (1.0 - self.linear_drag * dt).max(0.0);
        }
        self.velocity * dt
    }
}

impl Default for Body {
    fn default() -> Self {
        Self {
            velocity: Vec2::ZERO,
            mass: 1.0,
            linear_drag: 0.0,
            force: Vec2::ZERO,
        }
    }
}

/// Mutable [`RigidBody`] view over an entity's transform and body.
#[derive(Debug)]
pub struct BodyMut<'a> {
    transform: &'a mut TransformState,
    body: &'a mut Body,
}

impl<'a> BodyMut<'a> {
    /// Borrows a transform and body as one rigid body.
    pub fn new(transform: &'a mut TransformState, body: &'a mut Body) -> Self {
        Self { transform, body }
    }
}

impl RigidBody for BodyMut<'_> {
    fn position(&self) -> Vec2 {
        self.transform.position
    }

    fn velocity(&self) -> Vec2 {
        self.body.velocity
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        self.body.velocity = velocity;
    }

    fn rotation(&self) -> f32 {
        self.transform.rotation
    }

    fn set_rotation(&mut self, degrees: f32) {
        self.transform.rotation = degrees;
    }

    fn apply_force(&mut self, force: Vec2) {
        self.body.force += force;
    }

    fn mass(&self) -> f32 {
        self.body.mass
    }
}
