//! Actions: configured effects bound to input triggers.
//!
//! An [`Action`] is applied every physics tick by [`EntityInput`] with an
//! `active` flag and an intensity in `[0, 1]`. Inactive actions are still
//! called (with intensity `0`), so every implementation must treat that as a
//! no-op rather than relying on being skipped.
//!
//! Actions receive an [`ActionData`] bundle lending them the entity's
//! [`RigidBody`] and [`EntityMover`] for the duration of the call.

mod input;

use std::fmt::Debug;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::body::RigidBody;
use crate::geometry::{direction_from_angle, rotate, EPSILON};
use crate::mover::EntityMover;

pub use input::{
    ActionTriplet, AiIntent, AiIntents, ControllerKind, EntityInput, InputState, InputTrigger, Key,
    MouseButton,
};

/// Per-call bundle handed to [`Action::apply`].
///
/// The body and mover are borrowed mutably for the duration of one physics
/// tick; everything else is read-only context.
pub struct ActionData<'a> {
    /// The entity's rigid body.
    pub body: &'a mut dyn RigidBody,
    /// The entity's rotation integrator.
    pub mover: &'a mut EntityMover,
    /// World-space cursor position, if a pointer is available.
    pub cursor: Option<Vec2>,
    /// Physics time step in seconds.
    pub dt: f32,
    /// Set by actions that want the entity's guns to fire this tick.
    pub fire_requested: bool,
}

impl<'a> ActionData<'a> {
    /// Bundles a body and mover for one tick.
    pub fn new(body: &'a mut dyn RigidBody, mover: &'a mut EntityMover, dt: f32) -> Self {
        Self {
            body,
            mover,
            cursor: None,
            dt,
            fire_requested: false,
        }
    }

    /// Supplies the cursor position.
    #[must_use]
    pub fn with_cursor(mut self, cursor: Option<Vec2>) -> Self {
        self.cursor = cursor;
        self
    }
}

/// An effect that can be bound to an input.
pub trait Action: Debug + Send + Sync {
    /// Applies the action for one physics tick.
    ///
    /// `percentage` is the trigger intensity in `[0, 1]`; it is `0` whenever
    /// `active` is `false`.
    fn apply(&self, data: &mut ActionData<'_>, active: bool, percentage: f32);
}

// =============================================================================
// Movement
// =============================================================================

/// Pushes the body with a constant force along a ship-local direction.
///
/// Forward speed is kept within the mover's `[min_speed, max_speed]`:
/// thrust that would push past a limit is withheld and any excess forward
/// speed is trimmed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThrustAction {
    /// Force magnitude at full intensity.
    pub force: f32,
    /// Direction in the ship's local frame (`+Y` is forward).
    #[serde(default = "forward")]
    pub direction: Vec2,
}

fn forward() -> Vec2 {
    Vec2::Y
}

impl Action for ThrustAction {
    fn apply(&self, data: &mut ActionData<'_>, active: bool, percentage: f32) {
        if !active || percentage <= 0.0 {
            return;
        }
        let facing = data.body.rotation();
        let heading = direction_from_angle(facing);
        let push = rotate(self.direction.normalize_or_zero(), facing) * self.force * percentage;

        let velocity = data.body.velocity();
        let forward_speed = velocity.dot(heading);
        let forward_push = push.dot(heading);
        let max_speed = data.mover.max_speed();
        let min_speed = data.mover.min_speed();

        let blocked = (forward_push > 0.0 && forward_speed >= max_speed)
            || (forward_push < 0.0 && forward_speed <= min_speed);
        if !blocked {
            data.body.apply_force(push);
        }

        let clamped = forward_speed.clamp(min_speed.min(max_speed), max_speed);
        if (clamped - forward_speed).abs() > EPSILON {
            data.body.set_velocity(velocity + heading * (clamped - forward_speed));
        }
    }
}

// =============================================================================
// Rotation
// =============================================================================

/// Turns at a constant rate while held.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotateAction {
    /// Turn rate in degrees per second at full intensity. Positive turns
    /// counter-clockwise.
    pub degrees_per_second: f32,
    /// Scale the rate by the speed ratio.
    #[serde(default)]
    pub affected_by_velocity: bool,
}

impl Action for RotateAction {
    fn apply(&self, data: &mut ActionData<'_>, active: bool, percentage: f32) {
        let rate = if active {
            self.degrees_per_second * percentage
        } else {
            0.0
        };
        data.mover
            .rotate_by_angle(&*data.body, rate, self.affected_by_velocity, data.dt);
    }
}

/// Turns toward the cursor while held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RotateTowardsCursor {
    /// Scale the turn rate by the speed ratio.
    #[serde(default)]
    pub affected_by_velocity: bool,
}

impl Action for RotateTowardsCursor {
    fn apply(&self, data: &mut ActionData<'_>, active: bool, percentage: f32) {
        if !active || percentage <= 0.0 {
            return;
        }
        let Some(cursor) = data.cursor else {
            return;
        };
        let direction = cursor - data.body.position();
        data.mover
            .rotate_towards_vector(&*data.body, direction, self.affected_by_velocity, data.dt);
    }
}

/// Turns toward the direction of travel once moving fast enough.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RotateTowardsMovement {
    /// Speed below which the action does nothing.
    #[serde(default)]
    pub min_speed_to_activate: f32,
    /// Scale the turn rate by the speed ratio.
    #[serde(default)]
    pub affected_by_velocity: bool,
}

impl Action for RotateTowardsMovement {
    fn apply(&self, data: &mut ActionData<'_>, active: bool, percentage: f32) {
        if !active || percentage <= 0.0 {
            return;
        }
        let velocity = data.body.velocity();
        if velocity.length() < self.min_speed_to_activate.max(EPSILON) {
            return;
        }
        data.mover
            .rotate_towards_vector(&*data.body, velocity, self.affected_by_velocity, data.dt);
    }
}

/// Turns toward the mover's input vector.
///
/// This is how AI steering reaches the ship: the controller stores its
/// desired direction with [`EntityMover::set_input_vector`] and raises the
/// rotate intent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RotateTowardsInput {
    /// Scale the turn rate by the speed ratio.
    #[serde(default)]
    pub affected_by_velocity: bool,
}

impl Action for RotateTowardsInput {
    fn apply(&self, data: &mut ActionData<'_>, active: bool, percentage: f32) {
        if !active || percentage <= 0.0 {
            return;
        }
        let direction = data.mover.input_vector();
        data.mover
            .rotate_towards_vector(&*data.body, direction, self.affected_by_velocity, data.dt);
    }
}

// =============================================================================
// Weapons
// =============================================================================

/// Requests that the ship's guns fire this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FireGunsAction;

impl Action for FireGunsAction {
    fn apply(&self, data: &mut ActionData<'_>, active: bool, percentage: f32) {
        if active && percentage > 0.0 {
            data.fire_requested = true;
        }
    }
}
