//! Per-entity AI state machine.
//!
//! An [`AiController`] walks a shared list of [`BehaviourState`]s. Every
//! frame the simulation asks it to:
//!
//! 1. evaluate the active state's transitions ([`AiController::evaluate`]),
//! 2. compute a steering direction ([`AiController::steer`]),
//! 3. turn that steering into [`AiIntents`] ([`AiController::intents_for`]).
//!
//! Steps 2 and 3 only read the controller, so steering can run for every
//! AI entity in parallel.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::{AiIntent, AiIntents};
use crate::entity::EntityId;
use crate::geometry::{angle_of, delta_angle, direction_from_angle, EPSILON};
use crate::registry::Registry;
use crate::team::Team;

use super::behaviour::{BehaviourInRelationToTarget, MovementBehaviourData, SteeringOutput};
use super::condition::{Condition, ConditionData, ConditionState};

/// Default full width of the firing cone in degrees.
pub const DEFAULT_FIRE_CONE: f32 = 20.0;

/// Targets up to this multiple of the attack range can be fired upon.
pub const FIRE_RANGE_FACTOR: f32 = 1.5;

/// Edge of the state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Predicate that triggers the switch.
    pub condition: Condition,
    /// Index of the state to switch to.
    pub next: usize,
}

/// One node of the state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviourState {
    /// Name used in logs and events.
    pub name: String,
    /// Steering while this state is active.
    pub behaviour: BehaviourInRelationToTarget,
    /// Outgoing transitions, checked in order.
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

/// A behaviour switch performed by [`AiController::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BehaviourSwitch {
    /// State left.
    pub from: usize,
    /// State entered.
    pub to: usize,
}

/// Inputs to transition evaluation that come from outside the controller.
#[derive(Debug, Clone, Copy)]
pub struct ConditionContext<'a> {
    /// The entity being controlled.
    pub self_id: EntityId,
    /// Current simulation time.
    pub now: f32,
    /// Position of the entity.
    pub position: Vec2,
    /// Team of the entity.
    pub team: Team,
    /// Guns on the entity and its children.
    pub gun_count: usize,
    /// Registry for population queries.
    pub registry: &'a Registry,
}

/// AI state machine for one entity.
#[derive(Debug, Clone)]
pub struct AiController {
    states: Arc<[BehaviourState]>,
    current: usize,
    last_change_time: f32,
    first_condition_call: bool,
    condition_states: Vec<Vec<ConditionState>>,
    rng: ChaCha8Rng,
    fire_cone_degrees: f32,
}

impl AiController {
    /// Creates a controller starting in state `0`.
    ///
    /// The random stream for condition rolls is derived from `seed` and the
    /// entity id, so two entities sharing `states` roll independently but
    /// reproducibly. Returns `None` if `states` is empty.
    #[must_use]
    pub fn new(states: Arc<[BehaviourState]>, seed: u64, entity: EntityId) -> Option<Self> {
        if states.is_empty() {
            return None;
        }
        let condition_states = states
            .iter()
            .map(|s| vec![ConditionState::default(); s.transitions.len()])
            .collect();
        Some(Self {
            states,
            current: 0,
            last_change_time: 0.0,
            first_condition_call: true,
            condition_states,
            rng: ChaCha8Rng::seed_from_u64(derive_seed(seed, entity)),
            fire_cone_degrees: DEFAULT_FIRE_CONE,
        })
    }

    /// Sets the full width of the firing cone.
    #[must_use]
    pub fn with_fire_cone(mut self, degrees: f32) -> Self {
        self.fire_cone_degrees = degrees.max(0.0);
        self
    }

    /// Index of the active state.
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current
    }

    /// The active state.
    #[must_use]
    pub fn current_state(&self) -> &BehaviourState {
        &self.states[self.current]
    }

    /// Name of state `index`, if it exists.
    #[must_use]
    pub fn state_name(&self, index: usize) -> Option<&str> {
        self.states.get(index).map(|s| s.name.as_str())
    }

    /// Time the active state was entered.
    #[must_use]
    pub const fn last_change_time(&self) -> f32 {
        self.last_change_time
    }

    /// Checks the active state's transitions and switches on the first one
    /// satisfied.
    pub fn evaluate(&mut self, ctx: &ConditionContext<'_>) -> Option<BehaviourSwitch> {
        let states = Arc::clone(&self.states);
        let state = &states[self.current];
        let data = ConditionData {
            now: ctx.now,
            last_behaviour_change_time: self.last_change_time,
            first_condition_call: self.first_condition_call,
            gun_count: ctx.gun_count,
            position: ctx.position,
            team: ctx.team,
            self_id: ctx.self_id,
            registry: ctx.registry,
        };

        let mut fired = None;
        let slots = &mut self.condition_states[self.current];
        for (transition, slot) in state.transitions.iter().zip(slots.iter_mut()) {
            if transition.condition.is_satisfied(&data, slot, &mut self.rng) {
                fired = Some(transition.next);
                break;
            }
        }
        self.first_condition_call = false;

        let next = fired.filter(|next| *next < states.len())?;
        let switch = BehaviourSwitch {
            from: self.current,
            to: next,
        };
        debug!(
            entity = %ctx.self_id,
            from = %state.name,
            to = %states[next].name,
            "behaviour switched"
        );
        self.current = next;
        self.last_change_time = ctx.now;
        self.first_condition_call = true;
        for slot in &mut self.condition_states[next] {
            *slot = ConditionState::default();
        }
        Some(switch)
    }

    /// Steering for the active state.
    #[must_use]
    pub fn steer(&self, data: &MovementBehaviourData, registry: &Registry) -> SteeringOutput {
        self.current_state().behaviour.desired_direction(data, registry)
    }

    /// Converts steering into intents for an entity facing `facing` degrees.
    ///
    /// Rotation is requested whenever there is a direction to turn to;
    /// thrust scales with how well the facing already matches it. Fire is
    /// requested when the target is within range, inside the cone, and
    /// `line_of_sight` is clear.
    #[must_use]
    pub fn intents_for(
        &self,
        steering: &SteeringOutput,
        facing: f32,
        target_bearing: Option<Vec2>,
        line_of_sight: bool,
    ) -> AiIntents {
        let mut intents = AiIntents::default();
        let steer = steering.direction;
        if steer.length_squared() > EPSILON * EPSILON {
            intents.set(AiIntent::Rotate, 1.0);
            let forward = direction_from_angle(facing);
            intents.set(AiIntent::Thrust, forward.dot(steer.normalize()).max(0.0));
        }

        let behaviour = &self.current_state().behaviour;
        let in_range = steering
            .target_distance
            .is_some_and(|d| d <= behaviour.attack_range * FIRE_RANGE_FACTOR);
        let in_cone = target_bearing.is_some_and(|bearing| {
            delta_angle(facing, angle_of(bearing)).abs() <= self.fire_cone_degrees * 0.5
        });
        if in_range && in_cone && line_of_sight {
            intents.set(AiIntent::Fire, 1.0);
        }
        intents
    }
}

fn derive_seed(seed: u64, entity: EntityId) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    entity.hash(&mut hasher);
    hasher.finish()
}
