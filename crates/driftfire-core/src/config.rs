//! Configuration bundles: ship blueprints, spawners and physics settings.
//!
//! A [`SimConfig`] is loaded from JSON with [`SimConfig::from_json`], which
//! parses and then runs [`SimConfig::validate`]. Validation corrects shape
//! mismatches (a spawner's probability list not matching its options) with
//! a warning, and rejects values that cannot be corrected.
//!
//! # Example
//!
//! ```
//! use driftfire_core::config::SimConfig;
//!
//! let json = r#"{
//!     "blueprints": {
//!         "drone": { "max_hp": 20.0, "radius": 0.8 }
//!     },
//!     "spawners": [
//!         { "name": "gate", "interval": 5.0, "options": ["drone"], "probabilities": [1.0, 0.5] }
//!     ]
//! }"#;
//!
//! let config = SimConfig::from_json(json).unwrap();
//! assert_eq!(config.spawners[0].probabilities, vec![1.0]);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::action::{
    Action, ActionTriplet, ControllerKind, EntityInput, FireGunsAction, InputTrigger,
    RotateAction, RotateTowardsCursor, RotateTowardsInput, RotateTowardsMovement, ThrustAction,
};
use crate::ai::controller::DEFAULT_FIRE_CONE;
use crate::ai::{AiController, BehaviourState};
use crate::body::Body;
use crate::damage::DamageCategory;
use crate::entity::{EntityCore, EntityId, Gun, Health, Loadout, ObjectCategory, ShipComponents};
use crate::mover::{EntityMover, MoverConfig};
use crate::resolver::FIXED_DT;
use crate::spawner::SpawnerConfig;
use crate::team::Team;

// =============================================================================
// Errors
// =============================================================================

/// Configuration that cannot be loaded or corrected.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value that must not be negative is.
    #[error("{field} must not be negative (got {value})")]
    NegativeValue {
        /// Path of the offending field.
        field: String,
        /// The rejected value.
        value: f32,
    },

    /// A value that must be strictly positive is not.
    #[error("{field} must be positive (got {value})")]
    NonPositive {
        /// Path of the offending field.
        field: String,
        /// The rejected value.
        value: f32,
    },

    /// A number is NaN or infinite.
    #[error("{field} must be finite")]
    NonFinite {
        /// Path of the offending field.
        field: String,
    },

    /// A spawner has nothing to spawn.
    #[error("spawner `{spawner}` has no blueprint options")]
    EmptySpawnerOptions {
        /// Spawner name.
        spawner: String,
    },

    /// A transition points past the end of its state list.
    #[error("blueprint `{blueprint}` has a transition to missing state {index}")]
    UnknownState {
        /// Blueprint name.
        blueprint: String,
        /// Target index of the transition.
        index: usize,
    },

    /// A spawner names a blueprint that does not exist.
    #[error("spawner `{spawner}` references unknown blueprint `{blueprint}`")]
    UnknownBlueprint {
        /// Spawner name.
        spawner: String,
        /// Missing blueprint name.
        blueprint: String,
    },
}

/// Rejects NaN and infinities.
pub(crate) fn check_finite(field: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite {
            field: field.to_owned(),
        })
    }
}

/// Rejects non-finite and negative values.
pub(crate) fn check_non_negative(field: &str, value: f32) -> Result<(), ConfigError> {
    check_finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::NegativeValue {
            field: field.to_owned(),
            value,
        });
    }
    Ok(())
}

/// Rejects non-finite values and anything `<= 0`.
pub(crate) fn check_positive(field: &str, value: f32) -> Result<(), ConfigError> {
    check_finite(field, value)?;
    if value <= 0.0 {
        return Err(ConfigError::NonPositive {
            field: field.to_owned(),
            value,
        });
    }
    Ok(())
}

// =============================================================================
// Actions and bindings
// =============================================================================

/// Serializable form of a bindable action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActionConfig {
    /// [`ThrustAction`].
    Thrust(ThrustAction),
    /// [`RotateAction`].
    Rotate(RotateAction),
    /// [`RotateTowardsCursor`].
    RotateTowardsCursor(RotateTowardsCursor),
    /// [`RotateTowardsMovement`].
    RotateTowardsMovement(RotateTowardsMovement),
    /// [`RotateTowardsInput`].
    RotateTowardsInput(RotateTowardsInput),
    /// [`FireGunsAction`].
    FireGuns,
}

impl ActionConfig {
    /// Builds the action, or `None` if its parameters are unusable.
    #[must_use]
    pub fn build(&self) -> Option<Arc<dyn Action>> {
        match *self {
            Self::Thrust(thrust) => (thrust.force.is_finite() && thrust.direction.is_finite())
                .then(|| Arc::new(thrust) as Arc<dyn Action>),
            Self::Rotate(rotate) => rotate
                .degrees_per_second
                .is_finite()
                .then(|| Arc::new(rotate) as Arc<dyn Action>),
            Self::RotateTowardsCursor(action) => Some(Arc::new(action)),
            Self::RotateTowardsMovement(action) => action
                .min_speed_to_activate
                .is_finite()
                .then(|| Arc::new(action) as Arc<dyn Action>),
            Self::RotateTowardsInput(action) => Some(Arc::new(action)),
            Self::FireGuns => Some(Arc::new(FireGunsAction)),
        }
    }
}

/// Serializable form of an [`ActionTriplet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingConfig {
    /// What activates the binding.
    pub trigger: InputTrigger,
    /// Action to run. Missing or unbuildable actions are dropped when the
    /// ship is assembled.
    #[serde(default)]
    pub action: Option<ActionConfig>,
    /// Controllers allowed to drive the binding. Empty means any.
    #[serde(default)]
    pub controllers: Vec<ControllerKind>,
}

impl BindingConfig {
    /// Builds the runtime triplet.
    #[must_use]
    pub fn to_triplet(&self) -> ActionTriplet {
        let action = self.action.as_ref().and_then(ActionConfig::build);
        if self.action.is_some() && action.is_none() {
            warn!(trigger = ?self.trigger, "action parameters invalid");
        }
        ActionTriplet {
            trigger: self.trigger,
            action,
            controllers: self.controllers.clone(),
        }
    }
}

// =============================================================================
// Blueprints
// =============================================================================

/// AI section of a blueprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    /// Behaviour states; the first one is active on spawn.
    pub states: Vec<BehaviourState>,
    /// Full width of the firing cone in degrees.
    #[serde(default = "default_fire_cone")]
    pub fire_cone: f32,
}

fn default_fire_cone() -> f32 {
    DEFAULT_FIRE_CONE
}

/// Everything needed to assemble one kind of ship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipBlueprint {
    /// Collision and ship-size radius.
    #[serde(default = "default_radius")]
    pub radius: f32,
    /// Body mass.
    #[serde(default = "default_mass")]
    pub mass: f32,
    /// Fraction of velocity lost per second.
    #[serde(default)]
    pub linear_drag: f32,
    /// Hit points on spawn.
    pub max_hp: f32,
    /// Damage immunity per category, in `[0, 1]`.
    #[serde(default)]
    pub immunities: BTreeMap<DamageCategory, f32>,
    /// Speed and turn limits.
    #[serde(default)]
    pub mover: MoverConfig,
    /// Who drives the ship.
    #[serde(default = "default_controller")]
    pub controller: ControllerKind,
    /// Input bindings.
    #[serde(default)]
    pub bindings: Vec<BindingConfig>,
    /// State machine for AI-controlled ships.
    #[serde(default)]
    pub ai: Option<AiConfig>,
    /// Mounted guns.
    #[serde(default)]
    pub guns: Vec<Gun>,
    /// Registry categories the ship is listed under.
    #[serde(default = "default_categories")]
    pub categories: Vec<ObjectCategory>,
}

fn default_radius() -> f32 {
    1.0
}

fn default_mass() -> f32 {
    1.0
}

fn default_controller() -> ControllerKind {
    ControllerKind::Ai
}

fn default_categories() -> Vec<ObjectCategory> {
    vec![ObjectCategory::Entity, ObjectCategory::Ship]
}

impl ShipBlueprint {
    /// Checks every value that cannot be corrected.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let field = |f: &str| format!("blueprints.{name}.{f}");
        check_non_negative(&field("radius"), self.radius)?;
        check_non_negative(&field("mass"), self.mass)?;
        check_non_negative(&field("linear_drag"), self.linear_drag)?;
        check_positive(&field("max_hp"), self.max_hp)?;
        for (category, immunity) in &self.immunities {
            check_finite(&field(&format!("immunities.{category:?}")), *immunity)?;
        }

        check_finite(&field("mover.max_speed"), self.mover.max_speed)?;
        check_finite(&field("mover.min_speed"), self.mover.min_speed)?;
        check_non_negative(&field("mover.max_turning_speed"), self.mover.max_turning_speed)?;
        check_non_negative(&field("mover.drift_factor"), self.mover.drift_factor)?;

        for (index, gun) in self.guns.iter().enumerate() {
            let gun_field = |f: &str| field(&format!("guns[{index}].{f}"));
            check_non_negative(&gun_field("reload_time"), gun.reload_time)?;
            check_finite(&gun_field("projectile.speed"), gun.projectile.speed)?;
            check_non_negative(&gun_field("projectile.radius"), gun.projectile.radius)?;
            check_non_negative(&gun_field("projectile.max_age"), gun.projectile.max_age)?;
            for amount in gun.projectile.payload.amounts.values() {
                check_non_negative(&gun_field("projectile.payload"), *amount)?;
            }
        }

        if let Some(ai) = &self.ai {
            check_non_negative(&field("ai.fire_cone"), ai.fire_cone)?;
            for state in &ai.states {
                let state_field = |f: &str| field(&format!("ai.{}.{f}", state.name));
                let behaviour = &state.behaviour;
                check_non_negative(&state_field("chase_range"), behaviour.chase_range)?;
                check_non_negative(&state_field("attack_range"), behaviour.attack_range)?;
                check_non_negative(&state_field("avoid_range"), behaviour.avoid_range)?;
                check_finite(&state_field("projectile_avoidance"), behaviour.projectile_avoidance)?;
                check_finite(&state_field("entity_avoidance"), behaviour.entity_avoidance)?;
                for transition in &state.transitions {
                    if transition.next >= ai.states.len() {
                        return Err(ConfigError::UnknownState {
                            blueprint: name.to_owned(),
                            index: transition.next,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Builds the shared runtime parts of this blueprint.
    #[must_use]
    pub fn prepare(&self) -> PreparedBlueprint {
        let states = self
            .ai
            .as_ref()
            .filter(|ai| !ai.states.is_empty())
            .map(|ai| Arc::from(ai.states.clone()));
        PreparedBlueprint {
            triplets: self.bindings.iter().map(BindingConfig::to_triplet).collect(),
            states,
            blueprint: self.clone(),
        }
    }
}

/// A validated blueprint with its actions and AI states built once.
#[derive(Debug, Clone)]
pub struct PreparedBlueprint {
    blueprint: ShipBlueprint,
    triplets: Vec<ActionTriplet>,
    states: Option<Arc<[BehaviourState]>>,
}

impl PreparedBlueprint {
    /// The source blueprint.
    #[must_use]
    pub fn blueprint(&self) -> &ShipBlueprint {
        &self.blueprint
    }

    /// Registry categories for spawned ships.
    #[must_use]
    pub fn categories(&self) -> &[ObjectCategory] {
        &self.blueprint.categories
    }

    /// Shared entity state for a ship at `position`.
    #[must_use]
    pub fn core(&self, position: Vec2, rotation: f32, team: Team) -> EntityCore {
        let bp = &self.blueprint;
        EntityCore::at(position, team, bp.radius)
            .facing(rotation)
            .with_body(Body {
                mass: bp.mass,
                linear_drag: bp.linear_drag,
                ..Body::default()
            })
    }

    /// Ship components without an AI controller.
    #[must_use]
    pub fn components(&self, rotation: f32) -> ShipComponents {
        let bp = &self.blueprint;
        let health = bp
            .immunities
            .iter()
            .fold(Health::new(bp.max_hp), |health, (&category, &immunity)| {
                health.with_immunity(category, immunity)
            });
        ShipComponents::new(
            EntityMover::new(bp.mover, rotation),
            EntityInput::new(bp.controller, self.triplets.clone()),
            health,
            Loadout {
                guns: bp.guns.clone(),
            },
        )
    }

    /// AI controller for the ship with id `entity`, if the blueprint is AI
    /// driven and has states.
    #[must_use]
    pub fn controller(&self, seed: u64, entity: EntityId) -> Option<AiController> {
        if self.blueprint.controller != ControllerKind::Ai {
            return None;
        }
        let states = self.states.as_ref()?;
        let fire_cone = self
            .blueprint
            .ai
            .as_ref()
            .map_or(DEFAULT_FIRE_CONE, |ai| ai.fire_cone);
        AiController::new(Arc::clone(states), seed, entity).map(|ai| ai.with_fire_cone(fire_cone))
    }
}

// =============================================================================
// Simulation config
// =============================================================================

/// Physics settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Fixed physics timestep in seconds.
    pub dt: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self { dt: FIXED_DT }
    }
}

/// A complete simulation setup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Ship blueprints by name.
    #[serde(default)]
    pub blueprints: BTreeMap<String, ShipBlueprint>,
    /// Spawners, started when the simulation is built.
    #[serde(default)]
    pub spawners: Vec<SpawnerConfig>,
    /// Physics settings.
    #[serde(default)]
    pub physics: PhysicsConfig,
}

impl SimConfig {
    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON, or the first
    /// validation failure.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration, correcting what can be corrected.
    ///
    /// # Errors
    ///
    /// Returns the first value that cannot be corrected.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        check_positive("physics.dt", self.physics.dt)?;
        for (name, blueprint) in &self.blueprints {
            blueprint.validate(name)?;
        }
        for spawner in &mut self.spawners {
            spawner.validate()?;
            if let Some(missing) = spawner
                .options
                .iter()
                .find(|option| !self.blueprints.contains_key(*option))
            {
                return Err(ConfigError::UnknownBlueprint {
                    spawner: spawner.name.clone(),
                    blueprint: missing.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::Condition;

    fn drone() -> ShipBlueprint {
        serde_json::from_str(r#"{ "max_hp": 10.0 }"#).unwrap()
    }

    mod blueprint_tests {
        use super::*;

        #[test]
        fn defaults_fill_missing_fields() {
            let bp = drone();
            assert_eq!(bp.radius, 1.0);
            assert_eq!(bp.controller, ControllerKind::Ai);
            assert_eq!(
                bp.categories,
                vec![ObjectCategory::Entity, ObjectCategory::Ship]
            );
            assert!(bp.validate("drone").is_ok());
        }

        #[test]
        fn negative_radius_rejected() {
            let mut bp = drone();
            bp.radius = -1.0;
            let err = bp.validate("drone").unwrap_err();
            assert!(matches!(err, ConfigError::NegativeValue { ref field, .. } if field == "blueprints.drone.radius"));
        }

        #[test]
        fn nan_rejected() {
            let mut bp = drone();
            bp.mover.max_speed = f32::NAN;
            assert!(matches!(
                bp.validate("drone"),
                Err(ConfigError::NonFinite { .. })
            ));
        }

        #[test]
        fn dangling_transition_rejected() {
            let mut bp = drone();
            bp.ai = Some(AiConfig {
                states: vec![BehaviourState {
                    name: "idle".into(),
                    behaviour: crate::ai::BehaviourInRelationToTarget::default(),
                    transitions: vec![crate::ai::Transition {
                        condition: Condition::NoGunsLeft,
                        next: 3,
                    }],
                }],
                fire_cone: DEFAULT_FIRE_CONE,
            });
            assert!(matches!(
                bp.validate("drone"),
                Err(ConfigError::UnknownState { index: 3, .. })
            ));
        }

        #[test]
        fn invalid_action_dropped_from_input() {
            let mut bp = drone();
            bp.controller = ControllerKind::Player;
            bp.bindings = vec![
                BindingConfig {
                    trigger: InputTrigger::Always,
                    action: Some(ActionConfig::Rotate(RotateAction {
                        degrees_per_second: f32::INFINITY,
                        affected_by_velocity: false,
                    })),
                    controllers: Vec::new(),
                },
                BindingConfig {
                    trigger: InputTrigger::Always,
                    action: Some(ActionConfig::FireGuns),
                    controllers: Vec::new(),
                },
                BindingConfig {
                    trigger: InputTrigger::Always,
                    action: None,
                    controllers: Vec::new(),
                },
            ];
            let ship = bp.prepare().components(0.0);
            assert_eq!(ship.input.len(), 1);
        }

        #[test]
        fn player_blueprint_gets_no_controller() {
            let mut bp: ShipBlueprint = serde_json::from_str(
                r#"{
                    "max_hp": 10.0,
                    "controller": "Player",
                    "ai": { "states": [ { "name": "idle", "behaviour": {} } ] }
                }"#,
            )
            .unwrap();
            let prepared = bp.prepare();
            assert!(prepared.controller(1, EntityId::new(1)).is_none());

            bp.controller = ControllerKind::Ai;
            let ai = bp.prepare().controller(1, EntityId::new(1)).unwrap();
            assert_eq!(ai.current_state().name, "idle");
        }

        #[test]
        fn immunities_carry_into_health() {
            let mut bp = drone();
            bp.immunities.insert(DamageCategory::Energy, 0.75);
            let ship = bp.prepare().components(0.0);
            assert_eq!(ship.health.immunity(DamageCategory::Energy), 0.75);
            assert_eq!(ship.health.hp, 10.0);
        }
    }

    mod action_tests {
        use super::*;

        #[test]
        fn actions_parse_by_type_tag() {
            let json = r#"[
                { "type": "Thrust", "force": 5.0 },
                { "type": "Rotate", "degrees_per_second": -90.0 },
                { "type": "RotateTowardsMovement", "min_speed_to_activate": 1.0 },
                { "type": "FireGuns" }
            ]"#;
            let actions: Vec<ActionConfig> = serde_json::from_str(json).unwrap();
            assert_eq!(
                actions[0],
                ActionConfig::Thrust(ThrustAction {
                    force: 5.0,
                    direction: Vec2::Y,
                })
            );
            assert!(actions.iter().all(|a| a.build().is_some()));
        }

        #[test]
        fn non_finite_thrust_does_not_build() {
            let action = ActionConfig::Thrust(ThrustAction {
                force: f32::NAN,
                direction: Vec2::Y,
            });
            assert!(action.build().is_none());
        }
    }

    mod sim_config_tests {
        use super::*;

        #[test]
        fn parse_error_surfaces() {
            assert!(matches!(
                SimConfig::from_json("{ not json"),
                Err(ConfigError::Parse(_))
            ));
        }

        #[test]
        fn unknown_blueprint_rejected() {
            let json = r#"{
                "spawners": [ { "name": "gate", "interval": 1.0, "options": ["ghost"] } ]
            }"#;
            let err = SimConfig::from_json(json).unwrap_err();
            assert!(matches!(err, ConfigError::UnknownBlueprint { ref blueprint, .. } if blueprint == "ghost"));
            assert!(err.to_string().contains("ghost"));
        }

        #[test]
        fn zero_timestep_rejected() {
            let json = r#"{ "physics": { "dt": 0.0 } }"#;
            assert!(matches!(
                SimConfig::from_json(json),
                Err(ConfigError::NonPositive { .. })
            ));
        }

        #[test]
        fn empty_config_uses_fixed_dt() {
            let config = SimConfig::from_json("{}").unwrap();
            assert_eq!(config.physics.dt, FIXED_DT);
            assert!(config.blueprints.is_empty());
        }
    }
}
