//! Test helper functions for setting up simulations and entities.
//!
//! This module provides blueprint fixtures, factory functions and state
//! getters that make writing tests more ergonomic and consistent.

use glam::Vec2;

use crate::config::{ShipBlueprint, SimConfig};
use crate::entity::{EntityId, ObjectCategory};
use crate::simulation::Simulation;
use crate::team::Team;

// =============================================================================
// Logging
// =============================================================================

/// Routes `tracing` output through the test harness.
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

// =============================================================================
// Blueprint Fixtures
// =============================================================================

/// An AI fighter: chases the closest enemy, fires when lined up, and flees
/// once it has no guns.
pub const FIGHTER_JSON: &str = r#"{
    "radius": 1.0,
    "mass": 1.0,
    "max_hp": 20.0,
    "mover": { "max_speed": 8.0, "min_speed": 0.0, "max_turning_speed": 180.0, "drift_factor": 0.5 },
    "bindings": [
        { "trigger": { "Ai": "Thrust" }, "action": { "type": "Thrust", "force": 20.0 } },
        { "trigger": { "Ai": "Rotate" }, "action": { "type": "RotateTowardsInput" } },
        { "trigger": { "Ai": "Fire" }, "action": { "type": "FireGuns" } }
    ],
    "guns": [
        {
            "reload_time": 0.5,
            "muzzle": [0.0, 1.5],
            "projectile": {
                "speed": 20.0,
                "radius": 0.2,
                "max_age": 2.0,
                "payload": { "amounts": { "Physical": 5.0 } }
            }
        }
    ],
    "ai": {
        "states": [
            {
                "name": "hunt",
                "behaviour": { "chase_range": 200.0, "attack_range": 8.0 },
                "transitions": [ { "condition": { "kind": "NoGunsLeft" }, "next": 1 } ]
            },
            {
                "name": "flee",
                "behaviour": { "chase_range": 200.0, "movement_mode": "Avoiding" }
            }
        ]
    }
}"#;

/// The fighter blueprint.
pub fn fighter() -> ShipBlueprint {
    serde_json::from_str(FIGHTER_JSON).expect("fighter fixture parses")
}

/// A fighter that cannot move: zero speed limits, same guns and AI.
pub fn turret() -> ShipBlueprint {
    let mut blueprint = fighter();
    blueprint.mover.max_speed = 0.0;
    blueprint.mover.min_speed = 0.0;
    blueprint
}

/// A fighter with its guns removed.
pub fn unarmed() -> ShipBlueprint {
    let mut blueprint = fighter();
    blueprint.guns.clear();
    blueprint
}

/// A player-controlled hull with no bindings: it only sits there.
pub fn target_hull(max_hp: f32) -> ShipBlueprint {
    let mut blueprint: ShipBlueprint =
        serde_json::from_str(r#"{ "controller": "Player", "max_hp": 1.0 }"#)
            .expect("hull fixture parses");
    blueprint.max_hp = max_hp;
    blueprint
}

/// A skirmish: two fighter spawners on opposing teams, 60 units apart.
pub fn skirmish_config() -> SimConfig {
    let json = format!(
        r#"{{
            "blueprints": {{ "fighter": {FIGHTER_JSON} }},
            "spawners": [
                {{
                    "name": "red", "interval": 1.5, "position": [0.0, -30.0], "spread": 8.0,
                    "team": {{ "id": 1 }}, "options": ["fighter"], "waves": 3, "wave_size": 2
                }},
                {{
                    "name": "blue", "interval": 1.5, "position": [0.0, 30.0], "spread": 8.0,
                    "rotation": 180.0, "team": {{ "id": 2 }}, "options": ["fighter"],
                    "waves": 3, "wave_size": 2
                }}
            ]
        }}"#
    );
    SimConfig::from_json(&json).expect("skirmish fixture is valid")
}

// =============================================================================
// Test Scenario Setup
// =============================================================================

/// A simulation with the fixture blueprints registered as `fighter`,
/// `turret`, `unarmed` and `hull`.
pub fn sim_with_fixtures(seed: u64) -> Simulation {
    let mut sim = Simulation::new(seed);
    sim.add_blueprint("fighter", fighter()).expect("fighter is valid");
    sim.add_blueprint("turret", turret()).expect("turret is valid");
    sim.add_blueprint("unarmed", unarmed()).expect("unarmed is valid");
    sim.add_blueprint("hull", target_hull(10.0)).expect("hull is valid");
    sim
}

/// Spawns a registered blueprint, panicking if the name is unknown.
pub fn spawn(sim: &mut Simulation, name: &str, position: Vec2, rotation: f32, team: u8) -> EntityId {
    sim.spawn_blueprint(name, position, rotation, Team::new(team))
        .unwrap_or_else(|| panic!("blueprint {name} registered"))
}

// =============================================================================
// State Getters
// =============================================================================

/// Position of an entity.
pub fn get_position(sim: &Simulation, id: EntityId) -> Option<Vec2> {
    sim.entity(id).map(|e| e.position())
}

/// Velocity of an entity.
pub fn get_velocity(sim: &Simulation, id: EntityId) -> Option<Vec2> {
    sim.entity(id).map(|e| e.velocity())
}

/// Current hit points of an entity.
pub fn get_hp(sim: &Simulation, id: EntityId) -> Option<f32> {
    sim.entity(id).and_then(|e| e.health()).map(|h| h.hp)
}

/// Returns `true` once the entity has left the registry.
pub fn is_destroyed(sim: &Simulation, id: EntityId) -> bool {
    sim.entity(id).is_none()
}

/// Number of live ships.
pub fn ship_count(sim: &Simulation) -> usize {
    sim.registry().object_count(ObjectCategory::Ship)
}

/// Per-entity state used to compare two runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Entity id.
    pub id: u64,
    /// Position.
    pub position: Vec2,
    /// Facing in degrees.
    pub rotation: f32,
    /// Velocity.
    pub velocity: Vec2,
    /// Hit points, if any.
    pub hp: Option<f32>,
}

/// Captures every live entity in id order.
pub fn snapshot(sim: &Simulation) -> Vec<Snapshot> {
    sim.registry()
        .entities_sorted()
        .map(|e| Snapshot {
            id: e.id().as_u64(),
            position: e.position(),
            rotation: e.transform.rotation,
            velocity: e.velocity(),
            hp: e.health().map(|h| h.hp),
        })
        .collect()
}
