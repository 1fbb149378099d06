//! Integration tests for the full simulation pipeline.
//!
//! These tests drive the simulation end-to-end through its public surface:
//! - Entity lifecycle (spawn, step, despawn, expiry)
//! - AI frame phase -> intents -> physics phase
//! - Combat (projectiles, damage, kills and kill credit)
//! - Spawner waves from a configuration bundle
//! - Player input

use std::sync::Arc;

use glam::Vec2;

use crate::action::{
    ActionTriplet, ControllerKind, EntityInput, InputState, InputTrigger, Key, ThrustAction,
};
use crate::body::Body;
use crate::damage::{DamageCategory, DamagePayload};
use crate::entity::{
    EntityCore, Health, Loadout, ObjectCategory, ObstacleComponents, ProjectileSpec,
    ShipComponents,
};
use crate::event::{DestroyCause, SimEvent};
use crate::mover::{EntityMover, MoverConfig};
use crate::resolver::ProjectileLaunch;
use crate::simulation::Simulation;
use crate::team::Team;

use super::helpers::{
    get_hp, get_position, get_velocity, init_tracing, is_destroyed, ship_count, sim_with_fixtures,
    skirmish_config, spawn,
};

// =============================================================================
// AI
// =============================================================================

#[test]
fn test_fighters_close_distance() {
    init_tracing();
    let mut sim = sim_with_fixtures(1);
    let red = spawn(&mut sim, "fighter", Vec2::ZERO, 0.0, 1);
    let blue = spawn(&mut sim, "fighter", Vec2::new(0.0, 60.0), 180.0, 2);

    sim.run(60);

    let gap = get_position(&sim, red)
        .zip(get_position(&sim, blue))
        .map(|(a, b)| a.distance(b));
    assert!(gap.is_some_and(|d| d < 55.0), "gap was {gap:?}");
    assert!(get_velocity(&sim, red).is_some_and(|v| v.y > 0.0));
}

#[test]
fn test_unarmed_ship_switches_to_flee() {
    init_tracing();
    let mut sim = sim_with_fixtures(1);
    let ship = spawn(&mut sim, "unarmed", Vec2::ZERO, 0.0, 1);
    sim.take_events();

    sim.step();

    let events = sim.take_events();
    assert!(events.contains(&SimEvent::BehaviourSwitched {
        entity: ship,
        from: "hunt".into(),
        to: "flee".into(),
    }));
    let state = sim
        .entity(ship)
        .and_then(|e| e.as_ship())
        .and_then(|s| s.ai.as_ref())
        .map(|ai| ai.current_state().name.clone());
    assert_eq!(state.as_deref(), Some("flee"));
}

#[test]
fn test_armed_ship_keeps_hunting() {
    let mut sim = sim_with_fixtures(1);
    let ship = spawn(&mut sim, "fighter", Vec2::ZERO, 0.0, 1);

    sim.run(30);

    assert!(!sim
        .take_events()
        .iter()
        .any(|e| matches!(e, SimEvent::BehaviourSwitched { entity, .. } if *entity == ship)));
}

// =============================================================================
// Combat
// =============================================================================

#[test]
fn test_turret_kills_target_with_credit() {
    init_tracing();
    let mut sim = sim_with_fixtures(3);
    let turret = spawn(&mut sim, "turret", Vec2::ZERO, 0.0, 1);
    let target = spawn(&mut sim, "hull", Vec2::new(0.0, 10.0), 0.0, 2);

    sim.run(180);

    assert!(is_destroyed(&sim, target));
    assert!(!is_destroyed(&sim, turret));
    let events = sim.take_events();
    assert!(events.contains(&SimEvent::EntityDestroyed {
        entity: target,
        cause: DestroyCause::Killed,
        killer: Some(turret),
    }));
    let hits = events
        .iter()
        .filter(|e| matches!(e, SimEvent::DamageDealt { target: t, dealer, .. } if *t == target && *dealer == turret))
        .count();
    assert_eq!(hits, 2);
    assert_eq!(sim.registry().object_count(ObjectCategory::Entity), 1);
}

#[test]
fn test_turret_holds_fire_on_allies() {
    let mut sim = sim_with_fixtures(3);
    spawn(&mut sim, "turret", Vec2::ZERO, 0.0, 1);
    let friend = spawn(&mut sim, "hull", Vec2::new(0.0, 10.0), 0.0, 1);

    sim.run(60);

    assert_eq!(get_hp(&sim, friend), Some(10.0));
    assert_eq!(sim.registry().object_count(ObjectCategory::Projectile), 0);
}

#[test]
fn test_wall_blocks_line_of_fire() {
    let mut sim = sim_with_fixtures(3);
    spawn(&mut sim, "turret", Vec2::ZERO, 0.0, 1);
    let target = spawn(&mut sim, "hull", Vec2::new(0.0, 10.0), 0.0, 2);
    sim.spawn_obstacle(
        EntityCore::at(Vec2::new(0.0, 5.0), Team::NEUTRAL, 1.0),
        ObstacleComponents::default(),
        &[ObjectCategory::Obstacle, ObjectCategory::Indestructible],
    );

    sim.run(120);

    assert_eq!(get_hp(&sim, target), Some(10.0));
    assert_eq!(sim.registry().object_count(ObjectCategory::Projectile), 0);
}

#[test]
fn test_projectile_expires_and_cleans_up() {
    let mut sim = Simulation::new(1);
    let shot = sim.spawn_projectile(ProjectileLaunch {
        shooter: None,
        team: Team::new(1),
        position: Vec2::ZERO,
        rotation: 0.0,
        velocity: Vec2::new(0.0, 5.0),
        spec: ProjectileSpec {
            speed: 5.0,
            radius: 0.1,
            max_age: 0.5,
            payload: DamagePayload::single(DamageCategory::Energy, 1.0),
        },
    });
    assert_eq!(sim.pending_tasks(), 1);

    sim.run(40);

    assert!(is_destroyed(&sim, shot));
    assert_eq!(sim.pending_tasks(), 0);
    assert_eq!(sim.registry().object_count(ObjectCategory::Projectile), 0);
    assert!(sim.take_events().contains(&SimEvent::EntityDestroyed {
        entity: shot,
        cause: DestroyCause::Expired,
        killer: None,
    }));
}

#[test]
fn test_despawn_cancels_projectile_expiry() {
    let mut sim = Simulation::new(1);
    let shot = sim.spawn_projectile(ProjectileLaunch {
        shooter: None,
        team: Team::new(1),
        position: Vec2::ZERO,
        rotation: 0.0,
        velocity: Vec2::ZERO,
        spec: ProjectileSpec {
            speed: 0.0,
            radius: 0.1,
            max_age: 5.0,
            payload: DamagePayload::single(DamageCategory::Energy, 1.0),
        },
    });

    assert!(sim.despawn(shot));
    assert_eq!(sim.pending_tasks(), 0);
}

// =============================================================================
// Spawners
// =============================================================================

#[test]
fn test_spawner_waves_from_config() {
    init_tracing();
    let json = format!(
        r#"{{
            "blueprints": {{ "drone": {} }},
            "spawners": [
                {{ "name": "gate", "interval": 1.0, "options": ["drone"], "waves": 3, "wave_size": 2,
                   "spread": 5.0, "team": {{ "id": 2 }} }}
            ]
        }}"#,
        serde_json::to_string(&super::helpers::unarmed()).expect("blueprint serializes")
    );
    let config = crate::config::SimConfig::from_json(&json).expect("config is valid");
    let mut sim = Simulation::from_config(config, 9).expect("simulation builds");

    sim.run(200);

    assert_eq!(ship_count(&sim), 6);
    assert_eq!(sim.spawners()[0].waves_spawned(), 3);
    assert_eq!(sim.pending_tasks(), 0);
    assert!(sim
        .registry()
        .entities_sorted()
        .all(|e| e.team == Team::new(2)));
}

#[test]
fn test_skirmish_spawns_both_sides_and_fires() {
    init_tracing();
    let mut sim = Simulation::from_config(skirmish_config(), 21).expect("simulation builds");

    sim.run(1200);

    let events = sim.take_events();
    let spawned = events
        .iter()
        .filter(|e| matches!(e, SimEvent::Spawned { tag: crate::entity::EntityTag::Ship, .. }))
        .count();
    assert_eq!(spawned, 12);
    assert!(events
        .iter()
        .any(|e| matches!(e, SimEvent::Spawned { tag: crate::entity::EntityTag::Projectile, .. })));
    assert!(ship_count(&sim) <= 12);
}

// =============================================================================
// Player Input
// =============================================================================

#[test]
fn test_player_thrust_key() {
    let mut sim = Simulation::new(1);
    let thrust = ActionTriplet::new(
        InputTrigger::Key(Key::W),
        Arc::new(ThrustAction {
            force: 10.0,
            direction: Vec2::Y,
        }),
    )
    .for_controllers(&[ControllerKind::Player]);
    let ship = sim.spawn_ship(
        EntityCore::at(Vec2::ZERO, Team::new(1), 1.0).with_body(Body::with_mass(1.0)),
        ShipComponents::new(
            EntityMover::new(MoverConfig::default(), 0.0),
            EntityInput::new(ControllerKind::Player, vec![thrust]),
            Health::new(10.0),
            Loadout::default(),
        ),
        &[ObjectCategory::Entity, ObjectCategory::Ship],
    );

    sim.run(10);
    assert_eq!(get_velocity(&sim, ship), Some(Vec2::ZERO));

    sim.set_input(InputState::default().with_key(Key::W));
    sim.run(30);

    let velocity = get_velocity(&sim, ship).unwrap_or_default();
    assert!(velocity.y > 0.0);
    assert!(velocity.y <= MoverConfig::default().max_speed + 1e-3);
    assert!(velocity.x.abs() < 1e-4);
}
