use criterion::{black_box, criterion_group, criterion_main, Criterion};
use driftfire_core::ai::{BehaviourInRelationToTarget, MovementBehaviourData};
use driftfire_core::body::Body;
use driftfire_core::config::SimConfig;
use driftfire_core::entity::{EntityCore, EntityId, EntityInner, ObjectCategory, ObstacleComponents};
use driftfire_core::registry::Registry;
use driftfire_core::simulation::Simulation;
use driftfire_core::team::Team;
use glam::Vec2;

/// Registry with a ring of enemies, allies and rocks around the origin.
fn crowded_registry(count: usize) -> Registry {
    let mut registry = Registry::new();
    for i in 0..count {
        let angle = i as f32 * 360.0 / count as f32;
        let radius = 10.0 + (i % 7) as f32 * 6.0;
        let position = driftfire_core::geometry::direction_from_angle(angle) * radius;
        let (team, category) = match i % 3 {
            0 => (Team::new(2), ObjectCategory::Entity),
            1 => (Team::new(1), ObjectCategory::Entity),
            _ => (Team::NEUTRAL, ObjectCategory::Obstacle),
        };
        let id = registry.spawn(
            EntityCore::at(position, team, 1.0).with_body(Body::moving(1.0, -position * 0.1)),
            EntityInner::Obstacle(ObstacleComponents::default()),
        );
        registry.add_object(category, id);
    }
    registry
}

fn bench_desired_direction(c: &mut Criterion) {
    let registry = crowded_registry(200);
    let behaviour = BehaviourInRelationToTarget::default();
    let me = MovementBehaviourData {
        self_id: EntityId::new(u64::MAX),
        position: Vec2::ZERO,
        velocity: Vec2::new(0.0, 4.0),
        team: Team::new(1),
        radius: 1.0,
        parent: None,
    };

    c.bench_function("desired_direction_200", |b| {
        b.iter(|| black_box(behaviour.desired_direction(black_box(&me), &registry)))
    });
}

fn bench_skirmish_step(c: &mut Criterion) {
    let config = SimConfig::from_json(
        r#"{
            "blueprints": {
                "fighter": {
                    "max_hp": 50.0,
                    "bindings": [
                        { "trigger": { "Ai": "Thrust" }, "action": { "type": "Thrust", "force": 20.0 } },
                        { "trigger": { "Ai": "Rotate" }, "action": { "type": "RotateTowardsInput" } }
                    ],
                    "ai": { "states": [ { "name": "hunt", "behaviour": {} } ] }
                }
            },
            "spawners": [
                { "name": "red", "interval": 100.0, "position": [0.0, -40.0], "spread": 20.0,
                  "team": { "id": 1 }, "options": ["fighter"], "waves": 1, "wave_size": 40 },
                { "name": "blue", "interval": 100.0, "position": [0.0, 40.0], "spread": 20.0,
                  "team": { "id": 2 }, "options": ["fighter"], "waves": 1, "wave_size": 40 }
            ]
        }"#,
    )
    .expect("bench config is valid");
    let mut sim = Simulation::from_config(config, 1).expect("simulation builds");
    sim.step();

    c.bench_function("skirmish_step_80", |b| {
        b.iter(|| {
            sim.step();
            black_box(sim.take_events());
        })
    });
}

criterion_group!(benches, bench_desired_direction, bench_skirmish_step);
criterion_main!(benches);
