//! Simulation module with the two-phase execution loop.
//!
//! The `Simulation` struct owns the registry, the task queue, the event log
//! and the resolvers, and drives them through two phases:
//!
//! 1. **FRAME** ([`Simulation::step_frame`]): AI transition conditions are
//!    evaluated sequentially, then steering for every AI ship is computed in
//!    parallel over the frozen registry and applied in id order
//! 2. **PHYSICS** ([`Simulation::step_physics`]): due tasks fire (expiry,
//!    spawner waves), then the resolvers run in order: physics, combat
//!
//! # Determinism
//!
//! The simulation guarantees deterministic execution:
//! - Steering is computed in parallel but applied sorted by entity id
//! - Entities are iterated in id order (via `BTreeMap`)
//! - Spawner rolls come from one `ChaCha8Rng` seeded from the master seed;
//!   condition rolls come from per-entity streams derived from it
//!
//! # Example
//!
//! ```
//! use driftfire_core::config::ShipBlueprint;
//! use driftfire_core::simulation::Simulation;
//! use driftfire_core::team::Team;
//! use glam::Vec2;
//!
//! let mut sim = Simulation::new(42);
//! let blueprint: ShipBlueprint = serde_json::from_str(r#"{ "max_hp": 10.0 }"#).unwrap();
//! sim.add_blueprint("drone", blueprint).unwrap();
//!
//! let drone = sim.spawn_blueprint("drone", Vec2::ZERO, 0.0, Team::new(1));
//! assert!(drone.is_some());
//!
//! for _ in 0..10 {
//!     sim.step();
//! }
//!
//! assert_eq!(sim.tick(), 10);
//! ```

use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace, warn};

use crate::action::{AiIntents, InputState};
use crate::ai::{ConditionContext, MovementBehaviourData};
use crate::collision::{ContactSource, OverlapContacts};
use crate::config::{check_positive, ConfigError, PreparedBlueprint, ShipBlueprint, SimConfig};
use crate::entity::{
    Entity, EntityCore, EntityId, EntityInner, EntityTag, ObjectCategory, ObstacleComponents,
    ShipComponents,
};
use crate::event::{DestroyCause, EventLog, SimEvent};
use crate::geometry::has_line_of_sight;
use crate::registry::Registry;
use crate::resolver::{
    destroy_entity, launch_projectile, CombatResolver, PhysicsResolver, ProjectileLaunch,
    ResolveContext, Resolver, FIXED_DT,
};
use crate::scheduler::{TaskKind, TaskQueue};
use crate::spawner::{Spawner, SpawnerConfig};
use crate::team::Team;

// =============================================================================
// Simulation
// =============================================================================

/// Steering result for one AI ship, produced in the parallel phase.
#[derive(Debug, Clone, Copy)]
struct SteeringPlan {
    entity: EntityId,
    direction: Vec2,
    intents: AiIntents,
}

/// The main simulation orchestrator.
///
/// `Simulation` manages:
/// - The registry of live entities and their categories
/// - The task queue for expiry and spawner waves
/// - Prepared blueprints and running spawners
/// - Resolvers for the physics phase
/// - The event log drained by presentation layers
pub struct Simulation {
    registry: Registry,
    tasks: TaskQueue,
    events: EventLog,
    blueprints: BTreeMap<String, PreparedBlueprint>,
    spawners: Vec<Spawner>,
    /// Resolvers run in order each physics step.
    resolvers: Vec<Box<dyn Resolver>>,
    contacts: Arc<dyn ContactSource>,
    input: InputState,
    dt: f32,
    time: f32,
    tick: u64,
    /// Master seed for spawner rolls and per-entity AI streams.
    master_seed: u64,
    rng: ChaCha8Rng,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("registry", &self.registry)
            .field("tasks", &self.tasks)
            .field("blueprints", &self.blueprints.keys().collect::<Vec<_>>())
            .field("spawners", &self.spawners.len())
            .field("resolvers", &format!("[{} resolvers]", self.resolvers.len()))
            .field("contacts", &self.contacts)
            .field("time", &self.time)
            .field("tick", &self.tick)
            .field("master_seed", &self.master_seed)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Creates an empty simulation with the default fixed timestep.
    ///
    /// # Example
    ///
    /// ```
    /// use driftfire_core::simulation::Simulation;
    ///
    /// let sim = Simulation::new(12345);
    /// assert_eq!(sim.tick(), 0);
    /// assert_eq!(sim.seed(), 12345);
    /// ```
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_dt(seed, FIXED_DT)
    }

    /// Creates an empty simulation with a custom physics timestep.
    #[must_use]
    pub fn with_dt(seed: u64, dt: f32) -> Self {
        let contacts: Arc<dyn ContactSource> = Arc::new(OverlapContacts);
        Self {
            registry: Registry::new(),
            tasks: TaskQueue::new(),
            events: EventLog::new(),
            blueprints: BTreeMap::new(),
            spawners: Vec::new(),
            resolvers: Self::default_resolvers(dt, Arc::clone(&contacts)),
            contacts,
            input: InputState::default(),
            dt,
            time: 0.0,
            tick: 0,
            master_seed: seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Builds a simulation from a configuration bundle.
    ///
    /// The config is validated first; spawners start immediately.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn from_config(mut config: SimConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut sim = Self::with_dt(seed, config.physics.dt);
        sim.blueprints = config
            .blueprints
            .iter()
            .map(|(name, blueprint)| (name.clone(), blueprint.prepare()))
            .collect();
        for spawner in config.spawners {
            sim.start_spawner(spawner);
        }
        Ok(sim)
    }

    fn default_resolvers(dt: f32, contacts: Arc<dyn ContactSource>) -> Vec<Box<dyn Resolver>> {
        vec![
            Box::new(PhysicsResolver::with_dt(dt)),
            Box::new(CombatResolver::with_contacts(contacts)),
        ]
    }

    /// Replaces the contact source used by the combat resolver.
    pub fn set_contact_source(&mut self, contacts: Arc<dyn ContactSource>) {
        self.resolvers = Self::default_resolvers(self.dt, Arc::clone(&contacts));
        self.contacts = contacts;
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Live entities and categories.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutable access for hosts that manage categories themselves.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Looks up an entity.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.registry.get(id)
    }

    /// Simulation time in seconds.
    #[must_use]
    pub const fn time(&self) -> f32 {
        self.time
    }

    /// Physics steps taken.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Physics timestep.
    #[must_use]
    pub const fn dt(&self) -> f32 {
        self.dt
    }

    /// The master seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.master_seed
    }

    /// Scheduled tasks not yet fired.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Running spawners, in the order they were added.
    #[must_use]
    pub fn spawners(&self) -> &[Spawner] {
        &self.spawners
    }

    /// Sets the player input used by the next physics steps.
    pub fn set_input(&mut self, input: InputState) {
        self.input = input;
    }

    /// Drains every event recorded since the last call.
    pub fn take_events(&mut self) -> Vec<SimEvent> {
        self.events.take_events()
    }

    // -------------------------------------------------------------------------
    // Spawning
    // -------------------------------------------------------------------------

    /// Validates and registers a blueprint under `name`, replacing any
    /// previous one.
    ///
    /// # Errors
    ///
    /// Returns the blueprint's first invalid field.
    pub fn add_blueprint(
        &mut self,
        name: impl Into<String>,
        blueprint: ShipBlueprint,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        blueprint.validate(&name)?;
        self.blueprints.insert(name, blueprint.prepare());
        Ok(())
    }

    /// Spawns an assembled ship and lists it under `categories`.
    pub fn spawn_ship(
        &mut self,
        core: EntityCore,
        ship: ShipComponents,
        categories: &[ObjectCategory],
    ) -> EntityId {
        let parent = core.parent;
        let id = self.registry.spawn(core, EntityInner::Ship(Box::new(ship)));
        for &category in categories {
            self.registry.add_object(category, id);
        }
        self.events.push(SimEvent::Spawned {
            entity: id,
            tag: EntityTag::Ship,
            parent,
        });
        id
    }

    /// Spawns a ship from a registered blueprint.
    ///
    /// Returns `None` if no blueprint has that name.
    pub fn spawn_blueprint(
        &mut self,
        name: &str,
        position: Vec2,
        rotation: f32,
        team: Team,
    ) -> Option<EntityId> {
        let Some(prepared) = self.blueprints.get(name) else {
            warn!(blueprint = name, "unknown blueprint");
            return None;
        };
        let core = prepared.core(position, rotation, team);
        let ship = prepared.components(rotation);
        let categories = prepared.categories().to_vec();

        let id = self.spawn_ship(core, ship, &categories);
        let controller = self
            .blueprints
            .get(name)
            .and_then(|prepared| prepared.controller(self.master_seed, id));
        if let Some(ai) = controller {
            if let Some(ship) = self.registry.get_mut(id).and_then(Entity::as_ship_mut) {
                ship.ai = Some(ai);
            }
        }
        debug!(entity = %id, blueprint = name, team = %team, "ship spawned");
        Some(id)
    }

    /// Spawns an obstacle, lists it under `categories` and schedules its
    /// expiry if it has a lifetime.
    pub fn spawn_obstacle(
        &mut self,
        core: EntityCore,
        obstacle: ObstacleComponents,
        categories: &[ObjectCategory],
    ) -> EntityId {
        let parent = core.parent;
        let expiry = obstacle
            .lifetime
            .and_then(|lifetime| lifetime.max_age.map(|max| (max - lifetime.age).max(0.0)));
        let id = self.registry.spawn(core, EntityInner::Obstacle(obstacle));
        for &category in categories {
            self.registry.add_object(category, id);
        }
        if let Some(remaining) = expiry {
            self.tasks
                .schedule(self.time + remaining, Some(id), TaskKind::Expire(id));
        }
        self.events.push(SimEvent::Spawned {
            entity: id,
            tag: EntityTag::Obstacle,
            parent,
        });
        id
    }

    /// Launches a projectile outside the physics step.
    pub fn spawn_projectile(&mut self, launch: ProjectileLaunch) -> EntityId {
        let mut ctx = ResolveContext {
            registry: &mut self.registry,
            tasks: &mut self.tasks,
            events: &mut self.events,
            input: &self.input,
            now: self.time,
        };
        launch_projectile(&mut ctx, launch)
    }

    /// Removes an entity on behalf of the host.
    ///
    /// Returns `false` if it was already gone.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        let mut ctx = ResolveContext {
            registry: &mut self.registry,
            tasks: &mut self.tasks,
            events: &mut self.events,
            input: &self.input,
            now: self.time,
        };
        destroy_entity(&mut ctx, id, DestroyCause::Removed)
    }

    /// Validates a spawner and schedules its first wave.
    ///
    /// Returns the spawner's index.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or names an unknown
    /// blueprint.
    pub fn add_spawner(&mut self, mut config: SpawnerConfig) -> Result<usize, ConfigError> {
        config.validate()?;
        if let Some(missing) = config
            .options
            .iter()
            .find(|option| !self.blueprints.contains_key(*option))
        {
            return Err(ConfigError::UnknownBlueprint {
                spawner: config.name.clone(),
                blueprint: missing.clone(),
            });
        }
        Ok(self.start_spawner(config))
    }

    fn start_spawner(&mut self, config: SpawnerConfig) -> usize {
        let index = self.spawners.len();
        let first = self.time + config.initial_delay;
        self.spawners.push(Spawner::new(config));
        self.tasks
            .schedule(first, None, TaskKind::SpawnWave { spawner: index });
        index
    }

    fn run_wave(&mut self, index: usize) {
        let Some(spawner) = self.spawners.get_mut(index) else {
            return;
        };
        let orders = spawner.plan_wave(&mut self.rng, &self.registry);
        let next = spawner.next_wake(self.time);

        for order in orders {
            if let Some(id) =
                self.spawn_blueprint(&order.blueprint, order.position, order.rotation, order.team)
            {
                self.spawners[index].record(id);
            }
        }
        if let Some(wake) = next {
            self.tasks
                .schedule(wake, None, TaskKind::SpawnWave { spawner: index });
        }
    }

    // -------------------------------------------------------------------------
    // Stepping
    // -------------------------------------------------------------------------

    /// Runs one frame phase followed by one physics phase.
    pub fn step(&mut self) {
        self.step_frame();
        self.step_physics();
    }

    /// Runs `count` full steps.
    pub fn run(&mut self, count: u32) {
        for _ in 0..count {
            self.step();
        }
    }

    /// Frame phase: AI transitions, then steering.
    ///
    /// Every AI ship first checks the transitions of its active state in id
    /// order, recording a `BehaviourSwitched` event when one fires. Steering
    /// is then planned for all AI ships in parallel against the unchanged
    /// registry and applied in id order: the direction becomes the mover's
    /// input vector and the derived intents are stored for the physics
    /// phase. The clock does not advance.
    ///
    /// # Example
    ///
    /// ```rust
    /// use driftfire_core::config::ShipBlueprint;
    /// use driftfire_core::event::SimEvent;
    /// use driftfire_core::{Simulation, Team};
    /// use glam::Vec2;
    ///
    /// let blueprint: ShipBlueprint = serde_json::from_str(r#"{
    ///     "max_hp": 10.0,
    ///     "ai": { "states": [
    ///         { "name": "hunt", "behaviour": {},
    ///           "transitions": [ { "condition": { "kind": "NoGunsLeft" }, "next": 1 } ] },
    ///         { "name": "flee", "behaviour": { "movement_mode": "Avoiding" } }
    ///     ] }
    /// }"#)?;
    ///
    /// let mut sim = Simulation::new(1);
    /// sim.add_blueprint("scout", blueprint)?;
    /// let scout = sim.spawn_blueprint("scout", Vec2::ZERO, 0.0, Team::new(1)).unwrap();
    /// sim.take_events();
    ///
    /// sim.step_frame();
    ///
    /// assert_eq!(sim.tick(), 0);
    /// assert_eq!(
    ///     sim.take_events(),
    ///     vec![SimEvent::BehaviourSwitched {
    ///         entity: scout,
    ///         from: "hunt".into(),
    ///         to: "flee".into(),
    ///     }]
    /// );
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn step_frame(&mut self) {
        let ai_ships: Vec<EntityId> = self
            .registry
            .entities_sorted()
            .filter(|e| e.as_ship().is_some_and(|ship| ship.ai.is_some()))
            .map(Entity::id)
            .collect();

        for &id in &ai_ships {
            self.evaluate_conditions(id);
        }

        let mut plans = self.plan_steering(&ai_ships);
        plans.sort_by_key(|plan| plan.entity);
        for plan in plans {
            if let Some(ship) = self.registry.get_mut(plan.entity).and_then(Entity::as_ship_mut) {
                ship.mover.set_input_vector(plan.direction);
                ship.intents = plan.intents;
            }
        }
    }

    /// Checks one AI ship's transitions, recording a switch if one fires.
    fn evaluate_conditions(&mut self, id: EntityId) {
        let Some(entity) = self.registry.get_mut(id) else {
            return;
        };
        let position = entity.position();
        let team = entity.team;
        let Some(mut ai) = entity.as_ship_mut().and_then(|ship| ship.ai.take()) else {
            return;
        };

        let ctx = ConditionContext {
            self_id: id,
            now: self.time,
            position,
            team,
            gun_count: gun_count(&self.registry, id),
            registry: &self.registry,
        };
        if let Some(switch) = ai.evaluate(&ctx) {
            self.events.push(SimEvent::BehaviourSwitched {
                entity: id,
                from: ai.state_name(switch.from).unwrap_or_default().to_owned(),
                to: ai.state_name(switch.to).unwrap_or_default().to_owned(),
            });
        }

        if let Some(ship) = self.registry.get_mut(id).and_then(Entity::as_ship_mut) {
            ship.ai = Some(ai);
        }
    }

    /// Computes steering for every AI ship in parallel.
    fn plan_steering(&self, ai_ships: &[EntityId]) -> Vec<SteeringPlan> {
        let registry = &self.registry;
        let blockers: Vec<(EntityId, Vec2, f32)> = [ObjectCategory::Obstacle, ObjectCategory::Indestructible]
            .into_iter()
            .flat_map(|category| registry.object_list(category))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|id| registry.get(id).map(|e| (id, e.position(), e.radius)))
            .collect();

        ai_ships
            .par_iter()
            .filter_map(|&id| {
                let entity = registry.get(id)?;
                let ai = entity.as_ship()?.ai.as_ref()?;
                let data = MovementBehaviourData::from_entity(entity);
                let steering = ai.steer(&data, registry);

                let target = steering.target.and_then(|t| registry.get(t));
                let bearing = target.map(|t| t.position() - entity.position());
                let line_of_sight = target.is_some_and(|t| {
                    let others = blockers
                        .iter()
                        .filter(|(blocker, _, _)| *blocker != t.id() && *blocker != id)
                        .map(|&(_, center, radius)| (center, radius));
                    has_line_of_sight(entity.position(), t.position(), others)
                });

                Some(SteeringPlan {
                    entity: id,
                    direction: steering.direction,
                    intents: ai.intents_for(&steering, entity.transform.rotation, bearing, line_of_sight),
                })
            })
            .collect()
    }

    /// Physics phase: due tasks, then every resolver in order.
    pub fn step_physics(&mut self) {
        let now = self.time;
        for task in self.tasks.drain_due(now) {
            match task.kind {
                TaskKind::Expire(id) => {
                    let mut ctx = ResolveContext {
                        registry: &mut self.registry,
                        tasks: &mut self.tasks,
                        events: &mut self.events,
                        input: &self.input,
                        now,
                    };
                    destroy_entity(&mut ctx, id, DestroyCause::Expired);
                }
                TaskKind::SpawnWave { spawner } => self.run_wave(spawner),
            }
        }

        let mut ctx = ResolveContext {
            registry: &mut self.registry,
            tasks: &mut self.tasks,
            events: &mut self.events,
            input: &self.input,
            now,
        };
        for resolver in &self.resolvers {
            trace!(resolver = resolver.name(), tick = self.tick, "resolving");
            resolver.resolve(&mut ctx);
        }

        self.time += self.dt;
        self.tick += 1;
    }

    /// Changes the physics timestep.
    ///
    /// # Errors
    ///
    /// Returns an error unless `dt` is finite and positive.
    pub fn set_dt(&mut self, dt: f32) -> Result<(), ConfigError> {
        check_positive("physics.dt", dt)?;
        self.dt = dt;
        self.resolvers = Self::default_resolvers(dt, Arc::clone(&self.contacts));
        Ok(())
    }
}

/// Guns on `id` plus guns on ships it parents (turrets, drones).
fn gun_count(registry: &Registry, id: EntityId) -> usize {
    registry
        .entities_sorted()
        .filter(|e| e.id() == id || e.parent == Some(id))
        .filter_map(Entity::as_ship)
        .map(|ship| ship.loadout.guns.len())
        .sum()
}
