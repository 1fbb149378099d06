//! Physics resolver: input application, rotation commit and integration.
//!
//! For every entity, in id order:
//!
//! 1. Ships apply their bound actions (player input or AI intents), then
//!    the mover commits the held rotation and removes drift
//! 2. Bodies integrate accumulated force and move: `position += velocity * dt`
//! 3. Lifetimes age
//! 4. Guns cool down and fire if requested
//!
//! Projectiles fired during the pass are spawned after it, so a shot never
//! moves on the tick it was fired.
//!
//! # Fixed Timestep
//!
//! The physics resolver uses a fixed timestep of 1/60 seconds (60 FPS).
//! This ensures deterministic physics regardless of actual frame time.

use glam::Vec2;

use crate::action::{ActionData, ControllerKind, InputState};
use crate::body::Body;
use crate::damage::DamageFlags;
use crate::entity::{
    DamageDealer, Entity, EntityCore, EntityId, EntityInner, EntityTag, Lifetime, ObjectCategory,
    ProjectileComponents, ProjectileSpec,
};
use crate::event::SimEvent;
use crate::geometry::{direction_from_angle, rotate};
use crate::scheduler::TaskKind;
use crate::team::Team;

use super::{ResolveContext, Resolver};

/// Fixed timestep for physics integration (1/60 second = ~16.67ms).
pub const FIXED_DT: f32 = 1.0 / 60.0;

/// Everything needed to put a projectile into the world.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileLaunch {
    /// Entity that fired, recorded as the projectile's parent.
    pub shooter: Option<EntityId>,
    /// Team the projectile fights for.
    pub team: Team,
    /// Spawn position.
    pub position: Vec2,
    /// Facing in degrees.
    pub rotation: f32,
    /// Initial velocity.
    pub velocity: Vec2,
    /// Payload, size and lifetime.
    pub spec: ProjectileSpec,
}

/// Spawns a projectile, lists it under [`ObjectCategory::Projectile`] and
/// schedules its expiry.
pub fn launch_projectile(ctx: &mut ResolveContext<'_>, launch: ProjectileLaunch) -> EntityId {
    let ProjectileLaunch {
        shooter,
        team,
        position,
        rotation,
        velocity,
        spec,
    } = launch;

    let mut core = EntityCore::at(position, team, spec.radius)
        .facing(rotation)
        .with_body(Body::moving(0.0, velocity));
    core.parent = shooter;

    let payload = spec.payload.with_flags(DamageFlags::IS_PROJECTILE);
    let id = ctx.registry.spawn(
        core,
        EntityInner::Projectile(ProjectileComponents {
            dealer: DamageDealer::new(payload),
            lifetime: Lifetime::expiring(spec.max_age),
        }),
    );
    ctx.registry.add_object(ObjectCategory::Projectile, id);
    ctx.tasks
        .schedule(ctx.now + spec.max_age.max(0.0), Some(id), TaskKind::Expire(id));
    ctx.events.push(SimEvent::Spawned {
        entity: id,
        tag: EntityTag::Projectile,
        parent: shooter,
    });
    id
}

/// Resolver for the movement half of the physics step.
///
/// # Example
///
/// ```
/// use driftfire_core::resolver::{PhysicsResolver, FIXED_DT};
///
/// let resolver = PhysicsResolver::new();
/// assert_eq!(resolver.dt(), FIXED_DT);
/// ```
#[derive(Debug, Clone)]
pub struct PhysicsResolver {
    /// Fixed timestep for physics integration
    dt: f32,
}

impl Default for PhysicsResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsResolver {
    /// Creates a new physics resolver with the default fixed timestep.
    #[must_use]
    pub fn new() -> Self {
        Self { dt: FIXED_DT }
    }

    /// Creates a physics resolver with a custom timestep.
    ///
    /// Useful for testing or non-standard tick rates.
    #[must_use]
    pub fn with_dt(dt: f32) -> Self {
        Self { dt }
    }

    /// Returns the timestep used for physics integration.
    #[must_use]
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Applies bound actions and commits the mover.
    fn drive_ship(entity: &mut Entity, player: &InputState, idle: &InputState, dt: f32) {
        let Some((mut body, ship)) = entity.ship_parts_mut() else {
            return;
        };
        let input = match ship.input.controller() {
            ControllerKind::Player => player,
            ControllerKind::Ai => idle,
        };

        let mut data = ActionData::new(&mut body, &mut ship.mover, dt).with_cursor(input.cursor);
        ship.input.apply(&mut data, input, &ship.intents);
        let fire = data.fire_requested;

        ship.mover.fixed_update(&mut body, dt);
        ship.fire_requested = fire;
    }

    /// `position += velocity * dt` after force integration.
    fn integrate(entity: &mut Entity, dt: f32) {
        if let Some(body) = entity.body.as_mut() {
            entity.transform.position += body.integrate(dt);
        }
    }

    /// Cools guns down and queues shots for ships that asked to fire.
    fn tick_guns(entity: &mut Entity, dt: f32, launches: &mut Vec<ProjectileLaunch>) {
        let shooter = entity.id();
        let team = entity.team;
        let position = entity.position();
        let rotation = entity.transform.rotation;
        let velocity = entity.velocity();
        let Some(ship) = entity.as_ship_mut() else {
            return;
        };

        let fire = std::mem::take(&mut ship.fire_requested);
        let heading = direction_from_angle(rotation);
        for gun in &mut ship.loadout.guns {
            gun.cooldown = (gun.cooldown - dt).max(0.0);
            if fire && gun.is_ready() {
                gun.cooldown = gun.reload_time.max(0.0);
                launches.push(ProjectileLaunch {
                    shooter: Some(shooter),
                    team,
                    position: position + rotate(gun.muzzle, rotation),
                    rotation,
                    velocity: velocity + heading * gun.projectile.speed,
                    spec: gun.projectile.clone(),
                });
            }
        }
    }
}

impl Resolver for PhysicsResolver {
    fn name(&self) -> &'static str {
        "physics"
    }

    fn resolve(&self, ctx: &mut ResolveContext<'_>) {
        let dt = self.dt;
        let idle = InputState::default();
        let ids: Vec<EntityId> = ctx.registry.entity_ids_sorted().collect();
        let mut launches = Vec::new();

        for id in ids {
            let Some(entity) = ctx.registry.get_mut(id) else {
                continue;
            };
            Self::drive_ship(entity, ctx.input, &idle, dt);
            Self::integrate(entity, dt);
            if let Some(lifetime) = entity.lifetime_mut() {
                lifetime.age += dt;
            }
            Self::tick_guns(entity, dt, &mut launches);
        }

        for launch in launches {
            launch_projectile(ctx, launch);
        }
    }
}
