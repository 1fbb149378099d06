//! Resolvers for the fixed physics phase.
//!
//! Each resolver mutates the world through a [`ResolveContext`] that lends
//! it the registry, the task queue and the event log for one physics tick.
//! The simulation runs them in a fixed order:
//!
//! 1. [`PhysicsResolver`]: actions, mover commit, integration, lifetimes, guns
//! 2. [`CombatResolver`]: contacts, damage, projectile consumption, deaths
//!
//! # Invariants
//!
//! - Resolvers visit entities in ascending id order
//! - Destroyed entities leave every registry category and lose their
//!   pending tasks in the same call ([`destroy_entity`])

mod combat;
mod physics;

pub use combat::CombatResolver;
pub use physics::{launch_projectile, PhysicsResolver, ProjectileLaunch, FIXED_DT};

use tracing::debug;

use crate::action::InputState;
use crate::entity::EntityId;
use crate::event::{DestroyCause, EventLog, SimEvent};
use crate::registry::Registry;
use crate::scheduler::TaskQueue;

/// Mutable world state lent to a resolver for one tick.
#[derive(Debug)]
pub struct ResolveContext<'a> {
    /// All live entities.
    pub registry: &'a mut Registry,
    /// Pending scheduled work.
    pub tasks: &'a mut TaskQueue,
    /// Events for the host.
    pub events: &'a mut EventLog,
    /// Player input for this tick.
    pub input: &'a InputState,
    /// Simulation time at the start of the tick.
    pub now: f32,
}

/// A phase of the physics step.
pub trait Resolver: Send + Sync {
    /// Name used in trace logs.
    fn name(&self) -> &'static str;

    /// Applies this phase to the world.
    fn resolve(&self, ctx: &mut ResolveContext<'_>);
}

/// Removes an entity, cancels its scheduled tasks and records the event.
///
/// Only [`DestroyCause::Killed`] credits the victim's last attacker.
/// Returns `false` if the entity was already gone.
pub fn destroy_entity(ctx: &mut ResolveContext<'_>, id: EntityId, cause: DestroyCause) -> bool {
    let Some(entity) = ctx.registry.despawn(id) else {
        return false;
    };
    let cancelled = ctx.tasks.cancel_owner(id);
    let killer = if cause == DestroyCause::Killed {
        entity.health().and_then(|h| h.last_attacker)
    } else {
        None
    };
    debug!(entity = %id, ?cause, cancelled, "entity destroyed");
    ctx.events.push(SimEvent::EntityDestroyed {
        entity: id,
        cause,
        killer,
    });
    true
}
