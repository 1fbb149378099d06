//! Combat resolver: contacts, damage, projectile consumption and deaths.
//!
//! The `CombatResolver` handles, in order:
//! - Contacts from its [`ContactSource`], each turned into a
//!   [`DamageInstance`] from the projectile's [`DamageDealer`]
//! - Projectile consumption: a non-piercing projectile is used up by its
//!   first applied hit (or by striking an indestructible object); a
//!   piercing one once its pools are drained
//! - Deaths: every entity whose health reached zero is destroyed
//!
//! [`DamageDealer`]: crate::entity::DamageDealer

use std::sync::Arc;

use tracing::trace;

use crate::collision::{Contact, ContactSource, OverlapContacts};
use crate::damage::{deal_damage, DamageFlags, DamageInstance, DamageOutcome};
use crate::entity::{EntityId, ObjectCategory};
use crate::event::{DestroyCause, SimEvent};

use super::{destroy_entity, ResolveContext, Resolver};

/// Resolver for the damage half of the physics step.
///
/// # Example
///
/// ```
/// use driftfire_core::resolver::{CombatResolver, Resolver};
///
/// let resolver = CombatResolver::new();
/// assert_eq!(resolver.name(), "combat");
/// ```
#[derive(Debug, Clone)]
pub struct CombatResolver {
    contacts: Arc<dyn ContactSource>,
}

impl Default for CombatResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CombatResolver {
    /// Creates a combat resolver using circle-overlap contacts.
    #[must_use]
    pub fn new() -> Self {
        Self::with_contacts(Arc::new(OverlapContacts))
    }

    /// Creates a combat resolver fed by a custom contact source.
    #[must_use]
    pub fn with_contacts(contacts: Arc<dyn ContactSource>) -> Self {
        Self { contacts }
    }

    /// Builds the damage instance a projectile deals on contact.
    ///
    /// Returns `None` if the projectile is gone or already hit `target`.
    fn instance_for(
        ctx: &ResolveContext<'_>,
        shot_id: EntityId,
        target: EntityId,
    ) -> Option<DamageInstance> {
        let shot = ctx.registry.get(shot_id)?;
        let projectile = shot.as_projectile()?;
        if projectile.dealer.hits.contains(&target) {
            return None;
        }
        Some(DamageInstance {
            source: shot_id,
            creator: shot.parent,
            team: shot.team,
            payload: projectile.dealer.payload.clone(),
            lifetime: projectile.lifetime.age,
        })
    }

    fn resolve_contact(ctx: &mut ResolveContext<'_>, contact: Contact) {
        let Contact { a: shot_id, b: target_id, .. } = contact;
        if !ctx.registry.contains(target_id) {
            return;
        }
        let Some(mut instance) = Self::instance_for(ctx, shot_id, target_id) else {
            return;
        };

        let outcome = match ctx
            .registry
            .get_mut(target_id)
            .and_then(|target| target.damage_target())
        {
            Some(mut target) => deal_damage(&mut target, &mut instance),
            None => DamageOutcome::NoEffect,
        };
        trace!(shot = %shot_id, target = %target_id, ?outcome, "contact resolved");

        let piercing = instance.payload.flags.contains(DamageFlags::PIERCING);
        let consumed = match outcome {
            DamageOutcome::Applied { amount } => {
                ctx.events.push(SimEvent::DamageDealt {
                    target: target_id,
                    dealer: instance.dealer(),
                    amount,
                });
                !piercing || instance.payload.is_exhausted()
            }
            _ => {
                !piercing
                    && ctx
                        .registry
                        .is_member(ObjectCategory::Indestructible, target_id)
            }
        };

        if let Some(projectile) = ctx
            .registry
            .get_mut(shot_id)
            .and_then(|shot| shot.as_projectile_mut())
        {
            projectile.dealer.hits.insert(target_id);
            projectile.dealer.payload = instance.payload;
        }
        if consumed {
            destroy_entity(ctx, shot_id, DestroyCause::Consumed);
        }
    }

    fn destroy_depleted(ctx: &mut ResolveContext<'_>) {
        let dead: Vec<EntityId> = ctx
            .registry
            .entities_sorted()
            .filter(|e| e.health().is_some_and(|h| h.is_depleted()))
            .map(|e| e.id())
            .collect();
        for id in dead {
            destroy_entity(ctx, id, DestroyCause::Killed);
        }
    }
}

impl Resolver for CombatResolver {
    fn name(&self) -> &'static str {
        "combat"
    }

    fn resolve(&self, ctx: &mut ResolveContext<'_>) {
        for contact in self.contacts.contacts(ctx.registry) {
            Self::resolve_contact(ctx, contact);
        }
        Self::destroy_depleted(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    use crate::action::InputState;
    use crate::body::Body;
    use crate::damage::{DamageCategory, DamagePayload};
    use crate::entity::{
        DamageDealer, EntityCore, EntityInner, Health, Lifetime, ObstacleComponents,
        ProjectileComponents,
    };
    use crate::event::EventLog;
    use crate::registry::Registry;
    use crate::scheduler::{TaskKind, TaskQueue};
    use crate::team::Team;

    struct Arena {
        registry: Registry,
        tasks: TaskQueue,
        events: EventLog,
    }

    impl Arena {
        fn new() -> Self {
            Self {
                registry: Registry::new(),
                tasks: TaskQueue::new(),
                events: EventLog::new(),
            }
        }

        fn hull(&mut self, x: f32, team: Team, hp: f32) -> EntityId {
            let id = self.registry.spawn(
                EntityCore::at(Vec2::new(x, 0.0), team, 1.0),
                EntityInner::Obstacle(ObstacleComponents {
                    health: Some(Health::new(hp)),
                    lifetime: None,
                }),
            );
            self.registry.add_object(ObjectCategory::Entity, id);
            id
        }

        fn shot(&mut self, x: f32, team: Team, payload: DamagePayload, age: f32) -> EntityId {
            let id = self.registry.spawn(
                EntityCore::at(Vec2::new(x, 0.0), team, 0.1).with_body(Body::default()),
                EntityInner::Projectile(ProjectileComponents {
                    dealer: DamageDealer::new(payload),
                    lifetime: Lifetime {
                        age,
                        max_age: Some(5.0),
                    },
                }),
            );
            self.registry.add_object(ObjectCategory::Projectile, id);
            self.tasks.schedule(5.0, Some(id), TaskKind::Expire(id));
            id
        }

        fn resolve(&mut self) {
            let input = InputState::default();
            let mut ctx = ResolveContext {
                registry: &mut self.registry,
                tasks: &mut self.tasks,
                events: &mut self.events,
                input: &input,
                now: 0.0,
            };
            CombatResolver::new().resolve(&mut ctx);
        }

        fn hp(&self, id: EntityId) -> Option<f32> {
            self.registry.get(id)?.health().map(|h| h.hp)
        }
    }

    fn physical(amount: f32) -> DamagePayload {
        DamagePayload::single(DamageCategory::Physical, amount)
    }

    #[test]
    fn hit_damages_enemy_and_consumes_shot() {
        let mut arena = Arena::new();
        let target = arena.hull(0.0, Team::new(2), 50.0);
        let shot = arena.shot(0.5, Team::new(1), physical(10.0), 1.0);

        arena.resolve();

        assert_eq!(arena.hp(target), Some(40.0));
        assert!(arena.registry.get(shot).is_none());
        assert!(arena.tasks.is_empty());
        let events = arena.events.take_events();
        assert!(events.contains(&SimEvent::DamageDealt {
            target,
            dealer: shot,
            amount: 10.0,
        }));
    }

    #[test]
    fn friendly_fire_passes_through() {
        let mut arena = Arena::new();
        let friend = arena.hull(0.0, Team::new(1), 50.0);
        let shot = arena.shot(0.5, Team::new(1), physical(10.0), 1.0);

        arena.resolve();

        assert_eq!(arena.hp(friend), Some(50.0));
        assert!(arena.registry.get(shot).is_some());
    }

    #[test]
    fn piercing_shot_drains_then_dies() {
        let mut arena = Arena::new();
        let first = arena.hull(0.0, Team::new(2), 50.0);
        let second = arena.hull(0.6, Team::new(2), 50.0);
        let shot = arena.shot(
            0.3,
            Team::new(1),
            physical(10.0).with_flags(DamageFlags::PIERCING),
            1.0,
        );

        arena.resolve();

        assert_eq!(arena.hp(first), Some(40.0));
        assert_eq!(arena.hp(second), Some(50.0));
        assert!(arena.registry.get(shot).is_none());
    }

    #[test]
    fn piercing_shot_hits_each_target_once() {
        let mut arena = Arena::new();
        let target = arena.hull(0.0, Team::new(2), 50.0);
        if let Some(health) = arena.registry.get_mut(target).and_then(|e| e.health_mut()) {
            *health = Health::new(50.0).with_immunity(DamageCategory::Physical, 0.5);
        }
        let shot = arena.shot(
            0.3,
            Team::new(1),
            physical(10.0).with_flags(DamageFlags::PIERCING),
            1.0,
        );

        arena.resolve();
        arena.resolve();

        assert_eq!(arena.hp(target), Some(45.0));
        let projectile = arena.registry.get(shot).unwrap().as_projectile().unwrap();
        assert!(projectile.dealer.hits.contains(&target));
        assert_eq!(projectile.dealer.payload.total(), 5.0);
    }

    #[test]
    fn indestructible_stops_plain_shots() {
        let mut arena = Arena::new();
        let wall = arena.registry.spawn(
            EntityCore::at(Vec2::ZERO, Team::NEUTRAL, 3.0),
            EntityInner::Obstacle(ObstacleComponents::default()),
        );
        arena.registry.add_object(ObjectCategory::Indestructible, wall);
        let shot = arena.shot(1.0, Team::new(1), physical(10.0), 1.0);

        arena.resolve();

        assert!(arena.registry.get(shot).is_none());
        assert!(arena.registry.get(wall).is_some());
    }

    #[test]
    fn lethal_hit_destroys_target_with_kill_credit() {
        let mut arena = Arena::new();
        let shooter = EntityId::new(900);
        let target = arena.hull(0.0, Team::new(2), 5.0);
        let shot = arena.shot(0.5, Team::new(1), physical(10.0), 1.0);
        if let Some(entity) = arena.registry.get_mut(shot) {
            entity.parent = Some(shooter);
        }

        arena.resolve();

        assert!(arena.registry.get(target).is_none());
        assert_eq!(arena.registry.object_count(ObjectCategory::Entity), 0);
        let events = arena.events.take_events();
        assert!(events.contains(&SimEvent::EntityDestroyed {
            entity: target,
            cause: DestroyCause::Killed,
            killer: Some(shooter),
        }));
    }

    #[test]
    fn young_shot_spares_its_creator() {
        let mut arena = Arena::new();
        let creator = arena.hull(0.0, Team::new(1), 50.0);
        let shot = arena.shot(
            0.5,
            Team::new(1),
            physical(10.0).with_flags(DamageFlags::HURTS_ALLIES),
            0.1,
        );
        if let Some(entity) = arena.registry.get_mut(shot) {
            entity.parent = Some(creator);
        }

        arena.resolve();

        assert_eq!(arena.hp(creator), Some(50.0));
        assert!(arena.registry.get(shot).is_some());
    }
}
