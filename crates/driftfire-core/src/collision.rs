//! Contact detection.
//!
//! The combat step consumes [`Contact`]s from a [`ContactSource`]. Hosts
//! with a real physics engine can feed its contacts in; the crate ships
//! [`OverlapContacts`], a circle-overlap test between projectiles and
//! everything they can hit.

use std::collections::BTreeSet;
use std::fmt::Debug;

use glam::Vec2;

use crate::entity::{EntityId, ObjectCategory};
use crate::registry::Registry;

/// A touch between two entities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// The damaging side (projectile).
    pub a: EntityId,
    /// The touched entity.
    pub b: EntityId,
    /// World-space contact point.
    pub point: Vec2,
}

/// Produces the contacts for one physics step.
pub trait ContactSource: Debug + Send + Sync {
    /// Contacts in deterministic order.
    fn contacts(&self, registry: &Registry) -> Vec<Contact>;
}

/// Circle-overlap contacts between projectiles and hittable objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlapContacts;

impl OverlapContacts {
    const TARGETS: [ObjectCategory; 3] = [
        ObjectCategory::Entity,
        ObjectCategory::Obstacle,
        ObjectCategory::Indestructible,
    ];
}

impl ContactSource for OverlapContacts {
    fn contacts(&self, registry: &Registry) -> Vec<Contact> {
        let targets: BTreeSet<EntityId> = Self::TARGETS
            .into_iter()
            .flat_map(|category| registry.object_list(category))
            .collect();

        let mut contacts = Vec::new();
        for shot_id in registry.object_list(ObjectCategory::Projectile) {
            let Some(shot) = registry.get(shot_id) else {
                continue;
            };
            for &target_id in &targets {
                if target_id == shot_id {
                    continue;
                }
                let Some(target) = registry.get(target_id) else {
                    continue;
                };
                let delta = target.position() - shot.position();
                let reach = shot.radius + target.radius;
                if delta.length_squared() <= reach * reach {
                    contacts.push(Contact {
                        a: shot_id,
                        b: target_id,
                        point: shot.position() + delta.normalize_or_zero() * shot.radius,
                    });
                }
            }
        }
        contacts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityCore, EntityInner, ObstacleComponents};
    use crate::team::Team;

    fn place(registry: &mut Registry, x: f32, radius: f32, category: ObjectCategory) -> EntityId {
        let id = registry.spawn(
            EntityCore::at(Vec2::new(x, 0.0), Team::new(1), radius),
            EntityInner::Obstacle(ObstacleComponents::default()),
        );
        registry.add_object(category, id);
        id
    }

    #[test]
    fn overlapping_circles_touch() {
        let mut registry = Registry::new();
        let shot = place(&mut registry, 0.0, 0.5, ObjectCategory::Projectile);
        let hull = place(&mut registry, 1.4, 1.0, ObjectCategory::Entity);
        let _far = place(&mut registry, 5.0, 1.0, ObjectCategory::Obstacle);

        let contacts = OverlapContacts.contacts(&registry);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].a, shot);
        assert_eq!(contacts[0].b, hull);
        assert!((contacts[0].point - Vec2::new(0.5, 0.0)).length() < 1e-5);
    }

    #[test]
    fn multi_category_target_reported_once() {
        let mut registry = Registry::new();
        place(&mut registry, 0.0, 0.5, ObjectCategory::Projectile);
        let wall = place(&mut registry, 0.0, 2.0, ObjectCategory::Obstacle);
        registry.add_object(ObjectCategory::Indestructible, wall);
        assert_eq!(OverlapContacts.contacts(&registry).len(), 1);
    }

    #[test]
    fn projectiles_do_not_hit_projectiles() {
        let mut registry = Registry::new();
        place(&mut registry, 0.0, 0.5, ObjectCategory::Projectile);
        place(&mut registry, 0.1, 0.5, ObjectCategory::Projectile);
        assert!(OverlapContacts.contacts(&registry).is_empty());
    }
}
