//! Registry of live simulation objects.
//!
//! The Registry owns every entity and indexes them by [`ObjectCategory`].
//! It provides:
//! - Entity storage with deterministic iteration order (`BTreeMap`)
//! - Category membership (`add_object` / `remove_object`)
//! - Team queries (allies, enemies, closest enemy)
//! - Range queries backing the AI population conditions
//!
//! # Snapshots
//!
//! Every list query returns an owned `Vec<EntityId>`. Callers may despawn
//! entities while walking a result; ids that no longer resolve simply return
//! `None` from [`Registry::get`].
//!
//! # Example
//!
//! ```
//! use driftfire_core::entity::{EntityCore, EntityInner, ObjectCategory, ObstacleComponents};
//! use driftfire_core::registry::Registry;
//! use driftfire_core::team::Team;
//! use glam::Vec2;
//!
//! let mut registry = Registry::new();
//! let near = registry.spawn(
//!     EntityCore::at(Vec2::new(1.0, 0.0), Team::new(2), 1.0),
//!     EntityInner::Obstacle(ObstacleComponents::default()),
//! );
//! let far = registry.spawn(
//!     EntityCore::at(Vec2::new(9.0, 0.0), Team::new(2), 1.0),
//!     EntityInner::Obstacle(ObstacleComponents::default()),
//! );
//! registry.add_object(ObjectCategory::Entity, near);
//! registry.add_object(ObjectCategory::Entity, far);
//!
//! assert_eq!(registry.closest_enemy(Vec2::ZERO, Team::new(1)), Some(near));
//! assert_eq!(registry.enemy_list(Team::new(1)), vec![near, far]);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use tracing::trace;

use crate::entity::{Entity, EntityCore, EntityId, EntityInner, ObjectCategory};
use crate::team::{Team, TeamRelation};

/// Container and index for all live entities.
///
/// # Determinism
///
/// Entities and category members are kept in ordered collections, so every
/// query returns ids in ascending order and ties in distance queries always
/// resolve to the lowest id.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// Monotonically increasing entity id counter.
    next_id: u64,
    /// Entity storage.
    entities: BTreeMap<EntityId, Entity>,
    /// Members of each category.
    categories: BTreeMap<ObjectCategory, BTreeSet<EntityId>>,
    /// Entities known to have no health bar.
    banned_bars: BTreeSet<EntityId>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Storage
    // =========================================================================

    /// Stores a new entity and returns its id.
    ///
    /// The entity is not listed under any category until
    /// [`add_object`](Self::add_object) is called.
    pub fn spawn(&mut self, core: EntityCore, inner: EntityInner) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        let entity = Entity::new(id, core, inner);
        trace!(entity = %id, tag = %entity.tag(), "entity stored");
        self.entities.insert(id, entity);
        id
    }

    /// Removes an entity and every category entry pointing at it.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        for members in self.categories.values_mut() {
            members.remove(&id);
        }
        self.banned_bars.remove(&id);
        trace!(entity = %id, "entity removed");
        Some(entity)
    }

    /// Returns an entity by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Returns a mutable entity by id.
    #[must_use]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Returns `true` if the id refers to a live entity.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Entity ids in ascending order.
    pub fn entity_ids_sorted(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// Entities in ascending id order.
    pub fn entities_sorted(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }

    /// Mutable entities in ascending id order.
    pub fn entities_sorted_mut(&mut self) -> impl Iterator<Item = &mut Entity> + '_ {
        self.entities.values_mut()
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if there are no live entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Lists `id` under `category`.
    ///
    /// Dead ids and duplicates are ignored. Returns `true` if the entry was
    /// added.
    pub fn add_object(&mut self, category: ObjectCategory, id: EntityId) -> bool {
        if !self.entities.contains_key(&id) {
            return false;
        }
        self.categories.entry(category).or_default().insert(id)
    }

    /// Removes `id` from `category`. Returns `true` if it was a member.
    pub fn remove_object(&mut self, category: ObjectCategory, id: EntityId) -> bool {
        self.categories
            .get_mut(&category)
            .is_some_and(|members| members.remove(&id))
    }

    /// Returns `true` if `id` is listed under `category`.
    #[must_use]
    pub fn is_member(&self, category: ObjectCategory, id: EntityId) -> bool {
        self.categories
            .get(&category)
            .is_some_and(|members| members.contains(&id))
    }

    /// Snapshot of every member of `category`.
    #[must_use]
    pub fn object_list(&self, category: ObjectCategory) -> Vec<EntityId> {
        self.members(category).collect()
    }

    /// Number of members of `category`.
    #[must_use]
    pub fn object_count(&self, category: ObjectCategory) -> usize {
        self.categories.get(&category).map_or(0, BTreeSet::len)
    }

    /// Categories `id` is listed under.
    #[must_use]
    pub fn categories_of(&self, id: EntityId) -> Vec<ObjectCategory> {
        ObjectCategory::ALL
            .into_iter()
            .filter(|category| self.is_member(*category, id))
            .collect()
    }

    fn members(&self, category: ObjectCategory) -> impl Iterator<Item = EntityId> + '_ {
        self.categories
            .get(&category)
            .into_iter()
            .flat_map(|members| members.iter().copied())
    }

    fn members_with_entity(
        &self,
        category: ObjectCategory,
    ) -> impl Iterator<Item = &Entity> + '_ {
        self.members(category)
            .filter_map(move |id| self.entities.get(&id))
    }

    // =========================================================================
    // Team queries
    // =========================================================================

    /// Targetable entities allied with `team`, optionally excluding one id.
    #[must_use]
    pub fn ally_list(&self, team: Team, exclude: Option<EntityId>) -> Vec<EntityId> {
        self.members_with_entity(ObjectCategory::Entity)
            .filter(|e| Some(e.id()) != exclude && team.is_allied_with(e.team))
            .map(Entity::id)
            .collect()
    }

    /// Targetable entities hostile to `team`.
    #[must_use]
    pub fn enemy_list(&self, team: Team) -> Vec<EntityId> {
        self.members_with_entity(ObjectCategory::Entity)
            .filter(|e| team.is_enemy_of(e.team))
            .map(Entity::id)
            .collect()
    }

    /// Nearest entity hostile to `team`, if any.
    #[must_use]
    pub fn closest_enemy(&self, position: Vec2, team: Team) -> Option<EntityId> {
        self.closest_enemy_within(position, team, f32::INFINITY)
    }

    /// Nearest entity hostile to `team` no further than `range`.
    ///
    /// Only members of [`ObjectCategory::Entity`] are candidates. Ties keep
    /// the lower id, so the answer does not depend on storage order.
    ///
    /// # Arguments
    ///
    /// * `position` - The point distances are measured from
    /// * `team` - The searching side; neutrals and allies are skipped
    /// * `range` - Maximum distance, inclusive
    ///
    /// # Example
    ///
    /// ```rust
    /// use driftfire_core::entity::{EntityCore, EntityInner, ObjectCategory, ObstacleComponents};
    /// use driftfire_core::registry::Registry;
    /// use driftfire_core::Team;
    /// use glam::Vec2;
    ///
    /// let mut registry = Registry::new();
    /// let place = |registry: &mut Registry, x: f32, team: u8| {
    ///     let id = registry.spawn(
    ///         EntityCore::at(Vec2::new(x, 0.0), Team::new(team), 0.5),
    ///         EntityInner::Obstacle(ObstacleComponents::default()),
    ///     );
    ///     registry.add_object(ObjectCategory::Entity, id);
    ///     id
    /// };
    /// let _ally = place(&mut registry, 1.0, 1);
    /// let near = place(&mut registry, 4.0, 2);
    /// let _far = place(&mut registry, 9.0, 2);
    ///
    /// let red = Team::new(1);
    /// assert_eq!(registry.closest_enemy_within(Vec2::ZERO, red, 5.0), Some(near));
    /// assert_eq!(registry.closest_enemy_within(Vec2::ZERO, red, 3.0), None);
    /// ```
    #[must_use]
    pub fn closest_enemy_within(&self, position: Vec2, team: Team, range: f32) -> Option<EntityId> {
        let range_sq = range * range;
        let mut best: Option<(EntityId, f32)> = None;
        for entity in self.members_with_entity(ObjectCategory::Entity) {
            if !team.is_enemy_of(entity.team) {
                continue;
            }
            let distance_sq = position.distance_squared(entity.position());
            if distance_sq > range_sq {
                continue;
            }
            if best.map_or(true, |(_, d)| distance_sq < d) {
                best = Some((entity.id(), distance_sq));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Keeps only the live entities of `entities` that are hostile to `team`.
    ///
    /// # Arguments
    ///
    /// * `entities` - Candidate ids, possibly stale
    /// * `team` - The side doing the filtering
    ///
    /// # Returns
    ///
    /// The hostile ids in their original order. Ids no longer in the
    /// registry are dropped.
    #[must_use]
    pub fn subtract_neutrals_and_allies(&self, entities: &[EntityId], team: Team) -> Vec<EntityId> {
        entities
            .iter()
            .copied()
            .filter(|id| {
                self.entities
                    .get(id)
                    .is_some_and(|e| team.is_enemy_of(e.team))
            })
            .collect()
    }

    // =========================================================================
    // Range queries
    // =========================================================================

    /// Members of `category` whose position is within `radius` of `center`.
    #[must_use]
    pub fn objects_in_range(
        &self,
        category: ObjectCategory,
        center: Vec2,
        radius: f32,
    ) -> Vec<EntityId> {
        let radius_sq = radius * radius;
        self.members_with_entity(category)
            .filter(|e| center.distance_squared(e.position()) <= radius_sq)
            .map(Entity::id)
            .collect()
    }

    /// Number of members of `category` within `radius` of `center`.
    #[must_use]
    pub fn count_in_range(&self, category: ObjectCategory, center: Vec2, radius: f32) -> usize {
        let radius_sq = radius * radius;
        self.members_with_entity(category)
            .filter(|e| center.distance_squared(e.position()) <= radius_sq)
            .count()
    }

    /// Number of targetable entities within `radius` of `center` that stand
    /// in `relation` to `team`, optionally excluding one id.
    #[must_use]
    pub fn count_team_in_range(
        &self,
        team: Team,
        relation: TeamRelation,
        center: Vec2,
        radius: f32,
        exclude: Option<EntityId>,
    ) -> usize {
        let radius_sq = radius * radius;
        self.members_with_entity(ObjectCategory::Entity)
            .filter(|e| Some(e.id()) != exclude)
            .filter(|e| relation.holds(team, e.team))
            .filter(|e| center.distance_squared(e.position()) <= radius_sq)
            .count()
    }

    // =========================================================================
    // Health bars
    // =========================================================================

    /// Health-bar fill for `id`.
    ///
    /// Entities without health are remembered so later lookups return
    /// `None` without inspecting the entity again.
    pub fn bar_ratio(&mut self, id: EntityId) -> Option<f32> {
        if self.banned_bars.contains(&id) {
            return None;
        }
        let entity = self.entities.get(&id)?;
        match entity.health() {
            Some(health) => Some(health.bar_ratio()),
            None => {
                self.banned_bars.insert(id);
                None
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
