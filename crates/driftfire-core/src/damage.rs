//! Damage resolution pipeline.
//!
//! A hit is described by a [`DamageInstance`]: who fired it, who created the
//! firing object, the team it fights for, per-category amounts and flags.
//! [`deal_damage`] resolves one instance against one [`Damageable`] target:
//!
//! 1. Reject while the creator's own shot is still inside the
//!    [`INVULNERABILITY_WINDOW`].
//! 2. Reject unless the instance hurts allies or its team is an enemy of
//!    the target's team.
//! 3. Sum every category scaled by the target's immunity.
//! 4. Stop if nothing applies.
//! 5. Drain the instance's pools if it is piercing.
//! 6. Subtract from the target and record the dealer.
//!
//! # Example
//!
//! ```
//! use driftfire_core::damage::{deal_damage, DamageCategory, DamageInstance, DamageOutcome, DamagePayload, DamageTarget};
//! use driftfire_core::entity::{EntityId, Health};
//! use driftfire_core::team::Team;
//!
//! let mut health = Health::new(50.0);
//! let mut target = DamageTarget::new(EntityId::new(2), Team::new(2), &mut health);
//! let mut hit = DamageInstance::new(
//!     EntityId::new(9),
//!     Team::new(1),
//!     DamagePayload::single(DamageCategory::Physical, 10.0),
//! );
//!
//! assert_eq!(deal_damage(&mut target, &mut hit), DamageOutcome::Applied { amount: 10.0 });
//! assert_eq!(health.hp, 40.0);
//! ```

use std::collections::BTreeMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::entity::{EntityId, Health};
use crate::team::Team;

/// Seconds after launch during which a shot cannot hurt its own creator.
pub const INVULNERABILITY_WINDOW: f32 = 0.25;

/// Kind of damage, matched against per-category immunities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DamageCategory {
    /// Kinetic impacts and rams.
    Physical,
    /// Lasers and plasma.
    Energy,
    /// Blast damage.
    Explosive,
}

bitflags! {
    /// Behaviour switches carried by a damage payload.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DamageFlags: u8 {
        /// Keeps going after a hit, losing whatever it dealt.
        const PIERCING = 1 << 0;
        /// Damages allied teams too.
        const HURTS_ALLIES = 1 << 1;
        /// Delivered by a projectile.
        const IS_PROJECTILE = 1 << 2;
    }
}

/// Per-category damage amounts plus flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DamagePayload {
    /// Damage per category.
    pub amounts: BTreeMap<DamageCategory, f32>,
    /// Behaviour switches.
    #[serde(default)]
    pub flags: DamageFlags,
}

impl DamagePayload {
    /// Payload dealing `amount` of a single category.
    #[must_use]
    pub fn single(category: DamageCategory, amount: f32) -> Self {
        Self {
            amounts: BTreeMap::from([(category, amount)]),
            flags: DamageFlags::empty(),
        }
    }

    /// Adds (or replaces) the amount for `category`.
    #[must_use]
    pub fn with(mut self, category: DamageCategory, amount: f32) -> Self {
        self.amounts.insert(category, amount);
        self
    }

    /// Sets the given flags.
    #[must_use]
    pub fn with_flags(mut self, flags: DamageFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Sum over all categories, ignoring immunities.
    #[must_use]
    pub fn total(&self) -> f32 {
        self.amounts.values().copied().filter(|a| *a > 0.0).sum()
    }

    /// Returns `true` once every pool is drained.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.total() <= 0.0
    }
}

/// One hit's damage and metadata.
///
/// Built fresh for every contact and consumed by [`deal_damage`]. The team is
/// a copy so the instance stays valid if its source is destroyed mid-step.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageInstance {
    /// Object that touched the target (projectile, rammer).
    pub source: EntityId,
    /// Entity that created the source, if any.
    pub creator: Option<EntityId>,
    /// Team the damage fights for.
    pub team: Team,
    /// Remaining amounts and flags.
    pub payload: DamagePayload,
    /// Seconds since the source was launched.
    pub lifetime: f32,
}

impl DamageInstance {
    /// Instance with no creator and zero lifetime.
    #[must_use]
    pub fn new(source: EntityId, team: Team, payload: DamagePayload) -> Self {
        Self {
            source,
            creator: None,
            team,
            payload,
            lifetime: 0.0,
        }
    }

    /// Records the creating entity.
    #[must_use]
    pub fn created_by(mut self, creator: EntityId) -> Self {
        self.creator = Some(creator);
        self
    }

    /// Sets the elapsed lifetime.
    #[must_use]
    pub fn aged(mut self, lifetime: f32) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Entity credited with the damage.
    #[must_use]
    pub fn dealer(&self) -> EntityId {
        self.creator.unwrap_or(self.source)
    }

    /// Returns `true` while the creator is protected from this instance.
    #[must_use]
    pub fn protects(&self, target: EntityId) -> bool {
        self.creator == Some(target) && self.lifetime < INVULNERABILITY_WINDOW
    }
}

/// Anything the pipeline can hurt.
pub trait Damageable {
    /// Id of the damaged entity.
    fn owner(&self) -> EntityId;
    /// Team of the damaged entity.
    fn team(&self) -> Team;
    /// Immunity to `category`, in `[0, 1]`.
    fn immunity(&self, category: DamageCategory) -> f32;
    /// Subtracts `amount` and remembers `dealer`.
    fn receive_damage(&mut self, amount: f32, dealer: EntityId);
}

/// [`Damageable`] view over an entity's health.
#[derive(Debug)]
pub struct DamageTarget<'a> {
    id: EntityId,
    team: Team,
    health: &'a mut Health,
}

impl<'a> DamageTarget<'a> {
    /// Borrows `health` as the damage target for entity `id`.
    pub fn new(id: EntityId, team: Team, health: &'a mut Health) -> Self {
        Self { id, team, health }
    }

    /// Hit points remaining.
    #[must_use]
    pub fn hp(&self) -> f32 {
        self.health.hp
    }
}

impl Damageable for DamageTarget<'_> {
    fn owner(&self) -> EntityId {
        self.id
    }

    fn team(&self) -> Team {
        self.team
    }

    fn immunity(&self, category: DamageCategory) -> f32 {
        self.health.immunity(category)
    }

    fn receive_damage(&mut self, amount: f32, dealer: EntityId) {
        self.health.hp -= amount;
        self.health.last_attacker = Some(dealer);
    }
}

/// Which path [`deal_damage`] took.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// The target created the source and the shot is still too young.
    Invulnerable,
    /// Same side and the instance does not hurt allies.
    NotHostile,
    /// Immunities (or drained pools) left nothing to apply.
    NoEffect,
    /// Damage was subtracted from the target.
    Applied {
        /// Total subtracted.
        amount: f32,
    },
}

impl DamageOutcome {
    /// Damage dealt, zero unless applied.
    #[must_use]
    pub const fn amount(self) -> f32 {
        match self {
            Self::Applied { amount } => amount,
            _ => 0.0,
        }
    }

    /// Returns `true` if damage was subtracted.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Resolves one damage instance against one target.
///
/// Piercing instances lose, per category, whatever this target absorbed, so
/// the same instance hits weaker on every following target.
pub fn deal_damage<T: Damageable + ?Sized>(
    target: &mut T,
    instance: &mut DamageInstance,
) -> DamageOutcome {
    let owner = target.owner();
    if instance.protects(owner) {
        trace!(target_id = %owner, lifetime = instance.lifetime, "creator invulnerable");
        return DamageOutcome::Invulnerable;
    }

    let target_team = target.team();
    if !instance.payload.flags.contains(DamageFlags::HURTS_ALLIES)
        && !instance.team.is_enemy_of(target_team)
    {
        return DamageOutcome::NotHostile;
    }

    let applied: Vec<(DamageCategory, f32)> = instance
        .payload
        .amounts
        .iter()
        .map(|(&category, &amount)| {
            let scaled = amount.max(0.0) * (1.0 - target.immunity(category));
            (category, scaled)
        })
        .collect();
    let total: f32 = applied.iter().map(|(_, amount)| amount).sum();
    if total <= 0.0 {
        return DamageOutcome::NoEffect;
    }

    if instance.payload.flags.contains(DamageFlags::PIERCING) {
        for (category, amount) in applied {
            if let Some(pool) = instance.payload.amounts.get_mut(&category) {
                *pool = (*pool - amount).max(0.0);
            }
        }
    }

    let dealer = instance.dealer();
    target.receive_damage(total, dealer);
    trace!(target_id = %owner, dealer = %dealer, amount = total, "damage applied");
    DamageOutcome::Applied { amount: total }
}
