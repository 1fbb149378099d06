//! Transition predicates for the AI state machine.
//!
//! A [`Condition`] is pure configuration and may be shared between many
//! entities. Anything it needs to remember between calls (the rolled
//! duration of a [`Condition::RandomTimeout`]) lives in a per-entity
//! [`ConditionState`] slot owned by the controller.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, ObjectCategory};
use crate::registry::Registry;
use crate::team::{Team, TeamRelation};

/// What a population condition counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Population {
    /// Members of a registry category.
    Category(ObjectCategory),
    /// Targetable entities standing in a relation to the evaluating team.
    Team(TeamRelation),
}

/// How a count is compared against its threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    /// Satisfied when `count >= threshold`.
    #[default]
    AtLeast,
    /// Satisfied when `count <= threshold`.
    AtMost,
}

impl Comparison {
    /// Applies the comparison.
    #[must_use]
    pub const fn holds(self, count: usize, threshold: usize) -> bool {
        match self {
            Self::AtLeast => count >= threshold,
            Self::AtMost => count <= threshold,
        }
    }
}

/// A transition predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Condition {
    /// Satisfied once `duration` seconds have passed since the last switch.
    Timeout {
        /// Seconds to wait.
        duration: f32,
    },
    /// Like `Timeout` with a duration rolled uniformly from `[min, max]`
    /// on the first evaluation after each switch.
    RandomTimeout {
        /// Shortest wait.
        min: f32,
        /// Longest wait.
        max: f32,
    },
    /// Compares how many objects are within `range`.
    PopulationInRange {
        /// What to count.
        population: Population,
        /// Search radius around the entity.
        range: f32,
        /// Count compared against.
        threshold: usize,
        /// Direction of the comparison.
        #[serde(default)]
        comparison: Comparison,
    },
    /// Satisfied when the entity (and its substructure) has no guns.
    NoGunsLeft,
}

/// Snapshot handed to [`Condition::is_satisfied`].
#[derive(Debug, Clone, Copy)]
pub struct ConditionData<'a> {
    /// Current simulation time.
    pub now: f32,
    /// Time the active behaviour was entered.
    pub last_behaviour_change_time: f32,
    /// `true` on the first evaluation after a switch.
    pub first_condition_call: bool,
    /// Guns on the entity and its children.
    pub gun_count: usize,
    /// Entity position.
    pub position: Vec2,
    /// Entity team.
    pub team: Team,
    /// The evaluating entity, excluded from population counts.
    pub self_id: EntityId,
    /// Registry for population queries.
    pub registry: &'a Registry,
}

impl ConditionData<'_> {
    /// Seconds spent in the active behaviour.
    #[must_use]
    pub fn time_in_behaviour(&self) -> f32 {
        self.now - self.last_behaviour_change_time
    }
}

/// Per-entity memory for one condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionState {
    /// Duration rolled by a random timeout.
    pub rolled_duration: Option<f32>,
}

impl Condition {
    /// Evaluates the condition.
    ///
    /// `state` must be the slot belonging to this condition for this entity.
    pub fn is_satisfied<R: Rng + ?Sized>(
        &self,
        data: &ConditionData<'_>,
        state: &mut ConditionState,
        rng: &mut R,
    ) -> bool {
        match *self {
            Self::Timeout { duration } => data.time_in_behaviour() >= duration,
            Self::RandomTimeout { min, max } => {
                let duration = match state.rolled_duration {
                    Some(rolled) if !data.first_condition_call => rolled,
                    _ => {
                        let rolled = if max > min {
                            rng.gen_range(min..=max)
                        } else {
                            min
                        };
                        state.rolled_duration = Some(rolled);
                        rolled
                    }
                };
                data.time_in_behaviour() >= duration
            }
            Self::PopulationInRange {
                population,
                range,
                threshold,
                comparison,
            } => {
                let count = match population {
                    Population::Category(category) => data
                        .registry
                        .objects_in_range(category, data.position, range)
                        .into_iter()
                        .filter(|id| *id != data.self_id)
                        .count(),
                    Population::Team(relation) => data.registry.count_team_in_range(
                        data.team,
                        relation,
                        data.position,
                        range,
                        Some(data.self_id),
                    ),
                };
                comparison.holds(count, threshold)
            }
            Self::NoGunsLeft => data.gun_count == 0,
        }
    }
}
