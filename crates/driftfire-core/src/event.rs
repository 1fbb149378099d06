//! Simulation events for render, audio and UI layers.
//!
//! The simulation never calls out to presentation code. Instead it records
//! a [`SimEvent`] whenever something observable happens; the host drains
//! them once per step with [`EventLog::take_events`].

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, EntityTag};

/// Why an entity left the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DestroyCause {
    /// Health reached zero.
    Killed,
    /// Lifetime ran out.
    Expired,
    /// A projectile used up on impact.
    Consumed,
    /// Removed by the host.
    Removed,
}

/// Something observable that happened during a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// A new entity entered the simulation.
    Spawned {
        /// The new entity.
        entity: EntityId,
        /// Its kind.
        tag: EntityTag,
        /// Entity that created it, if any.
        parent: Option<EntityId>,
    },
    /// Damage was applied to a target.
    DamageDealt {
        /// The damaged entity.
        target: EntityId,
        /// Entity credited with the damage.
        dealer: EntityId,
        /// Amount subtracted.
        amount: f32,
    },
    /// An entity was removed.
    EntityDestroyed {
        /// The removed entity.
        entity: EntityId,
        /// Why it was removed.
        cause: DestroyCause,
        /// Last entity to damage it, for kill credit.
        killer: Option<EntityId>,
    },
    /// An AI switched behaviour state.
    BehaviourSwitched {
        /// The AI entity.
        entity: EntityId,
        /// State left.
        from: String,
        /// State entered.
        to: String,
    },
}

/// Ordered buffer of events.
///
/// # Example
///
/// ```
/// use driftfire_core::entity::{EntityId, EntityTag};
/// use driftfire_core::event::{EventLog, SimEvent};
///
/// let mut log = EventLog::new();
/// log.push(SimEvent::Spawned { entity: EntityId::new(1), tag: EntityTag::Ship, parent: None });
///
/// assert_eq!(log.take_events().len(), 1);
/// assert!(log.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<SimEvent>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an event.
    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    /// Drains every recorded event in the order it was recorded.
    pub fn take_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Events recorded since the last drain.
    #[must_use]
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_preserves_order_and_clears() {
        let mut log = EventLog::new();
        log.push(SimEvent::DamageDealt {
            target: EntityId::new(1),
            dealer: EntityId::new(2),
            amount: 3.0,
        });
        log.push(SimEvent::EntityDestroyed {
            entity: EntityId::new(1),
            cause: DestroyCause::Killed,
            killer: Some(EntityId::new(2)),
        });

        let events = log.take_events();
        assert!(matches!(events[0], SimEvent::DamageDealt { .. }));
        assert!(matches!(
            events[1],
            SimEvent::EntityDestroyed {
                cause: DestroyCause::Killed,
                ..
            }
        ));
        assert!(log.take_events().is_empty());
    }

    #[test]
    fn events_serialize_for_telemetry() {
        let event = SimEvent::BehaviourSwitched {
            entity: EntityId::new(5),
            from: "hunt".into(),
            to: "flee".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("BehaviourSwitched"));
        let back: SimEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
