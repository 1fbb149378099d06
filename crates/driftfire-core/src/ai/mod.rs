//! AI: steering behaviours, transition conditions and the per-entity
//! controller that ties them together.

pub mod behaviour;
pub mod condition;
pub mod controller;

pub use behaviour::{
    BehaviourInRelationToTarget, ChaseStyle, MovementBehaviourData, MovementMode, SteeringOutput,
};
pub use condition::{Comparison, Condition, ConditionData, ConditionState, Population};
pub use controller::{AiController, BehaviourState, BehaviourSwitch, ConditionContext, Transition};
