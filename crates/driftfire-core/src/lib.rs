//! # Driftfire Core
//!
//! 2D space-combat simulation core for Driftfire.
//!
//! This crate provides the deterministic simulation engine: AI steering and
//! behaviour switching, constrained ship movement, damage resolution and the
//! object registry every other system queries.
//!
//! ## Architecture
//!
//! - **Registry**: live entities by id, category and team
//! - **Movement**: actions bound to inputs drive an [`mover::EntityMover`]
//!   that turns intent into clamped rotation and drift-damped velocity
//! - **AI**: a per-ship state machine of steering behaviours and transition
//!   conditions, producing the same intents a player would
//! - **Resolvers**: physics integration, then contacts and damage
//!
//! ## Usage
//!
//! ```rust
//! use driftfire_core::config::SimConfig;
//! use driftfire_core::simulation::Simulation;
//!
//! let config = SimConfig::from_json(r#"{
//!     "blueprints": { "drone": { "max_hp": 10.0 } },
//!     "spawners": [ { "name": "gate", "interval": 2.0, "options": ["drone"] } ]
//! }"#)?;
//! let mut sim = Simulation::from_config(config, 7)?;
//! sim.run(60);
//!
//! assert_eq!(sim.registry().len(), 1);
//! # Ok::<(), driftfire_core::config::ConfigError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod action;
pub mod ai;
pub mod body;
pub mod collision;
pub mod config;
pub mod damage;
pub mod entity;
pub mod event;
pub mod geometry;
pub mod mover;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod simulation;
pub mod spawner;
pub mod team;

pub use entity::{Entity, EntityId, ObjectCategory};
pub use simulation::Simulation;
pub use team::Team;

#[cfg(test)]
mod tests;
