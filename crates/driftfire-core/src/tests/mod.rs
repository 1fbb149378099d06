//! Test module for determinism and integration tests.
//!
//! This module provides crate-level tests for the simulation:
//! - **Determinism tests**: Verify same seed produces identical results
//! - **Integration tests**: Test the full frame and physics pipeline
//! - **Helper functions**: Blueprint fixtures and setup utilities
//!
//! # Test Structure
//!
//! - `determinism.rs`: Tests that verify deterministic execution
//! - `integration.rs`: End-to-end tests of the simulation
//! - `helpers.rs`: Test setup utilities and factory functions

mod determinism;
mod helpers;
mod integration;

// Re-export for convenience
pub use helpers::*;
