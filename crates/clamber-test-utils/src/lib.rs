//! Shared test fixtures and utilities for Clamber crates.
//!
//! Provides a point-foot kinematic model, scripted projection and stability
//! oracles, stance/path builders, and deterministic RNG setup.

pub mod fixtures;
pub mod mocks;
pub mod rng;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use fixtures::{BIPED_EFFECTORS, biped_priority, biped_stance, effector_path, ground};
pub use mocks::{FixedStability, MarginStability, PointFootModel, ScriptedProjector};
pub use rng::{random_ground_contact, random_step, seeded_rng};
