//! Stance and reference-path builders shared by the integration tests.

use clamber_core::{ConfigPath, Contact, EffectorPriority, Stance};
use nalgebra::{DVector, Vector3};

use crate::mocks::PointFootModel;

pub const BIPED_EFFECTORS: [&str; 4] = ["left_foot", "right_foot", "left_hand", "right_hand"];

/// Contact on flat ground at `(x, y, z)`.
pub fn ground(x: f64, y: f64, z: f64) -> Contact {
    Contact::horizontal(Vector3::new(x, y, z))
}

/// Feet first, then hands.
pub fn biped_priority() -> EffectorPriority {
    EffectorPriority::new(BIPED_EFFECTORS).expect("fixed effector list is valid")
}

/// Point-foot humanoid standing on both feet, hands hanging free.
pub fn biped_stance(model: &PointFootModel) -> Stance {
    let q = model.configuration(&[
        Vector3::new(0.0, 0.1, 0.0),
        Vector3::new(0.0, -0.1, 0.0),
        Vector3::new(0.1, 0.25, 0.8),
        Vector3::new(0.1, -0.25, 0.8),
    ]);
    Stance::new(q)
        .with_contact("left_foot", ground(0.0, 0.1, 0.0))
        .with_contact("right_foot", ground(0.0, -0.1, 0.0))
}

/// Reference path over `[0, duration]` moving `effector` through
/// `positions` while the rest of `base` stays put.
pub fn effector_path(
    model: &PointFootModel,
    base: &DVector<f64>,
    effector: &str,
    positions: &[Vector3<f64>],
    duration: f64,
) -> ConfigPath {
    let configurations = positions
        .iter()
        .map(|p| model.with_effector_at(base, effector, p))
        .collect();
    ConfigPath::uniform(0.0, duration, configurations).expect("valid fixture path")
}
