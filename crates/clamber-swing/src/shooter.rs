//! Configuration shooter over a reference path.

use clamber_core::ConfigPath;
use nalgebra::DVector;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::constraints::LockedJoint;

/// Draws configurations from a reference path at uniformly random times.
///
/// Seeded, so two shooters built from the same inputs produce the same
/// sequence. Locked joints are written into every shot.
#[derive(Debug, Clone)]
pub struct PathShooter {
    path: ConfigPath,
    locked: Vec<LockedJoint>,
    rng: ChaCha8Rng,
}

impl PathShooter {
    /// Shooter over `reference`, with the trailing extra coordinate dropped
    /// unless `keep_extra_dof`.
    pub fn new(reference: &ConfigPath, keep_extra_dof: bool, locked: Vec<LockedJoint>, seed: u64) -> Self {
        let path = if keep_extra_dof {
            reference.clone()
        } else {
            reference.without_extra_dof()
        };
        Self {
            path,
            locked,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn path(&self) -> &ConfigPath {
        &self.path
    }

    pub fn dim(&self) -> usize {
        self.path.dim()
    }

    /// Next random configuration.
    pub fn shoot(&mut self) -> DVector<f64> {
        let (start, end) = (self.path.start(), self.path.end());
        let t = if end > start {
            self.rng.gen_range(start..=end)
        } else {
            start
        };
        let mut q = self.path.at(t);
        for joint in &self.locked {
            joint.apply(&mut q);
        }
        q
    }
}

impl Iterator for PathShooter {
    type Item = DVector<f64>;

    fn next(&mut self) -> Option<DVector<f64>> {
        Some(self.shoot())
    }
}
