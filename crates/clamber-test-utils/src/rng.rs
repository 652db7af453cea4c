//! Seeded randomness for scenario generation.

use std::f64::consts::TAU;

use clamber_core::Contact;
use nalgebra::Vector3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic generator for randomized scenarios.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Horizontal displacement with a uniform heading and a length in `[min, max)`.
pub fn random_step<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> Vector3<f64> {
    let heading = rng.gen_range(0.0..TAU);
    let length = rng.gen_range(min..max);
    Vector3::new(length * heading.cos(), length * heading.sin(), 0.0)
}

/// Contact on a horizontal surface at a point drawn uniformly from the box
/// spanned by `lo` and `hi`.
pub fn random_ground_contact<R: Rng + ?Sized>(
    rng: &mut R,
    lo: &Vector3<f64>,
    hi: &Vector3<f64>,
) -> Contact {
    let position = Vector3::from_fn(|i, _| rng.gen_range(lo[i]..hi[i]));
    Contact::horizontal(position)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_steps() {
        let mut a = seeded_rng(42);
        let mut b = seeded_rng(42);
        for _ in 0..10 {
            assert_eq!(random_step(&mut a, 0.1, 0.5), random_step(&mut b, 0.1, 0.5));
        }
    }

    #[test]
    fn steps_stay_on_the_ground_within_range() {
        let mut rng = seeded_rng(7);
        for _ in 0..100 {
            let step = random_step(&mut rng, 0.1, 0.5);
            assert!(step.z.abs() < f64::EPSILON);
            assert!((0.1 - 1e-12..0.5).contains(&step.norm()));
        }
    }

    #[test]
    fn ground_contacts_fall_inside_the_box() {
        let mut rng = seeded_rng(3);
        let (lo, hi) = (Vector3::new(0.2, -0.3, 0.0), Vector3::new(0.6, 0.3, 0.9));
        for _ in 0..100 {
            let contact = random_ground_contact(&mut rng, &lo, &hi);
            assert!((0..3).all(|i| (lo[i]..hi[i]).contains(&contact.position[i])));
            assert_eq!(contact.normal, Vector3::z_axis());
        }
    }
}
