//! Three-phase swing curve synthesis.
//!
//! A swinging effector takes off from its old contact, flies through the
//! middle phase and lands on its new contact:
//!
//! ```text
//! |-- takeoff --|-------------- middle --------------|-- landing --|
//!  boundary curve   QP fit to classified waypoints     boundary curve
//! ```
//!
//! Takeoff and landing are fixed heuristics (short lift along the surface
//! normal). The middle curve matches both in position, velocity and
//! acceleration and otherwise follows the effector waypoints sampled from
//! the body reference path.

use clamber_core::{
    ConfigPath, Kinematics, PlanError, ReferencePath, SolveFailure, Stance, SwingConfig,
};
use nalgebra::Vector3;

use crate::bezier::{BezierCurve, BoundaryConditions, SwingCurve, boundary_curve};
use crate::constraints::ConstraintSet;
use crate::solver::{BoundaryValueSolver, FitPoint};
use crate::waypoints::{WaypointSequence, WaypointShape, classify_and_reduce, sample_waypoints};

/// Per-call options of the synthesizer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwingOptions {
    /// Re-optimization passes the extender runs on its path.
    pub num_optimizations: usize,
    /// Keep the trailing extra coordinate of reference configurations.
    pub keep_extra_dof: bool,
    /// Joints whose full pose follows `reference_full_body`.
    pub constrained_joint_poses: Vec<String>,
    /// Joints held at their start values.
    pub locked_joints: Vec<String>,
    pub reference_full_body: Option<ConfigPath>,
    /// Seed of the configuration shooter.
    pub seed: u64,
}

/// Why the synthesizer returned the body reference path instead of a curve.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceReason {
    /// The effector barely moves.
    NegligibleTravel { travel: f64 },
    /// The middle-phase solve failed.
    SolverFailed(SolveFailure),
}

/// A synthesized swing and the constraints to track it.
#[derive(Debug, Clone, PartialEq)]
pub struct SwingPlan {
    pub effector: String,
    /// Distance between the old and the new placement.
    pub travel: f64,
    pub curve: SwingCurve,
    /// Waypoints the middle phase was fitted to, after reduction.
    pub waypoints: WaypointSequence,
    pub shape: WaypointShape,
    pub constraints: ConstraintSet,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SwingOutcome {
    /// Use the body reference path as is.
    Reference {
        path: ConfigPath,
        reason: ReferenceReason,
    },
    Swing(Box<SwingPlan>),
}

impl SwingOutcome {
    pub fn is_swing(&self) -> bool {
        matches!(self, Self::Swing(_))
    }

    pub fn curve(&self) -> Option<&SwingCurve> {
        match self {
            Self::Swing(plan) => Some(&plan.curve),
            Self::Reference { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Transition analysis
// ---------------------------------------------------------------------------

/// The effector that makes a new contact in `next`.
///
/// With several creations the first in `next`'s contact order is used.
pub fn transitioning_effector(start: &Stance, next: &Stance) -> Result<String, PlanError> {
    let created = next.contact_creations(start);
    match created.as_slice() {
        [] => Err(PlanError::UnsupportedTransition { created: 0 }),
        [only] => Ok(only.clone()),
        [first, ..] => {
            log::warn!(
                "Transition creates {} contacts {created:?}; swinging only {first}",
                created.len()
            );
            Ok(first.clone())
        }
    }
}

/// Distance between the effector's placement in `start` and in `next`.
///
/// A stance where the effector is free contributes its kinematic position.
pub fn effector_distance<K>(
    kinematics: &K,
    effector: &str,
    start: &Stance,
    next: &Stance,
) -> Result<f64, PlanError>
where
    K: Kinematics + ?Sized,
{
    let position = |stance: &Stance| match stance.contact(effector) {
        Some(contact) => Ok(contact.position),
        None => kinematics.position_of(effector, &stance.configuration),
    };
    Ok((position(next)? - position(start)?).norm())
}

/// Direction in which the effector leaves or approaches its contact in
/// `stance`.
pub fn clearance_direction(stance: &Stance, effector: &str, config: &SwingConfig) -> Vector3<f64> {
    if config.follow_contact_normals {
        if let Some(contact) = stance.contact(effector) {
            return contact.normal.into_inner();
        }
    }
    Vector3::z()
}

/// Lift off from rest at `c0` to `takeoff_offset` along `direction`.
pub fn takeoff_conditions(c0: Vector3<f64>, direction: Vector3<f64>, config: &SwingConfig) -> BoundaryConditions {
    BoundaryConditions {
        c1: c0 + direction * config.takeoff_offset,
        dc1: direction * config.takeoff_speed,
        ..BoundaryConditions::at_rest(c0, c0)
    }
}

/// Descend from `landing_offset` along `direction` to rest at `c1`.
pub fn landing_conditions(c1: Vector3<f64>, direction: Vector3<f64>, config: &SwingConfig) -> BoundaryConditions {
    BoundaryConditions {
        c0: c1 + direction * config.landing_offset,
        dc0: -direction * config.landing_speed,
        ..BoundaryConditions::at_rest(c1, c1)
    }
}

/// Map waypoints to normalized middle-phase time, dropping those that fall
/// in the takeoff or landing window.
pub fn fit_points(
    waypoints: &WaypointSequence,
    path_length: f64,
    takeoff_duration: f64,
    middle_duration: f64,
) -> Vec<FitPoint> {
    waypoints
        .points()
        .iter()
        .filter_map(|&(index, position)| {
            let t = waypoints.time_fraction(index) * path_length;
            let u = (t - takeoff_duration) / middle_duration;
            (u > 0.0 && u < 1.0).then_some(FitPoint { u, position })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

/// Synthesize the swing of the effector that `next` brings into contact.
///
/// Returns [`SwingOutcome::Reference`] when the effector travels less than
/// `config.min_travel` or when the middle-phase solve fails. Hard input
/// errors (no created contact, too short a path, degenerate waypoints,
/// unknown joints) are returned as [`PlanError`].
pub fn synthesize_swing_curve<K, B>(
    kinematics: &K,
    solver: &B,
    reference: &ConfigPath,
    start: &Stance,
    next: &Stance,
    options: &SwingOptions,
    config: &SwingConfig,
) -> Result<SwingOutcome, PlanError>
where
    K: Kinematics + ?Sized,
    B: BoundaryValueSolver + ?Sized,
{
    config.validate()?;
    let effector = transitioning_effector(start, next)?;

    let travel = effector_distance(kinematics, &effector, start, next)?;
    if travel < config.min_travel {
        log::debug!("{effector} travels {travel:.4}, keeping reference path");
        return Ok(SwingOutcome::Reference {
            path: reference.clone(),
            reason: ReferenceReason::NegligibleTravel { travel },
        });
    }

    let length = reference.length();
    let required = config.takeoff_duration + config.landing_duration;
    let middle_duration = length - required;
    if middle_duration <= 0.0 {
        return Err(PlanError::PathTooShort { length, required });
    }

    let (t_start, t_end) = reference.time_range();
    let takeoff_bc = takeoff_conditions(
        kinematics.position_of(&effector, &reference.sample(t_start))?,
        clearance_direction(start, &effector, config),
        config,
    );
    let landing_bc = landing_conditions(
        kinematics.position_of(&effector, &reference.sample(t_end))?,
        clearance_direction(next, &effector, config),
        config,
    );

    let sampled = sample_waypoints(kinematics, &effector, reference, config)?;
    let (waypoints, shape) = classify_and_reduce(&sampled, travel, config)?;
    let fit = fit_points(&waypoints, length, config.takeoff_duration, middle_duration);

    let phases = solve_phases(solver, &takeoff_bc, &landing_bc, &fit, middle_duration, config);
    let [takeoff, middle, landing] = match phases {
        Ok(phases) => phases,
        Err(failure) => {
            log::warn!("Swing solve for {effector} failed, using reference path: {failure}");
            return Ok(SwingOutcome::Reference {
                path: reference.clone(),
                reason: ReferenceReason::SolverFailed(failure),
            });
        }
    };

    let curve = SwingCurve::new(t_start, takeoff, middle, landing);
    let constraints =
        ConstraintSet::build(kinematics, start, next, reference, &effector, curve.clone(), options)?;
    log::info!(
        "Synthesized swing of {effector}: travel {travel:.3}, {shape:?} waypoints, {} constraints",
        constraints.count()
    );

    Ok(SwingOutcome::Swing(Box::new(SwingPlan {
        effector,
        travel,
        curve,
        waypoints,
        shape,
        constraints,
    })))
}

fn solve_phases<B>(
    solver: &B,
    takeoff_bc: &BoundaryConditions,
    landing_bc: &BoundaryConditions,
    fit: &[FitPoint],
    middle_duration: f64,
    config: &SwingConfig,
) -> Result<[BezierCurve; 3], SolveFailure>
where
    B: BoundaryValueSolver + ?Sized,
{
    let takeoff = boundary_curve(takeoff_bc, config.takeoff_duration, config.boundary_degree)?;
    let landing = boundary_curve(landing_bc, config.landing_duration, config.boundary_degree)?;
    let middle_bc = BoundaryConditions::between(&takeoff, &landing);
    let middle = solver.solve(&middle_bc, fit, middle_duration)?;
    if (middle.duration() - middle_duration).abs() > 1e-9 {
        return Err(SolveFailure::Setup(format!(
            "middle curve lasts {} instead of {middle_duration}",
            middle.duration()
        )));
    }
    Ok([takeoff, middle, landing])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use clamber_core::Contact;
    use clamber_test_utils::ground;
    use nalgebra::DVector;

    fn stance() -> Stance {
        Stance::new(DVector::zeros(6))
            .with_contact("left", ground(0.0, 0.1, 0.0))
            .with_contact("right", ground(0.0, -0.1, 0.0))
    }

    #[test]
    fn single_creation_is_the_swing_effector() {
        let start = stance();
        let mut next = start.clone();
        next.add_contact("left", ground(0.3, 0.1, 0.0));
        assert_eq!(transitioning_effector(&start, &next).unwrap(), "left");
    }

    #[test]
    fn no_creation_is_unsupported() {
        let start = stance();
        let mut next = start.clone();
        next.remove_contact("left");
        assert!(matches!(
            transitioning_effector(&start, &next),
            Err(PlanError::UnsupportedTransition { created: 0 })
        ));
    }

    #[test]
    fn several_creations_pick_first_in_contact_order() {
        let start = stance();
        let mut next = start.clone();
        next.add_contact("right", ground(0.3, -0.1, 0.0));
        next.add_contact("left", ground(0.3, 0.1, 0.0));
        assert_eq!(transitioning_effector(&start, &next).unwrap(), "right");
    }

    #[test]
    fn clearance_follows_normal_when_asked() {
        let wall = Contact::new(Vector3::zeros(), Vector3::new(-1.0, 0.0, 0.0)).unwrap();
        let stance = Stance::new(DVector::zeros(3)).with_contact("hand", wall);
        let mut config = SwingConfig::default();
        assert_eq!(clearance_direction(&stance, "hand", &config), Vector3::z());
        config.follow_contact_normals = true;
        assert_eq!(clearance_direction(&stance, "hand", &config), Vector3::new(-1.0, 0.0, 0.0));
        assert_eq!(clearance_direction(&stance, "foot", &config), Vector3::z());
    }

    #[test]
    fn takeoff_and_landing_heuristics() {
        let config = SwingConfig::default();
        let up = takeoff_conditions(Vector3::new(1.0, 0.0, 0.0), Vector3::z(), &config);
        assert_relative_eq!(up.c1, Vector3::new(1.0, 0.0, 0.02));
        assert_relative_eq!(up.dc1, Vector3::new(0.0, 0.0, 0.2));
        assert_eq!(up.dc0, Vector3::zeros());

        let down = landing_conditions(Vector3::new(2.0, 0.0, 0.0), Vector3::z(), &config);
        assert_relative_eq!(down.c0, Vector3::new(2.0, 0.0, 0.02));
        assert_relative_eq!(down.dc0, Vector3::new(0.0, 0.0, -0.2));
        assert_eq!(down.c1, Vector3::new(2.0, 0.0, 0.0));
        assert_eq!(down.ddc1, Vector3::zeros());
    }

    #[test]
    fn fit_points_skip_boundary_windows() {
        let seq = WaypointSequence::new(
            "foot",
            (0..11_i32).map(|i| Vector3::new(f64::from(i), 0.0, 0.0)).collect(),
        );
        // Path of length 1.0: samples every 0.1, middle phase [0.2, 0.8].
        let fit = fit_points(&seq, 1.0, 0.2, 0.6);
        let xs: Vec<_> = fit.iter().map(|f| f.position.x).collect();
        assert_eq!(xs, [3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_relative_eq!(fit[2].u, 0.5, epsilon = 1e-12);
    }
}
