//! Hand-off of a swing plan to the roadmap extender.

use clamber_core::{ConfigPath, Kinematics, PlanError, Stance, SwingConfig};
use nalgebra::DVector;

use crate::constraints::ConstraintSet;
use crate::shooter::PathShooter;
use crate::solver::BoundaryValueSolver;
use crate::synthesis::{SwingOptions, SwingOutcome, SwingPlan, synthesize_swing_curve};

/// Builds a constrained configuration path between two stances.
pub trait RoadmapExtender: Send + Sync {
    fn interpolate(&self, request: EffectorRrtRequest) -> Result<ConfigPath, PlanError>;
}

/// Everything the extender needs for one swing.
#[derive(Debug, Clone)]
pub struct EffectorRrtRequest {
    pub effector: String,
    pub constraints: ConstraintSet,
    pub shooter: PathShooter,
    pub start: DVector<f64>,
    pub goal: DVector<f64>,
    /// Body reference path, reduced like the shooter's.
    pub reference: ConfigPath,
    pub num_optimizations: usize,
    pub keep_extra_dof: bool,
    /// Largest constraint residual the extender may accept.
    pub error_threshold: f64,
}

impl EffectorRrtRequest {
    pub fn new(
        plan: SwingPlan,
        reference: &ConfigPath,
        start: &Stance,
        next: &Stance,
        options: &SwingOptions,
        config: &SwingConfig,
    ) -> Self {
        let shooter = PathShooter::new(
            reference,
            options.keep_extra_dof,
            plan.constraints.locked.clone(),
            options.seed,
        );
        Self {
            effector: plan.effector,
            constraints: plan.constraints,
            reference: shooter.path().clone(),
            shooter,
            start: start.configuration.clone(),
            goal: next.configuration.clone(),
            num_optimizations: options.num_optimizations,
            keep_extra_dof: options.keep_extra_dof,
            error_threshold: config.extender_error_threshold,
        }
    }
}

/// Plan the motion from `start` to `next`: synthesize the swing and let
/// `extender` build the path that tracks it.
///
/// When no swing is needed or the swing solve failed, `reference` is
/// returned unchanged.
#[allow(clippy::too_many_arguments)]
pub fn effector_rrt<K, B, E>(
    kinematics: &K,
    solver: &B,
    extender: &E,
    reference: &ConfigPath,
    start: &Stance,
    next: &Stance,
    options: &SwingOptions,
    config: &SwingConfig,
) -> Result<ConfigPath, PlanError>
where
    K: Kinematics + ?Sized,
    B: BoundaryValueSolver + ?Sized,
    E: RoadmapExtender + ?Sized,
{
    match synthesize_swing_curve(kinematics, solver, reference, start, next, options, config)? {
        SwingOutcome::Reference { path, .. } => Ok(path),
        SwingOutcome::Swing(plan) => {
            let request = EffectorRrtRequest::new(*plan, reference, start, next, options, config);
            log::info!(
                "Extending swing of {} with {} constraints",
                request.effector,
                request.constraints.count()
            );
            extender.interpolate(request)
        }
    }
}
