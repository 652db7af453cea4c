//! Capabilities the planner needs from its collaborators.
//!
//! Collision checking, contact projection, whole-body kinematics and
//! stability analysis live outside this workspace. The planner only talks to
//! them through these traits.

use std::ops::Range;

use nalgebra::{DVector, Isometry3, Vector3};

use crate::error::PlanError;
use crate::types::{CandidateStance, ConfigPath, Stance};

// ---------------------------------------------------------------------------
// Kinematics
// ---------------------------------------------------------------------------

/// Forward kinematics of the robot, value in, value out.
///
/// Implementations must not keep per-query state, so one model can serve
/// concurrent queries.
pub trait Kinematics: Send + Sync {
    /// World pose of `effector` at `configuration`.
    fn pose_of(&self, effector: &str, configuration: &DVector<f64>) -> Result<Isometry3<f64>, PlanError>;

    /// Coordinates of `joint` inside a configuration vector.
    fn joint_range(&self, joint: &str) -> Option<Range<usize>>;

    /// World position of `effector` at `configuration`.
    fn position_of(&self, effector: &str, configuration: &DVector<f64>) -> Result<Vector3<f64>, PlanError> {
        self.pose_of(effector, configuration)
            .map(|pose| pose.translation.vector)
    }
}

// ---------------------------------------------------------------------------
// ReferencePath
// ---------------------------------------------------------------------------

/// A time-parameterized path through configuration space.
pub trait ReferencePath {
    /// `(start, end)` times.
    fn time_range(&self) -> (f64, f64);

    /// Configuration at time `t`.
    fn sample(&self, t: f64) -> DVector<f64>;

    fn length(&self) -> f64 {
        let (start, end) = self.time_range();
        end - start
    }
}

impl ReferencePath for ConfigPath {
    fn time_range(&self) -> (f64, f64) {
        (self.start(), self.end())
    }

    fn sample(&self, t: f64) -> DVector<f64> {
        self.at(t)
    }
}

// ---------------------------------------------------------------------------
// StanceProjector
// ---------------------------------------------------------------------------

/// Why a candidate stance was turned down.
///
/// Copy + static messages: rejections are frequent and must stay cheap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RejectReason {
    /// The projected configuration collides with the environment or itself.
    Collision,
    /// A requested contact could not be reached.
    Unreachable,
    /// The projection violates joint limits.
    JointLimits,
    /// The support contacts cannot resist the external acceleration.
    Unstable,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Collision => "collision",
            Self::Unreachable => "unreachable",
            Self::JointLimits => "joint limits",
            Self::Unstable => "unstable",
        };
        f.write_str(s)
    }
}

/// Outcome of projecting a candidate onto the environment.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// The candidate is collision free. Holds the stance with every requested
    /// contact placed.
    Accepted(Stance),
    Rejected(RejectReason),
}

/// Places requested contacts and checks the result for collisions.
pub trait StanceProjector: Send + Sync {
    fn project(&self, candidate: &CandidateStance, target_root: &DVector<f64>) -> Projection;
}

// ---------------------------------------------------------------------------
// StabilityOracle
// ---------------------------------------------------------------------------

/// Static/dynamic equilibrium test of a stance's support contacts.
pub trait StabilityOracle: Send + Sync {
    /// Whether the contacts of `stance` can produce `acceleration` with a
    /// stability margin of at least `robustness_threshold`.
    fn supports_acceleration(
        &self,
        stance: &Stance,
        acceleration: &Vector3<f64>,
        robustness_threshold: f64,
    ) -> bool;
}
