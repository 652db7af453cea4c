//! Swing-limb trajectory synthesis for multi-contact planning.
//!
//! Given two consecutive stances and the body reference path between them,
//! this crate builds one continuous curve for the effector that changes
//! contact:
//!
//! 1. **Waypoints** — sample the effector along the reference path and
//!    reduce straight or planar sweeps to a clearance-raising profile
//! 2. **Takeoff / Landing** — closed-form Bezier curves lifting off and
//!    settling along the contact normal
//! 3. **Middle phase** — a QP over Bezier control points matching both
//!    boundaries in position, velocity and acceleration
//! 4. **Hand-off** — constraints and a configuration shooter for the
//!    roadmap extender
//!
//! # Architecture
//!
//! ```text
//! synthesize_swing_curve ──► SwingOutcome ──► effector_rrt ──► RoadmapExtender
//!   (waypoints, bezier,        Swing(plan)       (ConstraintSet,
//!    BoundaryValueSolver)    | Reference(path)    PathShooter)
//! ```
//!
//! A failed middle-phase solve is not an error: the synthesizer falls back
//! to the reference path and says why in [`ReferenceReason`].

pub mod bezier;
pub mod constraints;
pub mod extender;
pub mod shooter;
pub mod solver;
pub mod synthesis;
pub mod waypoints;

pub use bezier::{BezierCurve, BoundaryConditions, SwingCurve, boundary_curve, constant_waypoints};
pub use constraints::{
    ComConstraint, ConstraintSet, ContactConstraint, EffectorConstraint, LockedJoint,
    PoseConstraint,
};
pub use extender::{EffectorRrtRequest, RoadmapExtender, effector_rrt};
pub use shooter::PathShooter;
pub use solver::{BoundaryValueSolver, FitPoint, QpBoundarySolver};
pub use synthesis::{
    ReferenceReason, SwingOptions, SwingOutcome, SwingPlan, synthesize_swing_curve,
    transitioning_effector,
};
pub use waypoints::{
    WaypointSequence, WaypointShape, classify, classify_and_reduce, is_line, is_planar,
    reduce_to_apex, sample_waypoints,
};
