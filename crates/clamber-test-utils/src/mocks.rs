//! Mock implementations of the planner's collaborator traits.
//!
//! Provides a kinematic model whose configuration stores effector positions
//! directly, a projector driven by a predicate, and fixed stability oracles.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use clamber_core::{
    CandidateStance, Contact, Kinematics, PlanError, Projection, RejectReason,
    StabilityOracle, Stance, StanceProjector,
};
use nalgebra::{DVector, Isometry3, Translation3, Vector3};

// ---------------------------------------------------------------------------
// PointFootModel
// ---------------------------------------------------------------------------

/// Robot whose configuration is the concatenated world positions of its
/// effectors, followed by `extra_dof` ignored scalars.
///
/// Effector `i` lives at coordinates `3i..3i+3`. Each effector doubles as a
/// joint of the same name.
#[derive(Debug, Clone)]
pub struct PointFootModel {
    effectors: Vec<String>,
    extra_dof: usize,
}

impl PointFootModel {
    pub fn new<I, S>(effectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            effectors: effectors.into_iter().map(Into::into).collect(),
            extra_dof: 0,
        }
    }

    #[must_use]
    pub const fn with_extra_dof(mut self, extra_dof: usize) -> Self {
        self.extra_dof = extra_dof;
        self
    }

    pub fn config_dim(&self) -> usize {
        3 * self.effectors.len() + self.extra_dof
    }

    /// Configuration placing every effector at the given position.
    pub fn configuration(&self, positions: &[Vector3<f64>]) -> DVector<f64> {
        assert_eq!(positions.len(), self.effectors.len());
        let mut q = DVector::zeros(self.config_dim());
        for (i, p) in positions.iter().enumerate() {
            q.fixed_rows_mut::<3>(3 * i).copy_from(p);
        }
        q
    }

    /// Copy of `q` with `effector` moved to `position`.
    pub fn with_effector_at(&self, q: &DVector<f64>, effector: &str, position: &Vector3<f64>) -> DVector<f64> {
        let range = self.joint_range(effector).expect("unknown effector");
        let mut q = q.clone();
        q.rows_mut(range.start, 3).copy_from(position);
        q
    }
}

impl Kinematics for PointFootModel {
    fn pose_of(&self, effector: &str, configuration: &DVector<f64>) -> Result<Isometry3<f64>, PlanError> {
        let range = self
            .joint_range(effector)
            .ok_or_else(|| PlanError::UnknownEffector(effector.to_owned()))?;
        if configuration.len() < range.end {
            return Err(PlanError::Kinematics(format!(
                "configuration of size {} too small for {effector}",
                configuration.len()
            )));
        }
        let p = configuration.fixed_rows::<3>(range.start);
        Ok(Isometry3::from_parts(
            Translation3::new(p[0], p[1], p[2]),
            nalgebra::UnitQuaternion::identity(),
        ))
    }

    fn joint_range(&self, joint: &str) -> Option<Range<usize>> {
        let i = self.effectors.iter().position(|name| name == joint)?;
        Some(3 * i..3 * i + 3)
    }
}

// ---------------------------------------------------------------------------
// ScriptedProjector
// ---------------------------------------------------------------------------

type Predicate = Box<dyn Fn(&CandidateStance) -> bool + Send + Sync>;

/// Projector that accepts candidates matching a predicate.
///
/// Accepted candidates get the target root as configuration and their
/// requested contacts placed from a fixed table. A requested effector with
/// no placement is rejected as unreachable. Every call is recorded.
pub struct ScriptedProjector {
    accept: Predicate,
    placements: BTreeMap<String, Contact>,
    reject_reason: RejectReason,
    calls: Mutex<Vec<CandidateStance>>,
}

impl ScriptedProjector {
    pub fn accept_if(accept: impl Fn(&CandidateStance) -> bool + Send + Sync + 'static) -> Self {
        Self {
            accept: Box::new(accept),
            placements: BTreeMap::new(),
            reject_reason: RejectReason::Collision,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn accept_all() -> Self {
        Self::accept_if(|_| true)
    }

    pub fn reject_all() -> Self {
        Self::accept_if(|_| false)
    }

    /// Reject the first `n` candidates, accept the rest.
    pub fn reject_first(n: usize) -> Self {
        let seen = AtomicUsize::new(0);
        Self::accept_if(move |_| seen.fetch_add(1, Ordering::SeqCst) >= n)
    }

    #[must_use]
    pub fn with_placement(mut self, effector: impl Into<String>, contact: Contact) -> Self {
        self.placements.insert(effector.into(), contact);
        self
    }

    #[must_use]
    pub const fn with_reject_reason(mut self, reason: RejectReason) -> Self {
        self.reject_reason = reason;
        self
    }

    /// Candidates projected so far, in call order.
    pub fn calls(&self) -> Vec<CandidateStance> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

impl StanceProjector for ScriptedProjector {
    fn project(&self, candidate: &CandidateStance, target_root: &DVector<f64>) -> Projection {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(candidate.clone());
        }
        if !(self.accept)(candidate) {
            return Projection::Rejected(self.reject_reason);
        }
        let mut stance: Stance = candidate.stance.clone();
        if target_root.len() == stance.configuration.len() {
            stance.configuration.clone_from(target_root);
        }
        for effector in &candidate.created {
            let Some(contact) = self.placements.get(effector) else {
                return Projection::Rejected(RejectReason::Unreachable);
            };
            stance.add_contact(effector.clone(), contact.clone());
        }
        Projection::Accepted(stance)
    }
}

// ---------------------------------------------------------------------------
// Stability oracles
// ---------------------------------------------------------------------------

/// Stability oracle with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedStability(pub bool);

impl StabilityOracle for FixedStability {
    fn supports_acceleration(&self, _stance: &Stance, _acceleration: &Vector3<f64>, _robustness_threshold: f64) -> bool {
        self.0
    }
}

/// Stability oracle whose margin grows with the number of contacts.
///
/// `margin = margin_per_contact * num_contacts`, accepted when it reaches the
/// robustness threshold.
#[derive(Debug, Clone, Copy)]
pub struct MarginStability {
    pub margin_per_contact: f64,
}

impl StabilityOracle for MarginStability {
    fn supports_acceleration(&self, stance: &Stance, _acceleration: &Vector3<f64>, robustness_threshold: f64) -> bool {
        self.margin_per_contact * stance.num_contacts() as f64 >= robustness_threshold
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
