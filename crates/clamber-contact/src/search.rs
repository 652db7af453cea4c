//! Best-first selection of the next stance.

use std::collections::BTreeMap;

use clamber_core::{
    CandidateStance, PlanError, Projection, RejectReason, StabilityOracle, Stance,
    StanceProjector,
};

use crate::helper::ContactGenHelper;

/// Whether the search found a stance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionStatus {
    Success,
    /// Every candidate was rejected.
    NoContactFound,
}

/// Result of [`select_first_feasible`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionReport {
    pub status: ProjectionStatus,
    /// Projected stance of the selected candidate.
    pub result: Option<Stance>,
    /// The selected candidate as enumerated, before projection.
    pub candidate: Option<CandidateStance>,
    /// Number of candidates projected, including the selected one.
    pub tried: usize,
    /// Rejection count per reason.
    pub rejections: BTreeMap<RejectReason, usize>,
}

impl ProjectionReport {
    pub fn is_success(&self) -> bool {
        self.status == ProjectionStatus::Success
    }

    /// The selected stance, or [`PlanError::SearchExhausted`].
    pub fn into_result(self) -> Result<Stance, PlanError> {
        match self.result {
            Some(stance) if self.status == ProjectionStatus::Success => Ok(stance),
            _ => Err(PlanError::SearchExhausted { tried: self.tried }),
        }
    }
}

/// Return the first candidate of `helper` that `projector` accepts and, when
/// the helper asks for it, that `stability` declares stable.
///
/// Greedy and non-backtracking: candidates are tried in priority order and
/// the search stops at the first admissible one. Every candidate before the
/// returned one was rejected.
pub fn select_first_feasible<P, S>(
    helper: &ContactGenHelper,
    projector: &P,
    stability: &S,
) -> ProjectionReport
where
    P: StanceProjector + ?Sized,
    S: StabilityOracle + ?Sized,
{
    let acceleration = helper.acceleration();
    let mut tried = 0;
    let mut rejections = BTreeMap::new();

    for candidate in helper.candidates() {
        tried += 1;
        let verdict = match projector.project(&candidate, &helper.target_root) {
            Projection::Accepted(stance)
                if helper.check_stability()
                    && !stability.supports_acceleration(
                        &stance,
                        &acceleration,
                        helper.robustness_threshold(),
                    ) =>
            {
                Err(RejectReason::Unstable)
            }
            Projection::Accepted(stance) => Ok(stance),
            Projection::Rejected(reason) => Err(reason),
        };

        match verdict {
            Ok(stance) => {
                log::info!(
                    "Selected stance with contacts {:?} after {tried} candidates",
                    stance.contact_order()
                );
                return ProjectionReport {
                    status: ProjectionStatus::Success,
                    result: Some(stance),
                    candidate: Some(candidate),
                    tried,
                    rejections,
                };
            }
            Err(reason) => {
                log::debug!(
                    "Rejected candidate {:?} + {:?}: {reason}",
                    candidate.stance.contact_order(),
                    candidate.created
                );
                *rejections.entry(reason).or_insert(0) += 1;
            }
        }
    }

    log::info!("No contact found: {tried} candidates rejected");
    ProjectionReport {
        status: ProjectionStatus::NoContactFound,
        result: None,
        candidate: None,
        tried,
        rejections,
    }
}
