//! Per-query parameters of the contact-transition search.

use clamber_core::{
    CandidateStance, ContactSearchConfig, EffectorPriority, PlanError, Stance,
};
use nalgebra::{DVector, Vector3};

use crate::combinatorics::{CreationCombinations, MaintainCombinations};

/// Parameters of one stance search.
///
/// Immutable once built; [`candidates`](Self::candidates) produces a fresh
/// lazy queue on every call.
#[derive(Debug, Clone)]
pub struct ContactGenHelper {
    /// Enumeration order of the robot's effectors.
    pub priority: EffectorPriority,
    /// Stance the robot is leaving.
    pub previous: Stance,
    /// Desired root configuration of the next stance.
    pub target_root: DVector<f64>,
    /// Break/create budgets and stability settings.
    pub config: ContactSearchConfig,
}

impl ContactGenHelper {
    /// Build a helper. Every contact of `previous` must belong to a
    /// prioritized effector.
    pub fn new(
        priority: EffectorPriority,
        previous: Stance,
        target_root: DVector<f64>,
        config: ContactSearchConfig,
    ) -> Result<Self, PlanError> {
        config.validate()?;
        priority.check_stance(&previous)?;
        Ok(Self {
            priority,
            previous,
            target_root,
            config,
        })
    }

    /// External acceleration the support contacts must resist.
    pub fn acceleration(&self) -> Vector3<f64> {
        Vector3::from(self.config.acceleration)
    }

    pub const fn robustness_threshold(&self) -> f64 {
        self.config.robustness_threshold
    }

    pub const fn check_stability(&self) -> bool {
        self.config.check_stability
    }

    /// All candidate next stances in priority order.
    pub fn candidates(&self) -> CandidateQueue<'_> {
        CandidateQueue {
            priority: &self.priority,
            max_created: self.config.max_created_contacts,
            maintain: MaintainCombinations::new(
                self.previous.clone(),
                &self.priority,
                self.config.max_broken_contacts,
            ),
            create: None,
        }
    }
}

/// Maintain combinations composed with create combinations.
///
/// For each maintained stance (fewest breaks first), every creation subset of
/// its free effectors is yielded before moving to the next maintained stance.
/// A just-broken effector is free again, so re-contacting it elsewhere is a
/// candidate too.
#[derive(Debug, Clone)]
pub struct CandidateQueue<'a> {
    priority: &'a EffectorPriority,
    max_created: usize,
    maintain: MaintainCombinations,
    create: Option<CreationCombinations>,
}

impl Iterator for CandidateQueue<'_> {
    type Item = CandidateStance;

    fn next(&mut self) -> Option<CandidateStance> {
        loop {
            if let Some(candidate) = self.create.as_mut().and_then(Iterator::next) {
                return Some(candidate);
            }
            let maintained = self.maintain.next()?;
            let free = maintained.free_effectors(self.priority);
            self.create = Some(CreationCombinations::new(maintained, free, self.max_created));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clamber_core::Contact;

    fn biped() -> Stance {
        Stance::new(DVector::zeros(3))
            .with_contact("left_foot", Contact::horizontal(Vector3::new(0.0, 0.1, 0.0)))
            .with_contact("right_foot", Contact::horizontal(Vector3::new(0.0, -0.1, 0.0)))
    }

    fn priority() -> EffectorPriority {
        EffectorPriority::new(["left_foot", "right_foot", "left_hand"]).unwrap()
    }

    fn summary(c: &CandidateStance) -> (Vec<String>, Vec<String>) {
        (c.stance.contact_order().to_vec(), c.created.clone())
    }

    #[test]
    fn helper_rejects_unknown_contact() {
        let priority = EffectorPriority::new(["left_foot"]).unwrap();
        let result = ContactGenHelper::new(
            priority,
            biped(),
            DVector::zeros(3),
            ContactSearchConfig::default(),
        );
        assert!(matches!(result, Err(PlanError::UnknownEffector(_))));
    }

    #[test]
    fn helper_exposes_acceleration() {
        let config = ContactSearchConfig {
            acceleration: [0.0, 0.0, -9.81],
            ..ContactSearchConfig::default()
        };
        let helper = ContactGenHelper::new(priority(), biped(), DVector::zeros(3), config).unwrap();
        assert_eq!(helper.acceleration(), Vector3::new(0.0, 0.0, -9.81));
    }

    #[test]
    fn queue_composes_maintain_and_create() {
        let helper = ContactGenHelper::new(
            priority(),
            biped(),
            DVector::zeros(3),
            ContactSearchConfig::default(),
        )
        .unwrap();
        let got: Vec<_> = helper.candidates().map(|c| summary(&c)).collect();
        let s = |v: &[&str]| v.iter().map(|x| (*x).to_string()).collect::<Vec<_>>();
        assert_eq!(
            got,
            vec![
                // keep both feet
                (s(&["left_foot", "right_foot"]), s(&["left_hand"])),
                (s(&["left_foot", "right_foot"]), s(&[])),
                // break left foot
                (s(&["right_foot"]), s(&["left_foot"])),
                (s(&["right_foot"]), s(&["left_hand"])),
                (s(&["right_foot"]), s(&[])),
                // break right foot
                (s(&["left_foot"]), s(&["right_foot"])),
                (s(&["left_foot"]), s(&["left_hand"])),
                (s(&["left_foot"]), s(&[])),
            ]
        );
    }

    #[test]
    fn queue_is_restartable() {
        let helper = ContactGenHelper::new(
            priority(),
            biped(),
            DVector::zeros(3),
            ContactSearchConfig::default(),
        )
        .unwrap();
        let first: Vec<_> = helper.candidates().take(3).collect();
        let again: Vec<_> = helper.candidates().take(3).collect();
        assert_eq!(first, again);
    }
}
