//! Per-step motion constraints handed to the roadmap extender with a swing
//! plan.

use std::ops::Range;

use clamber_core::{ConfigPath, Contact, Kinematics, PlanError, Stance};
use nalgebra::{DVector, Vector3};

use crate::bezier::SwingCurve;
use crate::synthesis::SwingOptions;

/// Keep `effector` at its placement.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactConstraint {
    pub effector: String,
    pub contact: Contact,
}

/// Track the body reference path.
#[derive(Debug, Clone, PartialEq)]
pub struct ComConstraint {
    pub reference: ConfigPath,
}

/// Move `effector` along the swing curve.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectorConstraint {
    pub effector: String,
    pub curve: SwingCurve,
}

/// Follow the full pose of `joint` along a whole-body reference path.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseConstraint {
    pub joint: String,
    pub reference: ConfigPath,
}

/// Hold the coordinates of `joint` at fixed values.
#[derive(Debug, Clone, PartialEq)]
pub struct LockedJoint {
    pub joint: String,
    pub range: Range<usize>,
    pub value: DVector<f64>,
}

impl LockedJoint {
    /// Overwrite the joint's coordinates in `configuration`. Configurations
    /// too short to hold the joint are left alone.
    pub fn apply(&self, configuration: &mut DVector<f64>) {
        if configuration.len() >= self.range.end {
            configuration
                .rows_mut(self.range.start, self.range.len())
                .copy_from(&self.value);
        }
    }
}

/// Everything the extender must satisfy at each step of the swing.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSet {
    pub contacts: Vec<ContactConstraint>,
    pub com: ComConstraint,
    pub effector: EffectorConstraint,
    pub poses: Vec<PoseConstraint>,
    pub locked: Vec<LockedJoint>,
}

impl ConstraintSet {
    /// Assemble the constraints of a swing of `effector` from `start` to
    /// `next` along `curve`.
    ///
    /// Contacts held in both stances stay fixed at their `start` placement.
    /// Pose constraints need `options.reference_full_body`; locked joints
    /// keep their values from the start configuration.
    pub fn build<K>(
        kinematics: &K,
        start: &Stance,
        next: &Stance,
        reference: &ConfigPath,
        effector: &str,
        curve: SwingCurve,
        options: &SwingOptions,
    ) -> Result<Self, PlanError>
    where
        K: Kinematics + ?Sized,
    {
        let contacts = next
            .maintained_contacts(start)
            .into_iter()
            .filter_map(|name| {
                let contact = start.contact(&name)?.clone();
                Some(ContactConstraint {
                    effector: name,
                    contact,
                })
            })
            .collect();

        let poses = if options.constrained_joint_poses.is_empty() {
            Vec::new()
        } else {
            let Some(full_body) = options.reference_full_body.as_ref() else {
                return Err(PlanError::InvalidPath(
                    "pose constraints need a whole-body reference path".into(),
                ));
            };
            options
                .constrained_joint_poses
                .iter()
                .map(|joint| {
                    kinematics
                        .joint_range(joint)
                        .ok_or_else(|| PlanError::UnknownJoint(joint.clone()))?;
                    Ok(PoseConstraint {
                        joint: joint.clone(),
                        reference: full_body.clone(),
                    })
                })
                .collect::<Result<_, PlanError>>()?
        };

        let locked = options
            .locked_joints
            .iter()
            .map(|joint| {
                let range = kinematics
                    .joint_range(joint)
                    .filter(|r| r.end <= start.configuration.len())
                    .ok_or_else(|| PlanError::UnknownJoint(joint.clone()))?;
                let value = start.configuration.rows(range.start, range.len()).into_owned();
                Ok(LockedJoint {
                    joint: joint.clone(),
                    range,
                    value,
                })
            })
            .collect::<Result<_, PlanError>>()?;

        Ok(Self {
            contacts,
            com: ComConstraint {
                reference: reference.clone(),
            },
            effector: EffectorConstraint {
                effector: effector.to_owned(),
                curve,
            },
            poses,
            locked,
        })
    }

    /// Number of individual constraints, COM and effector tracking included.
    pub fn count(&self) -> usize {
        self.contacts.len() + 2 + self.poses.len() + self.locked.len()
    }

    /// Apply every locked joint to `configuration`.
    pub fn apply_locked(&self, configuration: &mut DVector<f64>) {
        for joint in &self.locked {
            joint.apply(configuration);
        }
    }

    /// Distance of the swinging effector from its curve, and the largest
    /// displacement of a held contact, at time `t` for `configuration`.
    pub fn tracking_error<K>(
        &self,
        kinematics: &K,
        t: f64,
        configuration: &DVector<f64>,
    ) -> Result<f64, PlanError>
    where
        K: Kinematics + ?Sized,
    {
        let target: Vector3<f64> = self.effector.curve.eval(t);
        let mut error = (kinematics.position_of(&self.effector.effector, configuration)? - target).norm();
        for held in &self.contacts {
            let p = kinematics.position_of(&held.effector, configuration)?;
            error = error.max((p - held.contact.position).norm());
        }
        Ok(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bezier::{BoundaryConditions, boundary_curve};
    use clamber_test_utils::{BIPED_EFFECTORS, PointFootModel, biped_stance, ground};

    fn still_curve(at: Vector3<f64>) -> SwingCurve {
        let seg = |d| boundary_curve(&BoundaryConditions::at_rest(at, at), d, 5).unwrap();
        SwingCurve::new(0.0, seg(0.2), seg(0.6), seg(0.2))
    }

    fn setup() -> (PointFootModel, Stance, Stance, ConfigPath) {
        let model = PointFootModel::new(BIPED_EFFECTORS);
        let start = biped_stance(&model);
        let mut next = start.clone();
        next.remove_contact("left_foot");
        next.add_contact("left_foot", ground(0.3, 0.1, 0.0));
        let reference = ConfigPath::uniform(
            0.0,
            1.0,
            vec![start.configuration.clone(), next.configuration.clone()],
        )
        .unwrap();
        (model, start, next, reference)
    }

    #[test]
    fn holds_maintained_contacts_only() {
        let (model, start, next, reference) = setup();
        let set = ConstraintSet::build(
            &model,
            &start,
            &next,
            &reference,
            "left_foot",
            still_curve(Vector3::zeros()),
            &SwingOptions::default(),
        )
        .unwrap();
        assert_eq!(set.contacts.len(), 1);
        assert_eq!(set.contacts[0].effector, "right_foot");
        assert_eq!(set.effector.effector, "left_foot");
        assert_eq!(set.count(), 3);
    }

    #[test]
    fn locked_joints_take_start_values() {
        let (model, start, next, reference) = setup();
        let options = SwingOptions {
            locked_joints: vec!["right_hand".into()],
            ..SwingOptions::default()
        };
        let set = ConstraintSet::build(
            &model,
            &start,
            &next,
            &reference,
            "left_foot",
            still_curve(Vector3::zeros()),
            &options,
        )
        .unwrap();
        assert_eq!(set.locked.len(), 1);
        assert_eq!(set.locked[0].range, 9..12);
        assert_eq!(set.locked[0].value, DVector::from_vec(vec![0.1, -0.25, 0.8]));

        let mut q = DVector::zeros(12);
        set.apply_locked(&mut q);
        assert_eq!(q.rows(9, 3).into_owned(), set.locked[0].value);
    }

    #[test]
    fn unknown_joints_are_reported() {
        let (model, start, next, reference) = setup();
        let options = SwingOptions {
            locked_joints: vec!["tail".into()],
            ..SwingOptions::default()
        };
        let err = ConstraintSet::build(
            &model,
            &start,
            &next,
            &reference,
            "left_foot",
            still_curve(Vector3::zeros()),
            &options,
        )
        .unwrap_err();
        assert!(matches!(err, PlanError::UnknownJoint(ref j) if j == "tail"));
    }

    #[test]
    fn pose_constraints_need_full_body_path() {
        let (model, start, next, reference) = setup();
        let mut options = SwingOptions {
            constrained_joint_poses: vec!["left_hand".into()],
            ..SwingOptions::default()
        };
        let build = |options: &SwingOptions| {
            ConstraintSet::build(
                &model,
                &start,
                &next,
                &reference,
                "left_foot",
                still_curve(Vector3::zeros()),
                options,
            )
        };
        assert!(matches!(build(&options), Err(PlanError::InvalidPath(_))));

        options.reference_full_body = Some(reference.clone());
        let set = build(&options).unwrap();
        assert_eq!(set.poses.len(), 1);
        assert_eq!(set.poses[0].joint, "left_hand");
    }

    #[test]
    fn tracking_error_measures_effector_and_contacts() {
        let (model, start, next, reference) = setup();
        let target = Vector3::new(0.0, 0.1, 0.05);
        let set = ConstraintSet::build(
            &model,
            &start,
            &next,
            &reference,
            "left_foot",
            still_curve(target),
            &SwingOptions::default(),
        )
        .unwrap();

        let on_curve = model.with_effector_at(&start.configuration, "left_foot", &target);
        assert!(set.tracking_error(&model, 0.5, &on_curve).unwrap() < 1e-12);

        let slipped = model.with_effector_at(&on_curve, "right_foot", &Vector3::new(0.0, -0.1, 0.2));
        approx::assert_relative_eq!(set.tracking_error(&model, 0.5, &slipped).unwrap(), 0.2, epsilon = 1e-12);
    }
}
