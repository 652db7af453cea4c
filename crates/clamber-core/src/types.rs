use std::collections::BTreeMap;

use nalgebra::{DVector, UnitVector3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, PlanError};

/// Two contact positions closer than this are the same placement.
pub const CONTACT_POSITION_TOLERANCE: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Contact
// ---------------------------------------------------------------------------

/// Placement of one effector against the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawContact")]
pub struct Contact {
    /// Contact point in world frame.
    pub position: Vector3<f64>,
    /// Outward surface normal at the contact point.
    pub normal: UnitVector3<f64>,
}

#[derive(Deserialize)]
struct RawContact {
    position: Vector3<f64>,
    normal: Vector3<f64>,
}

impl TryFrom<RawContact> for Contact {
    type Error = ConfigError;

    fn try_from(raw: RawContact) -> Result<Self, Self::Error> {
        Self::new(raw.position, raw.normal).ok_or_else(|| ConfigError::InvalidValue {
            field: "normal".into(),
            message: "contact normal must be non-zero".into(),
        })
    }
}

impl Contact {
    /// Create a contact, normalizing `normal`.
    ///
    /// Returns `None` if `normal` has (near) zero length.
    pub fn new(position: Vector3<f64>, normal: Vector3<f64>) -> Option<Self> {
        let normal = UnitVector3::try_new(normal, 1e-12)?;
        Some(Self { position, normal })
    }

    /// Contact on a horizontal surface (normal `+z`).
    pub fn horizontal(position: Vector3<f64>) -> Self {
        Self {
            position,
            normal: Vector3::z_axis(),
        }
    }

    /// Whether both contacts sit at the same position.
    pub fn same_placement(&self, other: &Self) -> bool {
        (self.position - other.position).norm() <= CONTACT_POSITION_TOLERANCE
    }
}

// ---------------------------------------------------------------------------
// Stance
// ---------------------------------------------------------------------------

/// Robot configuration plus its active effector contacts.
///
/// Contacts are kept in the order they were made (oldest first). Re-adding
/// an effector replaces its placement and moves it to the back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stance {
    /// Generalized coordinates of the robot.
    pub configuration: DVector<f64>,
    contacts: BTreeMap<String, Contact>,
    contact_order: Vec<String>,
}

impl Stance {
    /// Stance with no contacts.
    pub fn new(configuration: DVector<f64>) -> Self {
        Self {
            configuration,
            contacts: BTreeMap::new(),
            contact_order: Vec::new(),
        }
    }

    /// Builder-style [`add_contact`](Self::add_contact).
    #[must_use]
    pub fn with_contact(mut self, effector: impl Into<String>, contact: Contact) -> Self {
        self.add_contact(effector, contact);
        self
    }

    /// Put `effector` in contact. Returns the previous placement, if any.
    pub fn add_contact(&mut self, effector: impl Into<String>, contact: Contact) -> Option<Contact> {
        let effector = effector.into();
        self.contact_order.retain(|name| *name != effector);
        self.contact_order.push(effector.clone());
        self.contacts.insert(effector, contact)
    }

    /// Release the contact of `effector`.
    pub fn remove_contact(&mut self, effector: &str) -> Option<Contact> {
        let removed = self.contacts.remove(effector)?;
        self.contact_order.retain(|name| name != effector);
        Some(removed)
    }

    pub fn contact(&self, effector: &str) -> Option<&Contact> {
        self.contacts.get(effector)
    }

    pub fn is_in_contact(&self, effector: &str) -> bool {
        self.contacts.contains_key(effector)
    }

    pub fn num_contacts(&self) -> usize {
        self.contacts.len()
    }

    /// Effectors in contact, oldest contact first.
    pub fn contact_order(&self) -> &[String] {
        &self.contact_order
    }

    /// Iterate over `(effector, contact)` pairs, oldest contact first.
    pub fn contacts(&self) -> impl Iterator<Item = (&str, &Contact)> {
        self.contact_order
            .iter()
            .filter_map(|name| self.contacts.get(name).map(|c| (name.as_str(), c)))
    }

    /// Effectors in contact here that were free in `previous`, or that were
    /// in contact somewhere else.
    pub fn contact_creations(&self, previous: &Self) -> Vec<String> {
        self.contacts()
            .filter(|(name, contact)| {
                previous
                    .contact(name)
                    .map_or(true, |old| !old.same_placement(contact))
            })
            .map(|(name, _)| name.to_owned())
            .collect()
    }

    /// Effectors in contact in `previous` that are free here, or in contact
    /// somewhere else.
    pub fn contact_breaks(&self, previous: &Self) -> Vec<String> {
        previous.contact_creations(self)
    }

    /// Effectors whose contact is unchanged between `previous` and `self`.
    pub fn maintained_contacts(&self, previous: &Self) -> Vec<String> {
        previous
            .contacts()
            .filter(|(name, contact)| {
                self.contact(name)
                    .is_some_and(|current| current.same_placement(contact))
            })
            .map(|(name, _)| name.to_owned())
            .collect()
    }

    pub fn transition_from(&self, previous: &Self) -> ContactTransition {
        ContactTransition {
            broken: self.contact_breaks(previous),
            created: self.contact_creations(previous),
        }
    }

    /// Prioritized effectors that are not in contact, in priority order.
    pub fn free_effectors(&self, priority: &EffectorPriority) -> Vec<String> {
        priority
            .iter()
            .filter(|name| !self.is_in_contact(name))
            .map(str::to_owned)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// ContactTransition
// ---------------------------------------------------------------------------

/// Contacts broken and created between two consecutive stances.
///
/// An effector listed in both sets was moved: its old contact is broken and a
/// new one created. Such replacements stay visible through
/// [`replaced`](Self::replaced).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactTransition {
    pub broken: Vec<String>,
    pub created: Vec<String>,
}

impl ContactTransition {
    /// Effectors that were broken and then re-created elsewhere.
    pub fn replaced(&self) -> Vec<&str> {
        self.broken
            .iter()
            .filter(|name| self.created.contains(name))
            .map(String::as_str)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.broken.is_empty() && self.created.is_empty()
    }
}

// ---------------------------------------------------------------------------
// CandidateStance
// ---------------------------------------------------------------------------

/// A hypothesized next stance produced by the contact combinatorics.
///
/// `stance` only holds the maintained contacts. Effectors in `created` are
/// placed by the projection step, which promotes the candidate to a real
/// [`Stance`].
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateStance {
    pub stance: Stance,
    /// Effectors requested to make a new contact, in priority order.
    pub created: Vec<String>,
    /// Effectors still free after the requested creations, in priority order.
    pub free_effectors: Vec<String>,
}

impl CandidateStance {
    /// Candidate that keeps `stance` as is.
    pub fn unchanged(stance: Stance, free_effectors: Vec<String>) -> Self {
        Self {
            stance,
            created: Vec::new(),
            free_effectors,
        }
    }

    /// Number of contacts the candidate will have once projected.
    pub fn num_contacts(&self) -> usize {
        self.stance.num_contacts() + self.created.len()
    }
}

// ---------------------------------------------------------------------------
// EffectorPriority
// ---------------------------------------------------------------------------

/// Fixed enumeration order of the robot's effectors.
///
/// Earlier effectors are broken first and contacted first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct EffectorPriority(Vec<String>);

impl EffectorPriority {
    /// Build from declaration order. Names must be unique and non-empty.
    pub fn new<I, S>(names: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut order: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if name.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "effector_priority".into(),
                    message: "effector names must be non-empty".into(),
                });
            }
            if order.contains(&name) {
                return Err(ConfigError::InvalidValue {
                    field: "effector_priority".into(),
                    message: format!("duplicate effector {name}"),
                });
            }
            order.push(name);
        }
        Ok(Self(order))
    }

    /// Position of `effector` in the order.
    pub fn rank(&self, effector: &str) -> Option<usize> {
        self.0.iter().position(|name| name == effector)
    }

    pub fn contains(&self, effector: &str) -> bool {
        self.rank(effector).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sort `effectors` by priority. Unknown names go last, keeping their order.
    pub fn sort(&self, effectors: &mut [String]) {
        effectors.sort_by_key(|name| self.rank(name).unwrap_or(usize::MAX));
    }

    /// Check that every contact of `stance` belongs to a known effector.
    pub fn check_stance(&self, stance: &Stance) -> Result<(), PlanError> {
        match stance.contact_order().iter().find(|name| !self.contains(name)) {
            Some(unknown) => Err(PlanError::UnknownEffector(unknown.clone())),
            None => Ok(()),
        }
    }
}

impl TryFrom<Vec<String>> for EffectorPriority {
    type Error = ConfigError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<EffectorPriority> for Vec<String> {
    fn from(priority: EffectorPriority) -> Self {
        priority.0
    }
}

// ---------------------------------------------------------------------------
// ConfigPath
// ---------------------------------------------------------------------------

/// Time-stamped configurations, linearly interpolated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawConfigPath")]
pub struct ConfigPath {
    times: Vec<f64>,
    configurations: Vec<DVector<f64>>,
}

#[derive(Deserialize)]
struct RawConfigPath {
    times: Vec<f64>,
    configurations: Vec<DVector<f64>>,
}

impl TryFrom<RawConfigPath> for ConfigPath {
    type Error = PlanError;

    fn try_from(raw: RawConfigPath) -> Result<Self, Self::Error> {
        Self::new(raw.times, raw.configurations)
    }
}

impl ConfigPath {
    /// Build a path. Times must be strictly increasing and all
    /// configurations must share one dimension.
    pub fn new(times: Vec<f64>, configurations: Vec<DVector<f64>>) -> Result<Self, PlanError> {
        if times.is_empty() {
            return Err(PlanError::InvalidPath("path has no samples".into()));
        }
        if times.len() != configurations.len() {
            return Err(PlanError::InvalidPath(format!(
                "{} times for {} configurations",
                times.len(),
                configurations.len()
            )));
        }
        if times.windows(2).any(|w| w[1] <= w[0] || !w[1].is_finite()) {
            return Err(PlanError::InvalidPath(
                "times must be finite and strictly increasing".into(),
            ));
        }
        let dim = configurations[0].len();
        if configurations.iter().any(|q| q.len() != dim) {
            return Err(PlanError::InvalidPath(
                "configurations differ in dimension".into(),
            ));
        }
        Ok(Self {
            times,
            configurations,
        })
    }

    /// Evenly spread `configurations` over `[start, end]`.
    pub fn uniform(start: f64, end: f64, configurations: Vec<DVector<f64>>) -> Result<Self, PlanError> {
        let n = configurations.len();
        let times = if n == 1 {
            vec![start]
        } else {
            (0..n)
                .map(|i| start + (end - start) * i as f64 / (n - 1) as f64)
                .collect()
        };
        Self::new(times, configurations)
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn configurations(&self) -> &[DVector<f64>] {
        &self.configurations
    }

    pub fn dim(&self) -> usize {
        self.configurations[0].len()
    }

    pub fn start(&self) -> f64 {
        self.times[0]
    }

    pub fn end(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    /// Configuration at time `t`, clamped to the path's time range.
    pub fn at(&self, t: f64) -> DVector<f64> {
        if t <= self.start() {
            return self.configurations[0].clone();
        }
        if t >= self.end() {
            return self.configurations[self.configurations.len() - 1].clone();
        }
        // First sample strictly after t; t is inside the range so 1 <= hi < len.
        let hi = self.times.partition_point(|&ti| ti <= t);
        let lo = hi - 1;
        let s = (t - self.times[lo]) / (self.times[hi] - self.times[lo]);
        &self.configurations[lo] * (1.0 - s) + &self.configurations[hi] * s
    }

    /// Same path without the trailing coordinate of every configuration.
    ///
    /// Reference paths produced by the body planner carry one extra scalar
    /// after the robot's generalized coordinates.
    #[must_use]
    pub fn without_extra_dof(&self) -> Self {
        let dim = self.dim().saturating_sub(1);
        Self {
            times: self.times.clone(),
            configurations: self
                .configurations
                .iter()
                .map(|q| q.rows(0, dim).into_owned())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn foot(x: f64, y: f64) -> Contact {
        Contact::horizontal(Vector3::new(x, y, 0.0))
    }

    fn biped() -> Stance {
        Stance::new(DVector::zeros(3))
            .with_contact("left_foot", foot(0.0, 0.1))
            .with_contact("right_foot", foot(0.0, -0.1))
    }

    #[test]
    fn contact_normal_is_normalized() {
        let c = Contact::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 3.0)).unwrap();
        assert_relative_eq!(c.normal.norm(), 1.0, epsilon = 1e-12);
        assert!(Contact::new(Vector3::zeros(), Vector3::zeros()).is_none());
    }

    #[test]
    fn deserialized_contact_has_unit_normal() {
        let c: Contact =
            toml::from_str("position = [1.0, 0.0, 0.0]\nnormal = [0.0, 0.0, 5.0]").unwrap();
        assert_relative_eq!(c.normal.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(c.normal.into_inner(), Vector3::z());
        assert_relative_eq!(c.position, Vector3::x());

        let err =
            toml::from_str::<Contact>("position = [0.0, 0.0, 0.0]\nnormal = [0.0, 0.0, 0.0]")
                .unwrap_err();
        assert!(err.to_string().contains("contact normal must be non-zero"));
    }

    #[test]
    fn contact_order_tracks_insertion() {
        let mut s = biped();
        assert_eq!(s.contact_order(), ["left_foot", "right_foot"]);
        s.add_contact("left_foot", foot(0.2, 0.1));
        assert_eq!(s.contact_order(), ["right_foot", "left_foot"]);
        assert!(s.remove_contact("right_foot").is_some());
        assert_eq!(s.contact_order(), ["left_foot"]);
        assert!(s.remove_contact("right_foot").is_none());
    }

    #[test]
    fn transition_break_and_create() {
        let a = biped();
        let mut b = a.clone();
        b.remove_contact("left_foot");
        b.add_contact("left_hand", foot(0.5, 0.1));

        let t = b.transition_from(&a);
        assert_eq!(t.broken, vec!["left_foot".to_string()]);
        assert_eq!(t.created, vec!["left_hand".to_string()]);
        assert!(t.replaced().is_empty());
        assert_eq!(b.maintained_contacts(&a), vec!["right_foot".to_string()]);
    }

    #[test]
    fn moved_contact_is_a_replacement() {
        let a = biped();
        let mut b = a.clone();
        b.add_contact("left_foot", foot(0.3, 0.1));

        let t = b.transition_from(&a);
        assert_eq!(t.broken, vec!["left_foot".to_string()]);
        assert_eq!(t.created, vec!["left_foot".to_string()]);
        assert_eq!(t.replaced(), vec!["left_foot"]);
    }

    #[test]
    fn identical_stances_have_empty_transition() {
        let a = biped();
        assert!(a.transition_from(&a).is_empty());
    }

    #[test]
    fn priority_rejects_duplicates() {
        assert!(EffectorPriority::new(["a", "b", "a"]).is_err());
        assert!(EffectorPriority::new([""]).is_err());
        let p = EffectorPriority::new(["a", "b"]).unwrap();
        assert_eq!(p.rank("b"), Some(1));
        assert_eq!(p.rank("c"), None);
    }

    #[test]
    fn priority_sorts_unknown_last() {
        let p = EffectorPriority::new(["a", "b", "c"]).unwrap();
        let mut names = vec!["x".to_string(), "c".to_string(), "a".to_string()];
        p.sort(&mut names);
        assert_eq!(names, ["a", "c", "x"]);
    }

    #[test]
    fn free_effectors_follow_priority() {
        let p = EffectorPriority::new(["left_foot", "right_foot", "left_hand", "right_hand"]).unwrap();
        assert_eq!(biped().free_effectors(&p), ["left_hand", "right_hand"]);
    }

    #[test]
    fn check_stance_flags_unknown_effector() {
        let p = EffectorPriority::new(["left_foot"]).unwrap();
        let err = p.check_stance(&biped()).unwrap_err();
        assert!(matches!(err, PlanError::UnknownEffector(name) if name == "right_foot"));
    }

    #[test]
    fn config_path_interpolates_and_clamps() {
        let path = ConfigPath::new(
            vec![0.0, 1.0, 3.0],
            vec![
                DVector::from_vec(vec![0.0, 0.0]),
                DVector::from_vec(vec![1.0, 2.0]),
                DVector::from_vec(vec![3.0, 2.0]),
            ],
        )
        .unwrap();
        assert_relative_eq!(path.at(0.5), DVector::from_vec(vec![0.5, 1.0]), epsilon = 1e-12);
        assert_relative_eq!(path.at(2.0), DVector::from_vec(vec![2.0, 2.0]), epsilon = 1e-12);
        assert_relative_eq!(path.at(-1.0), DVector::from_vec(vec![0.0, 0.0]));
        assert_relative_eq!(path.at(9.0), DVector::from_vec(vec![3.0, 2.0]));
        assert_relative_eq!(path.at(1.0), DVector::from_vec(vec![1.0, 2.0]), epsilon = 1e-12);
    }

    #[test]
    fn config_path_rejects_bad_input() {
        let q = DVector::zeros(2);
        assert!(ConfigPath::new(vec![], vec![]).is_err());
        assert!(ConfigPath::new(vec![0.0, 0.0], vec![q.clone(), q.clone()]).is_err());
        assert!(ConfigPath::new(vec![0.0], vec![q.clone(), q.clone()]).is_err());
        assert!(ConfigPath::new(vec![0.0, 1.0], vec![q, DVector::zeros(3)]).is_err());
    }

    #[test]
    fn deserialization_rejects_invalid_paths() {
        let err = toml::from_str::<ConfigPath>("times = []\nconfigurations = []").unwrap_err();
        assert!(err.to_string().contains("path has no samples"));
        assert!(toml::from_str::<ConfigPath>("times = [0.0, 1.0]\nconfigurations = []").is_err());
    }

    #[test]
    fn without_extra_dof_drops_last_coordinate() {
        let path = ConfigPath::uniform(
            0.0,
            1.0,
            vec![DVector::from_vec(vec![1.0, 2.0, 9.0]); 2],
        )
        .unwrap();
        let reduced = path.without_extra_dof();
        assert_eq!(reduced.dim(), 2);
        assert_eq!(reduced.times(), path.times());
        assert_relative_eq!(reduced.at(0.3), DVector::from_vec(vec![1.0, 2.0]));
    }
}
