use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_max_broken_contacts() -> usize {
    1
}
const fn default_max_created_contacts() -> usize {
    1
}
const fn default_acceleration() -> [f64; 3] {
    [0.0, 0.0, 0.0]
}
const fn default_waypoint_count() -> usize {
    30
}
const fn default_min_travel() -> f64 {
    0.03
}
fn default_line_tolerance() -> f64 {
    4.0 * f64::EPSILON
}
const fn default_planar_tolerance() -> f64 {
    0.02
}
const fn default_short_travel() -> f64 {
    0.1
}
const fn default_short_apex_height() -> f64 {
    0.03
}
const fn default_apex_height_per_sample() -> f64 {
    0.01
}
const fn default_apex_height_min() -> f64 {
    0.02
}
const fn default_apex_height_max() -> f64 {
    0.07
}
const fn default_phase_duration() -> f64 {
    0.2
}
const fn default_boundary_degree() -> usize {
    5
}
const fn default_clearance_offset() -> f64 {
    0.02
}
const fn default_clearance_speed() -> f64 {
    0.2
}
const fn default_mid_degree() -> usize {
    7
}
const fn default_smoothness_weight() -> f64 {
    1e-6
}
const fn default_solver_max_iter() -> u32 {
    200
}
const fn default_extender_error_threshold() -> f64 {
    1e-4
}

// ---------------------------------------------------------------------------
// ContactSearchConfig
// ---------------------------------------------------------------------------

/// Parameters of the contact-transition search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactSearchConfig {
    /// Maximum number of current contacts a candidate may break.
    #[serde(default = "default_max_broken_contacts")]
    pub max_broken_contacts: usize,

    /// Maximum number of free effectors a candidate may bring into contact.
    #[serde(default = "default_max_created_contacts")]
    pub max_created_contacts: usize,

    /// Minimum stability margin under `acceleration`.
    #[serde(default)]
    pub robustness_threshold: f64,

    /// Reject candidates whose contacts cannot resist `acceleration`.
    #[serde(default)]
    pub check_stability: bool,

    /// External acceleration [x, y, z] for the stability check.
    #[serde(default = "default_acceleration")]
    pub acceleration: [f64; 3],
}

impl Default for ContactSearchConfig {
    fn default() -> Self {
        Self {
            max_broken_contacts: default_max_broken_contacts(),
            max_created_contacts: default_max_created_contacts(),
            robustness_threshold: 0.0,
            check_stability: false,
            acceleration: default_acceleration(),
        }
    }
}

impl ContactSearchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.robustness_threshold.is_finite() {
            return Err(invalid("robustness_threshold", "must be finite"));
        }
        if self.acceleration.iter().any(|a| !a.is_finite()) {
            return Err(invalid("acceleration", "must be finite"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SwingConfig
// ---------------------------------------------------------------------------

/// Heuristics of the swing-limb synthesizer. Lengths in meters, times in
/// seconds of reference-path time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwingConfig {
    /// Number of effector samples along the reference path. Bumped to the
    /// next odd number so a middle sample exists.
    #[serde(default = "default_waypoint_count")]
    pub waypoint_count: usize,

    /// Effector travel at or below which no swing is synthesized.
    #[serde(default = "default_min_travel")]
    pub min_travel: f64,

    /// Samples whose direction cosine with the chord is at least
    /// `1 - line_tolerance` count as collinear.
    #[serde(default = "default_line_tolerance")]
    pub line_tolerance: f64,

    /// Maximum height variation of a planar sweep.
    #[serde(default = "default_planar_tolerance")]
    pub planar_tolerance: f64,

    /// Travel below which the apex uses `short_apex_height`.
    #[serde(default = "default_short_travel")]
    pub short_travel: f64,

    #[serde(default = "default_short_apex_height")]
    pub short_apex_height: f64,

    /// Apex height per sample for longer travels, clamped to
    /// `[apex_height_min, apex_height_max]`.
    #[serde(default = "default_apex_height_per_sample")]
    pub apex_height_per_sample: f64,

    #[serde(default = "default_apex_height_min")]
    pub apex_height_min: f64,

    #[serde(default = "default_apex_height_max")]
    pub apex_height_max: f64,

    #[serde(default = "default_phase_duration")]
    pub takeoff_duration: f64,

    #[serde(default = "default_phase_duration")]
    pub landing_duration: f64,

    /// Bezier degree of the takeoff and landing curves (>= 5).
    #[serde(default = "default_boundary_degree")]
    pub boundary_degree: usize,

    /// Height of the takeoff curve's end above the old contact.
    #[serde(default = "default_clearance_offset")]
    pub takeoff_offset: f64,

    /// Upward speed at the end of takeoff.
    #[serde(default = "default_clearance_speed")]
    pub takeoff_speed: f64,

    /// Height of the landing curve's start above the new contact.
    #[serde(default = "default_clearance_offset")]
    pub landing_offset: f64,

    /// Downward speed at the start of landing.
    #[serde(default = "default_clearance_speed")]
    pub landing_speed: f64,

    /// Bezier degree of the middle curve (>= 5).
    #[serde(default = "default_mid_degree")]
    pub mid_degree: usize,

    /// Weight of the acceleration-energy term of the middle-phase cost.
    #[serde(default = "default_smoothness_weight")]
    pub smoothness_weight: f64,

    /// Iteration cap of the middle-phase QP.
    #[serde(default = "default_solver_max_iter")]
    pub solver_max_iter: u32,

    /// Offset and velocity directions follow the contact normals instead of
    /// world `+z`.
    #[serde(default)]
    pub follow_contact_normals: bool,

    /// Projection error threshold handed to the roadmap extender.
    #[serde(default = "default_extender_error_threshold")]
    pub extender_error_threshold: f64,
}

impl Default for SwingConfig {
    fn default() -> Self {
        Self {
            waypoint_count: default_waypoint_count(),
            min_travel: default_min_travel(),
            line_tolerance: default_line_tolerance(),
            planar_tolerance: default_planar_tolerance(),
            short_travel: default_short_travel(),
            short_apex_height: default_short_apex_height(),
            apex_height_per_sample: default_apex_height_per_sample(),
            apex_height_min: default_apex_height_min(),
            apex_height_max: default_apex_height_max(),
            takeoff_duration: default_phase_duration(),
            landing_duration: default_phase_duration(),
            boundary_degree: default_boundary_degree(),
            takeoff_offset: default_clearance_offset(),
            takeoff_speed: default_clearance_speed(),
            landing_offset: default_clearance_offset(),
            landing_speed: default_clearance_speed(),
            mid_degree: default_mid_degree(),
            smoothness_weight: default_smoothness_weight(),
            solver_max_iter: default_solver_max_iter(),
            follow_contact_normals: false,
            extender_error_threshold: default_extender_error_threshold(),
        }
    }
}

impl SwingConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.waypoint_count < 3 {
            return Err(invalid("waypoint_count", "must be >= 3"));
        }
        if self.min_travel < 0.0 {
            return Err(invalid("min_travel", "must be >= 0"));
        }
        if self.apex_height_min > self.apex_height_max {
            return Err(invalid("apex_height_min", "must be <= apex_height_max"));
        }
        if self.takeoff_duration <= 0.0 || self.landing_duration <= 0.0 {
            return Err(invalid("takeoff_duration/landing_duration", "must be > 0"));
        }
        if self.boundary_degree < 5 {
            return Err(invalid("boundary_degree", "must be >= 5"));
        }
        if self.mid_degree < 5 {
            return Err(invalid("mid_degree", "must be >= 5"));
        }
        if self.smoothness_weight < 0.0 {
            return Err(invalid("smoothness_weight", "must be >= 0"));
        }
        Ok(())
    }

    /// Sample count actually drawn: `waypoint_count`, made odd.
    pub const fn odd_waypoint_count(&self) -> usize {
        if self.waypoint_count % 2 == 0 {
            self.waypoint_count + 1
        } else {
            self.waypoint_count
        }
    }

    /// Apex height for an effector travelling `travel` through `samples`
    /// waypoints.
    pub fn apex_height(&self, travel: f64, samples: usize) -> f64 {
        if travel < self.short_travel {
            self.short_apex_height
        } else {
            (samples as f64 * self.apex_height_per_sample)
                .clamp(self.apex_height_min, self.apex_height_max)
        }
    }
}

// ---------------------------------------------------------------------------
// PlannerConfig
// ---------------------------------------------------------------------------

/// Complete planner configuration loaded from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub contact: ContactSearchConfig,
    #[serde(default)]
    pub swing: SwingConfig,
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.contact.validate()?;
        self.swing.validate()
    }

    /// Parse from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
