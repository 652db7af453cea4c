use thiserror::Error;

/// Top-level error type for stance search and swing synthesis.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("No contact found: {tried} candidate stances rejected")]
    SearchExhausted { tried: usize },

    #[error(
        "Degenerate waypoints for effector {effector}: zero travel distance from {start:?} to {end:?}"
    )]
    DegenerateWaypoints {
        effector: String,
        start: [f64; 3],
        end: [f64; 3],
    },

    #[error("Unsupported transition: expected one contact creation, got {created}")]
    UnsupportedTransition { created: usize },

    #[error("Unknown effector: {0}")]
    UnknownEffector(String),

    #[error("Unknown joint: {0}")]
    UnknownJoint(String),

    #[error("Reference path too short: length {length}, swing phases need {required}")]
    PathTooShort { length: f64, required: f64 },

    #[error("Invalid reference path: {0}")]
    InvalidPath(String),

    #[error("Kinematics query failed: {0}")]
    Kinematics(String),

    #[error("Roadmap extension failed: {0}")]
    Extension(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Failure of the middle-phase boundary-value solve.
///
/// Recovered by the synthesizer, never propagated as a [`PlanError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveFailure {
    #[error("Solver rejected problem setup: {0}")]
    Setup(String),

    #[error("Solver did not converge: {0}")]
    NotConverged(String),

    #[error("Boundary problem is underdetermined: degree {degree} too low")]
    DegreeTooLow { degree: usize },
}
