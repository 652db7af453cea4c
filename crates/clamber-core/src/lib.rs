// clamber-core: Stance model, collaborator traits, config and errors for Clamber.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{ContactSearchConfig, PlannerConfig, SwingConfig};
pub use error::{ConfigError, PlanError, SolveFailure};
pub use traits::{Kinematics, Projection, ReferencePath, RejectReason, StabilityOracle, StanceProjector};
pub use types::{CandidateStance, ConfigPath, Contact, ContactTransition, EffectorPriority, Stance};
