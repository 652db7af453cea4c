//! Contact-transition search for multi-contact stance planning.
//!
//! Given the current stance and a target root configuration, the search
//! enumerates candidate next stances in priority order and returns the first
//! one the projection collaborator accepts:
//!
//! 1. **Maintain** — break between 0 and `max_broken_contacts` current
//!    contacts, fewest breaks first
//! 2. **Create** — bring up to `max_created_contacts` free effectors into
//!    contact, most creations first
//! 3. **Select** — project each candidate, check stability if asked, stop at
//!    the first admissible stance
//!
//! # Architecture
//!
//! ```text
//! ContactGenHelper ──► CandidateQueue ──► StanceProjector ──► ProjectionReport
//!                      (Maintain × Create)  (+ StabilityOracle)
//! ```
//!
//! Both enumerations are lazy iterators, so the search never materializes
//! the full combinatorial set and stops as soon as a candidate passes.

pub mod combinatorics;
pub mod helper;
pub mod search;

pub use combinatorics::{
    CreationCombinations, MaintainCombinations, gen_contacts_combinatorial,
    maintain_contacts_combinatorial,
};
pub use helper::{CandidateQueue, ContactGenHelper};
pub use search::{ProjectionReport, ProjectionStatus, select_first_feasible};
