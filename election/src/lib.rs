//! Election lifecycle manager.
//!
//! An election is created on one ledger, its candidates are registered one
//! transaction at a time in submission order (the on-chain candidate id is
//! the 1-indexed ordinal), and only then is the off-chain mirror written.

pub mod draft;
pub mod error;
pub mod manager;
pub mod model;

pub use draft::{CandidateDraft, ElectionDraft, ValidatedDraft, ValidationError, MIN_CANDIDATES};
pub use error::ElectionError;
pub use manager::{CreatedElection, ElectionManager};
pub use model::{same_area, Candidate, ChainVotes, Election, ElectionStatus};
