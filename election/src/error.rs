//! Election lifecycle errors.

use nftvote_backend::BackendError;
use nftvote_chain::ChainError;
use nftvote_reconciler::CommitError;
use nftvote_types::{BlockchainElectionId, TxHash};
use thiserror::Error;

use crate::ValidationError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ElectionError {
    /// Rejected locally; nothing was submitted.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Creation or mirroring failed; see [`CommitError`] for which phase.
    #[error(transparent)]
    Commit(#[from] CommitError),

    /// The election exists on chain but a candidate could not be registered.
    /// Candidates already added stay on chain.
    #[error("election {election} created (tx {creation_tx}) but candidate {} of the list failed: {source}", .registered + 1)]
    CandidateRegistration {
        election: BlockchainElectionId,
        creation_tx: TxHash,
        registered: usize,
        entry: u64,
        source: CommitError,
    },

    #[error("chain read failed: {0}")]
    Chain(#[from] ChainError),

    #[error("mirror read failed: {0}")]
    Mirror(#[from] BackendError),

    #[error("invalid mirror record: {0}")]
    InvalidRecord(String),

    #[error("{0}")]
    Other(String),
}

impl ElectionError {
    /// True when something is already final on chain.
    pub fn left_chain_state(&self) -> bool {
        match self {
            Self::CandidateRegistration { .. } => true,
            Self::Commit(commit) => commit.is_mirror_failure(),
            _ => false,
        }
    }
}
