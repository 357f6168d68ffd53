//! Vote casting errors.

use nftvote_backend::BackendError;
use nftvote_chain::ChainError;
use nftvote_types::{BlockchainElectionId, TokenId, TxHash};
use thiserror::Error;

use crate::{TransitionError, Verdict, VoteFailure, VoteRecord};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum VoteError {
    /// Checked before anything was submitted.
    #[error("not eligible to vote: {0}")]
    NotEligible(Verdict),

    #[error("candidate {ordinal} is not part of this election ({count} candidates)")]
    InvalidCandidate { ordinal: u64, count: usize },

    #[error("a vote with this credential is already being submitted")]
    InFlight,

    /// The chain or the wallet refused the vote.
    #[error("{0}")]
    Failed(VoteFailure),

    #[error("could not confirm voting status: {0}")]
    StatusCheck(ChainError),

    #[error("vote recorded on-chain but not mirrored: {source}")]
    NotMirrored {
        record: Box<VoteRecord>,
        inconsistency: u64,
        source: BackendError,
    },

    #[error("no on-chain vote for token {token} in election {election}")]
    NotOnChain {
        election: BlockchainElectionId,
        token: TokenId,
    },

    /// The record's transaction is not a mined, successful cast of this vote.
    #[error("transaction {tx} does not confirm this vote: {detail}")]
    Unconfirmed { tx: TxHash, detail: String },

    #[error("vote record has no mirror ids")]
    MissingMirrorIds,

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl VoteError {
    pub fn failure(&self) -> Option<&VoteFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// The vote is final on chain even though this call returned an error.
    pub fn vote_is_on_chain(&self) -> bool {
        matches!(self, Self::NotMirrored { .. })
    }
}
