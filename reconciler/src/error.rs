//! Reconciliation errors.

use nftvote_backend::BackendError;
use nftvote_chain::ChainError;
use thiserror::Error;

use crate::ConfirmedTx;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommitError {
    /// The wallet owner declined to sign. Nothing was submitted.
    #[error("user rejected the request")]
    Rejected,

    /// Rejected by the contract, either at submission or as a failed receipt.
    #[error("execution reverted: {reason}")]
    Reverted {
        reason: String,
        tx: Option<nftvote_types::TxHash>,
    },

    #[error("chain error: {0}")]
    Chain(ChainError),

    /// The ledger has no receipt for this hash.
    #[error("transaction {tx} is not mined")]
    NotMined { tx: nftvote_types::TxHash },

    /// The transaction is final on the ledger but the mirror has no record of it.
    #[error("transaction {} confirmed on chain but the mirror write failed: {source}", .confirmed.hash)]
    MirrorFailed {
        confirmed: Box<ConfirmedTx>,
        /// Journal entry recording the divergence.
        entry: u64,
        source: BackendError,
    },
}

impl CommitError {
    /// The confirmed transaction, if the failure happened after confirmation.
    pub fn confirmed(&self) -> Option<&ConfirmedTx> {
        match self {
            Self::MirrorFailed { confirmed, .. } => Some(confirmed),
            _ => None,
        }
    }

    pub fn is_mirror_failure(&self) -> bool {
        matches!(self, Self::MirrorFailed { .. })
    }
}

impl From<ChainError> for CommitError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::UserRejected => Self::Rejected,
            ChainError::Reverted(reason) => Self::Reverted { reason, tx: None },
            other => Self::Chain(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt journal line {line}: {detail}")]
    Corrupt { line: usize, detail: String },
}
