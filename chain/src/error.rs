//! Chain access errors.

use nftvote_abi::AbiError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// The endpoint could not be reached or the request timed out.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The wallet owner declined to sign.
    #[error("user rejected the request")]
    UserRejected,

    /// The call or transaction was reverted by the contract.
    #[error("execution reverted: {0}")]
    Reverted(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("abi error: {0}")]
    Abi(#[from] AbiError),

    #[error("contracts are not deployed on chain {0}")]
    ContractNotDeployed(u64),

    #[error("no wallet account available")]
    NoAccount,
}

impl ChainError {
    /// Transient failures may succeed if the same read is retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
