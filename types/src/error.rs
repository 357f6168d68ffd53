//! Error type for parsing and validating the fundamental types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid transaction hash: {0}")]
    InvalidHash(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("unknown chain: {0}")]
    UnknownChain(String),

    #[error("candidate ordinal must be at least 1, got {0}")]
    InvalidOrdinal(u64),

    #[error("{0}")]
    Other(String),
}
