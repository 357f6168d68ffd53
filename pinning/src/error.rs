//! Pinning errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PinningError {
    #[error("pinning service unreachable: {0}")]
    Unreachable(String),

    #[error("pinning service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("invalid pinning response: {0}")]
    InvalidResponse(String),

    #[error("invalid content hash: {0}")]
    InvalidCid(String),

    #[error("{0}")]
    Other(String),
}
