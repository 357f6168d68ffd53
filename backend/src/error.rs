//! Mirror access errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    #[error("backend returned HTTP {0}")]
    Http(u16),

    /// The backend answered with a non-success envelope.
    #[error("backend rejected request ({code}): {msg}")]
    Rejected { code: String, msg: String },

    #[error("invalid backend response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Other(String),
}

impl BackendError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unreachable(_) => true,
            Self::Http(status) => *status >= 500,
            _ => false,
        }
    }
}
