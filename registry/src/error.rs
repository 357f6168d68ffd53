//! Registry errors.

use nftvote_chain::ChainError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("credential read failed: {0}")]
    Chain(#[from] ChainError),

    #[error("{0}")]
    Other(String),
}

impl RegistryError {
    /// A failed read says nothing about the credential; retrying may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Chain(err) => err.is_transient(),
            Self::Other(_) => false,
        }
    }
}
