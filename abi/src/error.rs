//! ABI codec errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("data too short: need {needed} bytes at offset {offset}, have {available}")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("integer does not fit in 128 bits")]
    Overflow,

    #[error("invalid {kind} encoding: {detail}")]
    InvalidEncoding { kind: &'static str, detail: String },

    #[error("token does not match parameter type {expected}")]
    TypeMismatch { expected: String },

    #[error("expected {expected} arguments, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },

    #[error("selector mismatch: expected 0x{expected}, got 0x{actual}")]
    SelectorMismatch { expected: String, actual: String },

    #[error("log topic mismatch for event {0}")]
    TopicMismatch(String),

    #[error("{0}")]
    Other(String),
}
