//! Off-chain mirror for nftvote.
//!
//! The REST backend stores a denormalised copy of on-chain facts (elections,
//! votes, credential approvals) plus the KYC workflow. Every response uses
//! the envelope `{code, msg, data}` and succeeds only with `code == "SUCCESS"`.

pub mod client;
pub mod dto;
pub mod error;
pub mod store;

pub use client::RestBackend;
pub use dto::*;
pub use error::BackendError;
pub use store::{IdentityExtractor, MirrorStore};
