//! Fundamental types for nftvote.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! EVM addresses, transaction hashes, credential and election identifiers, timestamps,
//! chain descriptors, and transaction receipts.

pub mod address;
pub mod chain;
pub mod error;
pub mod hash;
pub mod ids;
pub mod receipt;
pub mod time;

pub use address::Address;
pub use chain::{ChainDescriptor, ChainKind, ContractAddresses};
pub use error::TypesError;
pub use hash::TxHash;
pub use ids::{BlockchainElectionId, CandidateId, ElectionChainId, TokenId};
pub use receipt::{Log, ReceiptStatus, TransactionReceipt};
pub use time::{Clock, SystemClock, Timestamp};
