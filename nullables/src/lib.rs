//! Nullable infrastructure for deterministic testing.
//!
//! Every external dependency of the voting flows (clock, ledger, off-chain
//! mirror, pinning service) sits behind a trait. This crate provides
//! in-memory implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically, including fault injection
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod chain;
pub mod clock;
pub mod content;
pub mod mirror;

pub use chain::{NullChain, SentTx};
pub use clock::NullClock;
pub use content::{NullContentStore, Pinned};
pub use mirror::NullMirror;
