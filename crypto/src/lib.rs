//! Cryptographic primitives for nftvote.
//!
//! - **Keccak-256** for ABI selectors, event topics and identity hashes
//! - **EIP-55** mixed-case address checksums

pub mod address;
pub mod hash;

pub use address::{parse_checksummed, to_checksum};
pub use hash::{event_topic, function_selector, keccak256, keccak256_multi};
