//! Voter credential registry.
//!
//! Read-only access to the soulbound voter NFTs: which token an address
//! currently holds, whether it is verified, and the residential area fixed
//! at mint. "No credential" is `Ok(None)`; a failed chain read is an `Err`.

pub mod cached;
pub mod chain;
pub mod error;
pub mod registry;

pub use cached::CachedRegistry;
pub use chain::ChainRegistry;
pub use error::RegistryError;
pub use registry::{CredentialInfo, CredentialRegistry, CredentialSnapshot};
