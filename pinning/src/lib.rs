//! Content-addressed storage for credential metadata and photos.

pub mod cid;
pub mod error;
pub mod pinata;

pub use cid::{ContentHash, GATEWAYS};
pub use error::PinningError;
pub use pinata::PinataClient;

use async_trait::async_trait;

/// A pinning service that stores content and returns its CID.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Pin a JSON document under a human-readable `name`.
    async fn pin_json(
        &self,
        name: &str,
        content: &serde_json::Value,
    ) -> Result<ContentHash, PinningError>;

    /// Pin raw file bytes.
    async fn pin_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<ContentHash, PinningError>;
}
