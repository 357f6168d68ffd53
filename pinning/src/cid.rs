//! Content identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::PinningError;

/// Public gateways, preferred first.
pub const GATEWAYS: [&str; 4] = [
    "https://gateway.pinata.cloud/ipfs/",
    "https://ipfs.io/ipfs/",
    "https://cloudflare-ipfs.com/ipfs/",
    "https://dweb.link/ipfs/",
];

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// A validated IPFS CID: v0 (`Qm` + 44 base58 chars) or base32 v1
/// (`b` + 58 chars of `a-z2-7`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    pub fn is_valid(s: &str) -> bool {
        let is_v0 = s.len() == 46
            && s.starts_with("Qm")
            && s[2..].chars().all(|c| BASE58_ALPHABET.contains(c));
        let is_v1 = s.len() == 59
            && s.starts_with('b')
            && s[1..].chars().all(|c| c.is_ascii_lowercase() || ('2'..='7').contains(&c));
        is_v0 || is_v1
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `ipfs://<cid>`
    pub fn ipfs_uri(&self) -> String {
        format!("ipfs://{}", self.0)
    }

    /// HTTP URL through gateway `index` (clamped to the last gateway).
    pub fn gateway_url(&self, index: usize) -> String {
        let gateway = GATEWAYS[index.min(GATEWAYS.len() - 1)];
        format!("{gateway}{}", self.0)
    }
}

impl FromStr for ContentHash {
    type Err = PinningError;

    /// Accepts a bare CID or an `ipfs://` URI.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bare = s.trim().trim_start_matches("ipfs://");
        if Self::is_valid(bare) {
            Ok(Self(bare.to_string()))
        } else {
            Err(PinningError::InvalidCid(s.to_string()))
        }
    }
}

impl TryFrom<String> for ContentHash {
    type Error = PinningError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const V0: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
    const V1: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

    #[test]
    fn accepts_v0_and_v1() {
        assert!(ContentHash::is_valid(V0));
        assert!(ContentHash::is_valid(V1));
    }

    #[test]
    fn rejects_bad_alphabet_and_length() {
        // '0' and 'l' are not base58.
        assert!(!ContentHash::is_valid(&format!("Qm{}", "0".repeat(44))));
        assert!(!ContentHash::is_valid(&V0[..45]));
        assert!(!ContentHash::is_valid(&V1.to_uppercase()));
        assert!(!ContentHash::is_valid(""));
    }

    #[test]
    fn parse_strips_ipfs_scheme() {
        let hash: ContentHash = format!("ipfs://{V0}").parse().unwrap();
        assert_eq!(hash.as_str(), V0);
        assert_eq!(hash.ipfs_uri(), format!("ipfs://{V0}"));
    }

    #[test]
    fn gateway_urls() {
        let hash: ContentHash = V0.parse().unwrap();
        assert_eq!(hash.gateway_url(0), format!("https://gateway.pinata.cloud/ipfs/{V0}"));
        assert_eq!(hash.gateway_url(99), format!("https://dweb.link/ipfs/{V0}"));
    }
}
