//! ERC-721 metadata for a voter credential.
//!
//! The document is public once pinned, so identity data appears only as
//! Keccak-256 hashes under `properties`.

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use nftvote_crypto::keccak256_multi;
use nftvote_pinning::ContentHash;
use nftvote_types::{Address, ChainKind};
use serde::{Deserialize, Serialize};

use crate::Nid;

pub const DESCRIPTION: &str = "NFT-based Voter Identity for Decentralized Voting System. \
This token represents a verified voter credential that enables participation in \
blockchain-based elections.";

pub const DEFAULT_EXTERNAL_URL: &str = "https://nft-voting-system.example.com";

/// The identity fields written into the mint call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityRecord {
    pub name: String,
    pub father_name: String,
    pub mother_name: String,
    pub date_of_birth: String,
    pub nid: Nid,
    pub residential_area: String,
}

impl IdentityRecord {
    /// Keccak-256 over the personal fields in mint order.
    pub fn data_hash(&self) -> [u8; 32] {
        keccak256_multi(&[
            self.name.as_bytes(),
            self.father_name.as_bytes(),
            self.mother_name.as_bytes(),
            self.date_of_birth.as_bytes(),
            self.nid.as_str().as_bytes(),
        ])
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub trait_type: String,
    pub value: serde_json::Value,
}

impl Attribute {
    fn new(trait_type: &str, value: impl Into<serde_json::Value>) -> Self {
        Self {
            trait_type: trait_type.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataProperties {
    pub voter_wallet: Address,
    pub nid_hash: String,
    pub data_hash: String,
    pub registration_date: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoterMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
    pub external_url: String,
    pub attributes: Vec<Attribute>,
    pub properties: MetadataProperties,
}

pub fn network_name(chain: ChainKind) -> &'static str {
    match chain {
        ChainKind::Bnb => "BNB Smart Chain",
        ChainKind::Eth => "Ethereum",
    }
}

fn hex32(bytes: [u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}

impl VoterMetadata {
    pub fn build(
        identity: &IdentityRecord,
        wallet: Address,
        chain: ChainKind,
        photo: &ContentHash,
        external_url: &str,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: format!("Voter ID - {}", identity.name),
            description: DESCRIPTION.to_string(),
            image: photo.ipfs_uri(),
            external_url: external_url.to_string(),
            attributes: vec![
                Attribute::new("Voter Name", identity.name.as_str()),
                Attribute::new("Residential Area", identity.residential_area.as_str()),
                Attribute::new("Blockchain Network", network_name(chain)),
                Attribute::new("Verification Status", "Verified"),
                Attribute::new("Registration Year", issued_at.year()),
            ],
            properties: MetadataProperties {
                voter_wallet: wallet,
                nid_hash: hex32(identity.nid.hash()),
                data_hash: hex32(identity.data_hash()),
                registration_date: issued_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        }
    }

    /// Name the document is pinned under.
    pub fn pin_name(&self) -> String {
        format!("voter-metadata-{}.json", self.properties.voter_wallet.to_hex())
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
