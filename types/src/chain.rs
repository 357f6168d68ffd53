//! Ledger descriptors.
//!
//! Every chain the client talks to is described by one [`ChainDescriptor`];
//! flows are chain-agnostic and only consult the descriptor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Address, TxHash, TypesError};

/// The two ledger families supported by the deployment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChainKind {
    #[serde(rename = "BNB")]
    Bnb,
    #[serde(rename = "ETH")]
    Eth,
}

impl ChainKind {
    pub const ALL: [ChainKind; 2] = [ChainKind::Bnb, ChainKind::Eth];

    /// Wire tag used by the off-chain mirror.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bnb => "BNB",
            Self::Eth => "ETH",
        }
    }

    /// Classify a numeric chain id. BSC mainnet (56) and testnet (97) are BNB;
    /// everything else is treated as the Ethereum family.
    pub fn from_chain_id(chain_id: u64) -> Self {
        match chain_id {
            56 | 97 => Self::Bnb,
            _ => Self::Eth,
        }
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainKind {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BNB" | "BSC" => Ok(Self::Bnb),
            "ETH" | "ETHEREUM" => Ok(Self::Eth),
            other => Err(TypesError::UnknownChain(other.to_string())),
        }
    }
}

/// Contract deployment on one chain. `None` means not deployed there.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    #[serde(default)]
    pub voter_nft: Option<Address>,
    #[serde(default)]
    pub voting_system: Option<Address>,
}

impl ContractAddresses {
    pub fn is_deployed(&self) -> bool {
        self.voter_nft.is_some() && self.voting_system.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDescriptor {
    pub kind: ChainKind,
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    pub explorer_url: String,
    #[serde(default)]
    pub contracts: ContractAddresses,
}

impl ChainDescriptor {
    /// BNB Smart Chain testnet with the live deployment.
    pub fn bsc_testnet() -> Self {
        Self {
            kind: ChainKind::Bnb,
            chain_id: 97,
            name: "BSC Testnet".into(),
            rpc_url: "https://data-seed-prebsc-1-s1.binance.org:8545/".into(),
            explorer_url: "https://testnet.bscscan.com".into(),
            contracts: ContractAddresses {
                voter_nft: Address::from_str("0x4d22f3dcebf3986f03e962619c072de9c3813400").ok(),
                voting_system: Address::from_str("0xdb2c618f798c8e04db4749a05bf972c94ea979e1")
                    .ok(),
            },
        }
    }

    /// Ethereum Sepolia. No contracts deployed yet.
    pub fn sepolia() -> Self {
        Self {
            kind: ChainKind::Eth,
            chain_id: 11_155_111,
            name: "Sepolia".into(),
            rpc_url: "https://rpc.sepolia.org".into(),
            explorer_url: "https://sepolia.etherscan.io".into(),
            contracts: ContractAddresses::default(),
        }
    }

    pub fn defaults() -> Vec<Self> {
        vec![Self::bsc_testnet(), Self::sepolia()]
    }

    pub fn explorer_tx_url(&self, tx: &TxHash) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), tx)
    }

    pub fn explorer_address_url(&self, address: &Address) -> String {
        format!("{}/address/{}", self.explorer_url.trim_end_matches('/'), address)
    }
}

impl fmt::Display for ChainDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_as_wire_tag() {
        assert_eq!(serde_json::to_string(&ChainKind::Bnb).unwrap(), "\"BNB\"");
        assert_eq!(serde_json::to_string(&ChainKind::Eth).unwrap(), "\"ETH\"");
    }

    #[test]
    fn kind_from_chain_id() {
        assert_eq!(ChainKind::from_chain_id(97), ChainKind::Bnb);
        assert_eq!(ChainKind::from_chain_id(56), ChainKind::Bnb);
        assert_eq!(ChainKind::from_chain_id(11_155_111), ChainKind::Eth);
    }

    #[test]
    fn testnet_is_deployed_sepolia_is_not() {
        assert!(ChainDescriptor::bsc_testnet().contracts.is_deployed());
        assert!(!ChainDescriptor::sepolia().contracts.is_deployed());
    }

    #[test]
    fn explorer_links() {
        let chain = ChainDescriptor::bsc_testnet();
        let tx = TxHash::new([0x0f; 32]);
        assert_eq!(
            chain.explorer_tx_url(&tx),
            format!("https://testnet.bscscan.com/tx/0x{}", "0f".repeat(32))
        );
    }
}
