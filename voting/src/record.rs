//! Confirmed vote records and the voter context a vote is cast from.

use nftvote_chain::{ChainProvider, ChainError};
use nftvote_types::{
    Address, BlockchainElectionId, CandidateId, ChainKind, Timestamp, TokenId, TxHash,
};
use serde::{Deserialize, Serialize};

/// A vote confirmed on chain. Created only from a successful receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub election: BlockchainElectionId,
    pub token: TokenId,
    pub candidate: CandidateId,
    pub voter: Address,
    pub chain: ChainKind,
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub cast_at: Timestamp,
    /// Mirror keys used for the vote-with-tx write.
    pub offchain_election: Option<String>,
    pub offchain_candidate: Option<String>,
    /// From the `VoteCast` event, when the receipt carried one.
    pub event_chain_id: Option<u64>,
    #[serde(with = "opt_hex32", default)]
    pub vote_hash: Option<[u8; 32]>,
}

mod opt_hex32 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<[u8; 32]>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => s.serialize_some(&format!("0x{}", hex::encode(bytes))),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<[u8; 32]>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(d)? else {
            return Ok(None);
        };
        let bytes = hex::decode(raw.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        <[u8; 32]>::try_from(bytes.as_slice())
            .map(Some)
            .map_err(|_| serde::de::Error::custom("vote hash must be 32 bytes"))
    }
}

/// Who is voting. Passed explicitly to every casting call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoterContext {
    pub account: Option<Address>,
    pub is_admin: bool,
}

impl VoterContext {
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn connected(account: Address) -> Self {
        Self {
            account: Some(account),
            is_admin: false,
        }
    }

    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }

    /// The wallet's first account, if one is connected.
    pub async fn from_wallet(provider: &dyn ChainProvider) -> Result<Self, ChainError> {
        let accounts = provider.accounts().await?;
        Ok(Self {
            account: accounts.first().copied(),
            is_admin: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_vote_hash_as_hex() {
        let record = VoteRecord {
            election: BlockchainElectionId::new(1),
            token: TokenId::from_raw(7).unwrap(),
            candidate: CandidateId::from_index(0),
            voter: Address::new([1; 20]),
            chain: ChainKind::Bnb,
            tx_hash: TxHash::new([2; 32]),
            block_number: 10,
            cast_at: Timestamp::new(1_740_787_200),
            offchain_election: Some("e1".into()),
            offchain_candidate: Some("c1".into()),
            event_chain_id: Some(97),
            vote_hash: Some([0xab; 32]),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["vote_hash"], format!("0x{}", "ab".repeat(32)));
        let back: VoteRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
