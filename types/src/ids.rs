//! Identifiers for credentials, elections, and candidates.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::TypesError;

/// A voter credential (NFT) token id. Never zero: the registry reports `0`
/// when an address holds no credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct TokenId(u64);

impl TokenId {
    /// Interpret a raw on-chain value, mapping `0` to "no credential".
    pub fn from_raw(raw: u64) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for TokenId {
    type Error = TypesError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        Self::from_raw(raw).ok_or_else(|| TypesError::Other("token id 0 is not a credential".into()))
    }
}

impl From<TokenId> for u64 {
    fn from(id: TokenId) -> Self {
        id.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Election id assigned by the voting system contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockchainElectionId(u64);

impl BlockchainElectionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlockchainElectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The outcome of reading the election id out of a creation receipt.
///
/// `Unresolved` means the transaction confirmed but no `ElectionCreated`
/// event could be decoded. It is never sent to the chain and serializes as
/// `null` for the off-chain mirror.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElectionChainId {
    Assigned(BlockchainElectionId),
    Unresolved,
}

impl ElectionChainId {
    pub fn assigned(&self) -> Option<BlockchainElectionId> {
        match self {
            Self::Assigned(id) => Some(*id),
            Self::Unresolved => None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved)
    }
}

impl From<Option<BlockchainElectionId>> for ElectionChainId {
    fn from(id: Option<BlockchainElectionId>) -> Self {
        id.map_or(Self::Unresolved, Self::Assigned)
    }
}

impl fmt::Display for ElectionChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assigned(id) => write!(f, "{id}"),
            Self::Unresolved => f.write_str("unresolved"),
        }
    }
}

impl Serialize for ElectionChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.assigned().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ElectionChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<BlockchainElectionId>::deserialize(deserializer).map(Self::from)
    }
}

/// On-chain candidate id: the 1-indexed ordinal of the `addCandidate` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct CandidateId(u64);

impl CandidateId {
    pub fn new(ordinal: u64) -> Result<Self, TypesError> {
        if ordinal == 0 {
            return Err(TypesError::InvalidOrdinal(ordinal));
        }
        Ok(Self(ordinal))
    }

    /// Ordinal for the candidate at `index` in submission order.
    pub fn from_index(index: usize) -> Self {
        Self(index as u64 + 1)
    }

    /// Position in the candidate list.
    pub fn index(&self) -> usize {
        (self.0 - 1) as usize
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for CandidateId {
    type Error = TypesError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<CandidateId> for u64 {
    fn from(id: CandidateId) -> Self {
        id.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_token_is_none() {
        assert_eq!(TokenId::from_raw(0), None);
        assert_eq!(TokenId::from_raw(7).map(|t| t.get()), Some(7));
    }

    #[test]
    fn token_id_rejects_zero_on_deserialize() {
        assert!(serde_json::from_str::<TokenId>("0").is_err());
        assert_eq!(serde_json::from_str::<TokenId>("3").unwrap().get(), 3);
    }

    #[test]
    fn unresolved_election_serializes_as_null() {
        let json = serde_json::to_string(&ElectionChainId::Unresolved).unwrap();
        assert_eq!(json, "null");
        let assigned = ElectionChainId::Assigned(BlockchainElectionId::new(4));
        assert_eq!(serde_json::to_string(&assigned).unwrap(), "4");
        let back: ElectionChainId = serde_json::from_str("null").unwrap();
        assert!(back.is_unresolved());
    }

    #[test]
    fn candidate_ordinal_is_one_indexed() {
        assert_eq!(CandidateId::from_index(0).get(), 1);
        assert_eq!(CandidateId::new(3).unwrap().index(), 2);
        assert_eq!(CandidateId::new(0), Err(TypesError::InvalidOrdinal(0)));
    }
}
