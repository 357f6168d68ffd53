//! Decoded contract events.
//!
//! Receipts are scanned for logs from the expected contract; a log that does
//! not decode as the wanted event is skipped. Callers decide what an empty
//! result means.

use nftvote_abi::contracts::{voter_nft, voting_system};
use nftvote_abi::{AbiError, Event, Token};
use nftvote_types::{Address, BlockchainElectionId, CandidateId, Timestamp, TokenId, TransactionReceipt};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElectionCreatedEvent {
    pub election_id: BlockchainElectionId,
    pub title: String,
    pub start: Timestamp,
    pub end: Timestamp,
    pub creator: Address,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteCastEvent {
    pub election_id: BlockchainElectionId,
    pub candidate_id: CandidateId,
    pub voter: Address,
    pub chain_id: u64,
    pub vote_hash: [u8; 32],
    pub timestamp: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoterRegisteredEvent {
    pub token_id: TokenId,
    pub voter: Address,
    pub residential_area: String,
    pub data_hash: [u8; 32],
    pub timestamp: Timestamp,
}

fn next(it: &mut impl Iterator<Item = Token>) -> Result<Token, AbiError> {
    it.next()
        .ok_or_else(|| AbiError::Other("event has fewer values than declared".into()))
}

impl ElectionCreatedEvent {
    fn from_tokens(tokens: Vec<Token>) -> Result<Self, AbiError> {
        let mut it = tokens.into_iter();
        Ok(Self {
            election_id: BlockchainElectionId::new(next(&mut it)?.into_u64()?),
            title: next(&mut it)?.into_string()?,
            start: Timestamp::new(next(&mut it)?.into_u64()?),
            end: Timestamp::new(next(&mut it)?.into_u64()?),
            creator: next(&mut it)?.into_address()?,
        })
    }

    pub fn from_receipt(receipt: &TransactionReceipt, contract: &Address) -> Vec<Self> {
        collect(receipt, contract, &voting_system::election_created(), Self::from_tokens)
    }
}

impl VoteCastEvent {
    fn from_tokens(tokens: Vec<Token>) -> Result<Self, AbiError> {
        let mut it = tokens.into_iter();
        let election_id = BlockchainElectionId::new(next(&mut it)?.into_u64()?);
        let candidate_id = CandidateId::new(next(&mut it)?.into_u64()?)
            .map_err(|e| AbiError::Other(e.to_string()))?;
        Ok(Self {
            election_id,
            candidate_id,
            voter: next(&mut it)?.into_address()?,
            chain_id: next(&mut it)?.into_u64()?,
            vote_hash: next(&mut it)?.into_word()?,
            timestamp: Timestamp::new(next(&mut it)?.into_u64()?),
        })
    }

    pub fn from_receipt(receipt: &TransactionReceipt, contract: &Address) -> Vec<Self> {
        collect(receipt, contract, &voting_system::vote_cast(), Self::from_tokens)
    }
}

impl VoterRegisteredEvent {
    fn from_tokens(tokens: Vec<Token>) -> Result<Self, AbiError> {
        let mut it = tokens.into_iter();
        let raw = next(&mut it)?.into_u64()?;
        let token_id =
            TokenId::from_raw(raw).ok_or_else(|| AbiError::Other("token id 0 in event".into()))?;
        Ok(Self {
            token_id,
            voter: next(&mut it)?.into_address()?,
            residential_area: next(&mut it)?.into_string()?,
            data_hash: next(&mut it)?.into_word()?,
            timestamp: Timestamp::new(next(&mut it)?.into_u64()?),
        })
    }

    pub fn from_receipt(receipt: &TransactionReceipt, contract: &Address) -> Vec<Self> {
        collect(receipt, contract, &voter_nft::voter_registered(), Self::from_tokens)
    }
}

fn collect<T>(
    receipt: &TransactionReceipt,
    contract: &Address,
    event: &Event,
    convert: fn(Vec<Token>) -> Result<T, AbiError>,
) -> Vec<T> {
    receipt
        .logs_from(contract)
        .filter_map(|log| match event.decode_log(log).and_then(convert) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::trace!(event = event.name, error = %e, "skipping log");
                None
            }
        })
        .collect()
}
