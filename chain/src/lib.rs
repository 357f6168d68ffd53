//! Chain access for nftvote.
//!
//! [`ChainProvider`] is the single seam between the voting flows and a ledger:
//! a wallet/signing endpoint that can read contract state, submit
//! transactions and report receipts. [`JsonRpcProvider`] speaks Ethereum
//! JSON-RPC to such an endpoint. The typed wrappers in [`contracts`] encode
//! calls and decode results and events for the two deployed contracts.

pub mod contracts;
pub mod error;
pub mod events;
pub mod jsonrpc;
pub mod provider;

pub use contracts::{
    Deployment, OnChainCandidate, OnChainElection, VoterInfoInput, VoterInfoRecord,
    VoterNftContract, VotingSystemContract,
};
pub use error::ChainError;
pub use events::{ElectionCreatedEvent, VoteCastEvent, VoterRegisteredEvent};
pub use jsonrpc::JsonRpcProvider;
pub use provider::{ChainProvider, DEFAULT_POLL_INTERVAL};
