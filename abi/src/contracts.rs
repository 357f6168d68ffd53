//! Interfaces of the two deployed contracts.
//!
//! Names and parameter lists match the deployed bytecode exactly; selectors
//! and topics are derived from them.

use crate::{ContractError, Event, EventParam, Function, ParamType};

fn uint() -> ParamType {
    ParamType::uint256()
}

/// The soulbound voter credential (ERC-721) contract.
pub mod voter_nft {
    use super::*;

    pub fn get_owned_token_id() -> Function {
        Function::new("getOwnedTokenId", vec![ParamType::Address], vec![uint()])
    }

    pub fn is_token_verified() -> Function {
        Function::new("isTokenVerified", vec![uint()], vec![ParamType::Bool])
    }

    /// Returns `(tokenId, area, verified, regTime)` for a holder.
    pub fn get_voter_info() -> Function {
        Function::new(
            "getVoterInfo",
            vec![ParamType::Address],
            vec![uint(), ParamType::String, ParamType::Bool, uint()],
        )
    }

    pub fn is_nid_registered() -> Function {
        Function::new("isNIDRegistered", vec![ParamType::String], vec![ParamType::Bool])
    }

    pub fn total_registered_voters() -> Function {
        Function::new("totalRegisteredVoters", vec![], vec![uint()])
    }

    pub fn token_uri() -> Function {
        Function::new("tokenURI", vec![uint()], vec![ParamType::String])
    }

    /// Field order of the `voterInfo` tuple passed to `mintVoterNFT`.
    pub const VOTER_INFO_FIELDS: [&str; 7] = [
        "name",
        "fatherName",
        "motherName",
        "dateOfBirth",
        "nidNumber",
        "residentialArea",
        "ipfsMetadataHash",
    ];

    pub fn mint_voter_nft() -> Function {
        Function::new(
            "mintVoterNFT",
            vec![
                ParamType::Address,
                ParamType::Tuple(vec![ParamType::String; VOTER_INFO_FIELDS.len()]),
            ],
            vec![uint()],
        )
    }

    /// `VoterRegistered(uint256 indexed tokenId, address indexed voterAddress,
    /// string residentialArea, bytes32 dataHash, uint256 timestamp)`
    pub fn voter_registered() -> Event {
        Event::new(
            "VoterRegistered",
            vec![
                EventParam::indexed(uint()),
                EventParam::indexed(ParamType::Address),
                EventParam::data(ParamType::String),
                EventParam::data(ParamType::FixedBytes(32)),
                EventParam::data(uint()),
            ],
        )
    }
}

/// The election and ballot contract.
pub mod voting_system {
    use super::*;

    pub fn create_election() -> Function {
        Function::new(
            "createElection",
            vec![
                ParamType::String,
                ParamType::String,
                uint(),
                uint(),
                ParamType::array(ParamType::String),
            ],
            vec![uint()],
        )
    }

    pub fn add_candidate() -> Function {
        Function::new(
            "addCandidate",
            vec![uint(), ParamType::String, ParamType::String, ParamType::String],
            vec![uint()],
        )
    }

    pub fn cast_vote() -> Function {
        Function::new("castVote", vec![uint(), uint()], vec![])
    }

    pub fn has_voter_voted() -> Function {
        Function::new("hasVoterVoted", vec![uint(), ParamType::Address], vec![ParamType::Bool])
    }

    pub fn has_nft_voted() -> Function {
        Function::new("hasNFTVoted", vec![uint(), uint()], vec![ParamType::Bool])
    }

    pub fn get_votes_by_chain() -> Function {
        Function::new("getVotesByChain", vec![uint(), uint()], vec![uint()])
    }

    pub fn get_election_count() -> Function {
        Function::new("getElectionCount", vec![], vec![uint()])
    }

    /// Field layout of the `getElectionInfo` result tuple.
    pub fn election_info_tuple() -> ParamType {
        ParamType::Tuple(vec![
            uint(),                               // id
            ParamType::String,                    // title
            ParamType::String,                    // description
            uint(),                               // startTime
            uint(),                               // endTime
            ParamType::array(ParamType::String),  // eligibleAreas
            uint(),                               // candidateCount
            uint(),                               // totalVotes
            ParamType::Bool,                      // isActive
            ParamType::Bool,                      // resultsFinalized
            ParamType::Address,                   // creator
        ])
    }

    pub fn get_election_info() -> Function {
        Function::new("getElectionInfo", vec![uint()], vec![election_info_tuple()])
    }

    /// `(id, name, party, description, voteCount)`
    pub fn candidate_tuple() -> ParamType {
        ParamType::Tuple(vec![
            uint(),
            ParamType::String,
            ParamType::String,
            ParamType::String,
            uint(),
        ])
    }

    pub fn get_election_candidates() -> Function {
        Function::new(
            "getElectionCandidates",
            vec![uint()],
            vec![ParamType::array(candidate_tuple())],
        )
    }

    /// `ElectionCreated(uint256 indexed electionId, string title,
    /// uint256 startTime, uint256 endTime, address creator)`
    pub fn election_created() -> Event {
        Event::new(
            "ElectionCreated",
            vec![
                EventParam::indexed(uint()),
                EventParam::data(ParamType::String),
                EventParam::data(uint()),
                EventParam::data(uint()),
                EventParam::data(ParamType::Address),
            ],
        )
    }

    /// `VoteCast(uint256 indexed electionId, uint256 indexed candidateId,
    /// address indexed voter, uint256 chainId, bytes32 voteHash, uint256 timestamp)`
    pub fn vote_cast() -> Event {
        Event::new(
            "VoteCast",
            vec![
                EventParam::indexed(uint()),
                EventParam::indexed(uint()),
                EventParam::indexed(ParamType::Address),
                EventParam::data(uint()),
                EventParam::data(ParamType::FixedBytes(32)),
                EventParam::data(uint()),
            ],
        )
    }
}

/// Custom errors either contract may revert with.
pub fn custom_errors() -> Vec<ContractError> {
    [
        "AlreadyVoted",
        "NotVerifiedVoter",
        "NotTokenOwner",
        "NotEligibleArea",
        "ElectionNotActive",
        "ElectionEnded",
        "AlreadyHasNFT",
        "NIDAlreadyRegistered",
    ]
    .into_iter()
    .map(|name| ContractError::new(name, vec![]))
    .collect()
}
