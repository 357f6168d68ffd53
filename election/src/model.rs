//! Elections as the client sees them.

use std::fmt;

use nftvote_backend::{CandidateDto, VotesByChainDto, VotingDto};
use nftvote_types::{
    BlockchainElectionId, CandidateId, ChainKind, ElectionChainId, Timestamp, TxHash,
};
use serde::{Deserialize, Serialize};

use crate::ElectionError;

/// Area names compare trimmed and case-insensitively.
pub fn same_area(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionStatus {
    Upcoming,
    Active,
    Completed,
    Cancelled,
}

impl ElectionStatus {
    /// Status at `now`. The window is half-open: `start <= now < end` is active.
    pub fn at(start: Timestamp, end: Timestamp, now: Timestamp, cancelled: bool) -> Self {
        if cancelled {
            Self::Cancelled
        } else if now < start {
            Self::Upcoming
        } else if now < end {
            Self::Active
        } else {
            Self::Completed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn accepts_votes(&self) -> bool {
        *self == Self::Active
    }
}

impl fmt::Display for ElectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vote counts split by the ledger they were cast on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVotes {
    pub bnb: u64,
    pub eth: u64,
}

impl ChainVotes {
    pub fn get(&self, kind: ChainKind) -> u64 {
        match kind {
            ChainKind::Bnb => self.bnb,
            ChainKind::Eth => self.eth,
        }
    }

    pub fn add(&mut self, kind: ChainKind, votes: u64) {
        match kind {
            ChainKind::Bnb => self.bnb = self.bnb.saturating_add(votes),
            ChainKind::Eth => self.eth = self.eth.saturating_add(votes),
        }
    }

    pub fn total(&self) -> u64 {
        self.bnb.saturating_add(self.eth)
    }
}

impl From<VotesByChainDto> for ChainVotes {
    fn from(dto: VotesByChainDto) -> Self {
        Self {
            bnb: dto.bnb,
            eth: dto.eth,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Mirror key; absent until the election is mirrored.
    pub offchain_id: Option<String>,
    pub ordinal: CandidateId,
    pub name: String,
    pub party: String,
    pub description: String,
    pub vote_count: u64,
    pub votes_by_chain: ChainVotes,
}

impl Candidate {
    fn from_dto(index: usize, dto: CandidateDto) -> Self {
        Self {
            offchain_id: Some(dto.id),
            ordinal: CandidateId::from_index(index),
            name: dto.name,
            party: dto.party,
            description: dto.description,
            vote_count: dto.vote_count,
            votes_by_chain: dto.votes_by_chain.map(ChainVotes::from).unwrap_or_default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    pub offchain_id: Option<String>,
    pub chain_id: ElectionChainId,
    pub chain: ChainKind,
    pub title: String,
    pub description: String,
    pub start: Timestamp,
    pub end: Timestamp,
    /// Informational; eligibility is decided by `eligible_areas`.
    pub voting_area: String,
    pub eligible_areas: Vec<String>,
    pub candidates: Vec<Candidate>,
    pub cancelled: bool,
    pub creation_tx: Option<TxHash>,
    pub total_votes: u64,
    pub votes_by_chain: ChainVotes,
}

impl Election {
    pub fn status(&self, now: Timestamp) -> ElectionStatus {
        ElectionStatus::at(self.start, self.end, now, self.cancelled)
    }

    /// Case-insensitive membership in the eligible areas.
    pub fn is_area_eligible(&self, area: &str) -> bool {
        self.eligible_areas.iter().any(|eligible| same_area(eligible, area))
    }

    pub fn candidate(&self, ordinal: CandidateId) -> Option<&Candidate> {
        self.candidates.get(ordinal.index())
    }

    pub fn candidate_by_offchain_id(&self, id: &str) -> Option<&Candidate> {
        self.candidates
            .iter()
            .find(|c| c.offchain_id.as_deref() == Some(id))
    }

    pub fn blockchain_id(&self) -> Option<BlockchainElectionId> {
        self.chain_id.assigned()
    }

    /// Build from a mirror record. Candidate ordinals follow the mirror's
    /// list order, which is the order they were added on chain.
    pub fn from_dto(dto: VotingDto) -> Result<Self, ElectionError> {
        let chain_id = match dto.blockchain_election_id.as_deref().map(str::trim) {
            None | Some("") | Some("0") => ElectionChainId::Unresolved,
            Some(raw) => raw
                .parse::<u64>()
                .map(|id| ElectionChainId::Assigned(BlockchainElectionId::new(id)))
                .map_err(|_| {
                    ElectionError::InvalidRecord(format!(
                        "election {}: blockchain id '{raw}' is not a number",
                        dto.id
                    ))
                })?,
        };
        let parse_time = |field: &str, raw: &str| {
            Timestamp::parse_rfc3339(raw).map_err(|e| {
                ElectionError::InvalidRecord(format!("election {}: {field}: {e}", dto.id))
            })
        };
        let start = parse_time("startTime", &dto.start_time)?;
        let end = parse_time("endTime", &dto.end_time)?;

        Ok(Self {
            cancelled: dto.status.eq_ignore_ascii_case("cancelled"),
            chain_id,
            chain: dto.chain_type,
            title: dto.title,
            description: dto.description,
            start,
            end,
            voting_area: dto.voting_area,
            eligible_areas: dto.eligible_areas,
            candidates: dto
                .candidates
                .into_iter()
                .enumerate()
                .map(|(i, c)| Candidate::from_dto(i, c))
                .collect(),
            creation_tx: dto.tx_hash,
            total_votes: dto.total_votes,
            votes_by_chain: dto.votes_by_chain.map(ChainVotes::from).unwrap_or_default(),
            offchain_id: Some(dto.id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto() -> VotingDto {
        VotingDto {
            id: "e1".into(),
            blockchain_election_id: Some("4".into()),
            title: "Mayor".into(),
            description: String::new(),
            candidates: vec![
                CandidateDto {
                    id: "c1".into(),
                    name: "A".into(),
                    party: "P".into(),
                    description: String::new(),
                    photo: None,
                    vote_count: 2,
                    votes_by_chain: Some(VotesByChainDto { bnb: 2, eth: 0 }),
                },
                CandidateDto {
                    id: "c2".into(),
                    name: "B".into(),
                    party: "Q".into(),
                    description: String::new(),
                    photo: None,
                    vote_count: 0,
                    votes_by_chain: None,
                },
            ],
            start_time: "2025-03-01T09:00:00Z".into(),
            end_time: "2025-03-02T09:00:00Z".into(),
            voting_area: "Dhaka".into(),
            eligible_areas: vec!["Dhaka".into(), "Gazipur".into()],
            chain_type: ChainKind::Bnb,
            status: "active".into(),
            created_by: String::new(),
            created_at: String::new(),
            total_votes: 2,
            votes_by_chain: None,
            tx_hash: None,
        }
    }

    #[test]
    fn status_boundaries() {
        let (start, end) = (Timestamp::new(100), Timestamp::new(200));
        assert_eq!(ElectionStatus::at(start, end, Timestamp::new(99), false), ElectionStatus::Upcoming);
        assert_eq!(ElectionStatus::at(start, end, Timestamp::new(100), false), ElectionStatus::Active);
        assert_eq!(ElectionStatus::at(start, end, Timestamp::new(199), false), ElectionStatus::Active);
        assert_eq!(ElectionStatus::at(start, end, Timestamp::new(200), false), ElectionStatus::Completed);
        assert_eq!(ElectionStatus::at(start, end, Timestamp::new(150), true), ElectionStatus::Cancelled);
    }

    #[test]
    fn mirror_record_maps_ordinals_in_list_order() {
        let election = Election::from_dto(dto()).unwrap();
        assert_eq!(election.blockchain_id(), Some(BlockchainElectionId::new(4)));
        assert_eq!(election.candidates[1].ordinal.get(), 2);
        assert_eq!(
            election.candidate_by_offchain_id("c2").map(|c| c.ordinal),
            Some(CandidateId::from_index(1))
        );
        assert_eq!(election.candidates[0].votes_by_chain.bnb, 2);
    }

    #[test]
    fn legacy_zero_id_is_unresolved() {
        let mut record = dto();
        record.blockchain_election_id = Some("0".into());
        assert!(Election::from_dto(record).unwrap().chain_id.is_unresolved());
    }

    #[test]
    fn garbage_id_is_rejected() {
        let mut record = dto();
        record.blockchain_election_id = Some("abc".into());
        assert!(matches!(Election::from_dto(record), Err(ElectionError::InvalidRecord(_))));
    }

    #[test]
    fn area_match_ignores_case_and_padding() {
        let election = Election::from_dto(dto()).unwrap();
        assert!(election.is_area_eligible("dhaka"));
        assert!(election.is_area_eligible(" GAZIPUR "));
        assert!(!election.is_area_eligible("Khulna"));
    }

    #[test]
    fn chain_votes_accumulate() {
        let mut votes = ChainVotes::default();
        votes.add(ChainKind::Bnb, 3);
        votes.add(ChainKind::Eth, 2);
        votes.add(ChainKind::Bnb, 1);
        assert_eq!((votes.get(ChainKind::Bnb), votes.total()), (4, 6));
    }
}
