//! Nullable mirror: an in-memory REST backend.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use nftvote_backend::*;

#[derive(Default)]
struct State {
    next_id: u64,
    votings: HashMap<String, VotingDto>,
    created: Vec<CreateElectionWithTx>,
    votes: Vec<(String, VoteWithTx)>,
    my_votes: Vec<MyVoteDto>,
    kyc_requests: HashMap<String, KycRequestDto>,
    approvals: Vec<(String, ApproveWithTx)>,
    known_nids: HashSet<String>,
    extraction: Option<ExtractionDto>,
    fail_writes: usize,
    fail_reads: Option<BackendError>,
    write_error: Option<BackendError>,
}

/// In-memory [`MirrorStore`] and [`IdentityExtractor`] that records writes.
pub struct NullMirror {
    state: Mutex<State>,
}

impl NullMirror {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn take_write_failure(&self) -> Result<(), BackendError> {
        let mut state = self.state();
        if state.fail_writes > 0 {
            state.fail_writes -= 1;
            return Err(state
                .write_error
                .clone()
                .unwrap_or_else(|| BackendError::Unreachable("mirror offline".into())));
        }
        Ok(())
    }

    fn check_reads(&self) -> Result<(), BackendError> {
        match &self.state().fail_reads {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    // --- seeding ---

    pub fn insert_voting(&self, voting: VotingDto) {
        self.state().votings.insert(voting.id.clone(), voting);
    }

    pub fn insert_kyc_request(&self, request: KycRequestDto) {
        self.state().kyc_requests.insert(request.id.clone(), request);
    }

    /// An NID already present in the off-chain database.
    pub fn insert_known_nid(&self, nid: &str) {
        self.state().known_nids.insert(nid.to_string());
    }

    pub fn set_extraction(&self, extraction: ExtractionDto) {
        self.state().extraction = Some(extraction);
    }

    pub fn push_my_vote(&self, vote: MyVoteDto) {
        self.state().my_votes.push(vote);
    }

    // --- faults ---

    /// The next `n` writes fail with `error`.
    pub fn fail_next_writes(&self, n: usize, error: BackendError) {
        let mut state = self.state();
        state.fail_writes = n;
        state.write_error = Some(error);
    }

    pub fn fail_reads(&self, error: Option<BackendError>) {
        self.state().fail_reads = error;
    }

    // --- inspection ---

    pub fn created_elections(&self) -> Vec<CreateElectionWithTx> {
        self.state().created.clone()
    }

    pub fn recorded_votes(&self) -> Vec<(String, VoteWithTx)> {
        self.state().votes.clone()
    }

    pub fn approvals(&self) -> Vec<(String, ApproveWithTx)> {
        self.state().approvals.clone()
    }

    pub fn kyc_status(&self, request_id: &str) -> Option<KycStatus> {
        self.state().kyc_requests.get(request_id).map(|r| r.status)
    }
}

impl Default for NullMirror {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(what: &str, id: &str) -> BackendError {
    BackendError::Rejected {
        code: "NOT_FOUND".into(),
        msg: format!("{what} {id} not found"),
    }
}

#[async_trait]
impl MirrorStore for NullMirror {
    async fn create_election_with_tx(
        &self,
        request: &CreateElectionWithTx,
    ) -> Result<String, BackendError> {
        self.take_write_failure()?;
        let mut state = self.state();
        state.next_id += 1;
        let id = format!("election-{}", state.next_id);
        let candidates = request
            .candidates
            .iter()
            .enumerate()
            .map(|(i, c)| CandidateDto {
                id: format!("{id}-c{}", i + 1),
                name: c.name.clone(),
                party: c.party.clone(),
                description: c.description.clone(),
                photo: None,
                vote_count: 0,
                votes_by_chain: None,
            })
            .collect();
        let voting = VotingDto {
            id: id.clone(),
            blockchain_election_id: request.blockchain_election_id.clone(),
            title: request.title.clone(),
            description: request.description.clone(),
            candidates,
            start_time: request.start_time.clone(),
            end_time: request.end_time.clone(),
            voting_area: request.voting_area.clone(),
            eligible_areas: request.eligible_areas.clone(),
            chain_type: request.chain_type,
            status: String::new(),
            created_by: String::new(),
            created_at: String::new(),
            total_votes: 0,
            votes_by_chain: None,
            tx_hash: Some(request.tx_hash),
        };
        state.votings.insert(id.clone(), voting);
        state.created.push(request.clone());
        Ok(id)
    }

    async fn record_vote_with_tx(
        &self,
        voting_id: &str,
        request: &VoteWithTx,
    ) -> Result<VoteReceiptDto, BackendError> {
        self.take_write_failure()?;
        let mut state = self.state();
        if state
            .votes
            .iter()
            .any(|(v, r)| v == voting_id && r.tx_hash == request.tx_hash)
        {
            return Err(BackendError::Rejected {
                code: "DUPLICATE_TX".into(),
                msg: "transaction already recorded".into(),
            });
        }
        state.votes.push((voting_id.to_string(), request.clone()));
        if let Some(voting) = state.votings.get_mut(voting_id) {
            voting.total_votes += 1;
            if let Some(c) = voting.candidates.iter_mut().find(|c| c.id == request.candidate_id) {
                c.vote_count += 1;
            }
        }
        Ok(VoteReceiptDto {
            transaction_hash: request.tx_hash.to_string(),
            block_number: request.block_number,
        })
    }

    async fn get_voting(&self, voting_id: &str) -> Result<VotingDto, BackendError> {
        self.check_reads()?;
        self.state()
            .votings
            .get(voting_id)
            .cloned()
            .ok_or_else(|| not_found("voting", voting_id))
    }

    async fn list_votings(&self, status: Option<&str>) -> Result<Vec<VotingDto>, BackendError> {
        self.check_reads()?;
        let mut votings: Vec<VotingDto> = self
            .state()
            .votings
            .values()
            .filter(|v| status.map_or(true, |s| v.status == s))
            .cloned()
            .collect();
        votings.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(votings)
    }

    async fn my_votes(&self) -> Result<Vec<MyVoteDto>, BackendError> {
        self.check_reads()?;
        Ok(self.state().my_votes.clone())
    }

    async fn kyc_request(&self, request_id: &str) -> Result<KycRequestDto, BackendError> {
        self.check_reads()?;
        self.state()
            .kyc_requests
            .get(request_id)
            .cloned()
            .ok_or_else(|| not_found("kyc request", request_id))
    }

    async fn approve_kyc_with_tx(
        &self,
        request_id: &str,
        request: &ApproveWithTx,
    ) -> Result<ApprovalDto, BackendError> {
        self.take_write_failure()?;
        let mut state = self.state();
        let kyc = state
            .kyc_requests
            .get_mut(request_id)
            .ok_or_else(|| not_found("kyc request", request_id))?;
        kyc.status = KycStatus::Approved;
        kyc.nft_transaction_hash = Some(request.tx_hash.to_string());
        if let Some(nid) = kyc.nid_number.clone() {
            state.known_nids.insert(nid);
        }
        state.approvals.push((request_id.to_string(), request.clone()));
        Ok(ApprovalDto {
            nft_token_id: String::new(),
            transaction_hash: request.tx_hash.to_string(),
        })
    }

    async fn check_duplicate_nid(&self, nid: &str) -> Result<DuplicateNidDto, BackendError> {
        self.check_reads()?;
        let is_duplicate = self.state().known_nids.contains(nid);
        Ok(DuplicateNidDto {
            is_duplicate,
            message: is_duplicate.then(|| "NID already registered".to_string()),
        })
    }
}

#[async_trait]
impl IdentityExtractor for NullMirror {
    async fn extract_id(&self, _image_base64: &str) -> Result<ExtractionDto, BackendError> {
        self.check_reads()?;
        self.state()
            .extraction
            .clone()
            .ok_or_else(|| BackendError::Other("no extraction configured".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nftvote_types::{ChainKind, TxHash};

    fn request() -> CreateElectionWithTx {
        CreateElectionWithTx {
            title: "t".into(),
            description: "d".into(),
            candidates: vec![NewCandidateDto {
                name: "A".into(),
                party: "P".into(),
                description: String::new(),
            }],
            start_time: "2025-03-01T09:00:00Z".into(),
            end_time: "2025-03-02T09:00:00Z".into(),
            voting_area: "Dhaka".into(),
            eligible_areas: vec!["Dhaka".into()],
            chain_type: ChainKind::Bnb,
            tx_hash: TxHash::new([1; 32]),
            blockchain_election_id: Some("1".into()),
        }
    }

    #[tokio::test]
    async fn created_election_is_readable() {
        let mirror = NullMirror::new();
        let id = mirror.create_election_with_tx(&request()).await.unwrap();
        let voting = mirror.get_voting(&id).await.unwrap();
        assert_eq!(voting.candidates[0].id, format!("{id}-c1"));
        assert_eq!(mirror.created_elections().len(), 1);
    }

    #[tokio::test]
    async fn injected_write_failure_is_consumed() {
        let mirror = NullMirror::new();
        mirror.fail_next_writes(1, BackendError::Http(503));
        assert_eq!(
            mirror.create_election_with_tx(&request()).await,
            Err(BackendError::Http(503))
        );
        assert!(mirror.create_election_with_tx(&request()).await.is_ok());
    }
}
