//! Creating elections on chain and reading them back from the ledger and the mirror.

use std::sync::Arc;

use nftvote_backend::{CreateElectionWithTx, MirrorStore, NewCandidateDto};
use nftvote_chain::{
    ElectionCreatedEvent, OnChainCandidate, OnChainElection, VotingSystemContract,
};
use nftvote_reconciler::{ConfirmedTx, InconsistencyKind, Reconciler};
use nftvote_types::{
    Address, BlockchainElectionId, ChainDescriptor, ElectionChainId, Timestamp, TxHash,
};
use nftvote_utils::election_create_span;
use tracing::{error, info, warn, Instrument};

use crate::{ChainVotes, Election, ElectionDraft, ElectionError, ElectionStatus, ValidatedDraft};

/// Outcome of a successful [`ElectionManager::create_election`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedElection {
    pub chain_id: ElectionChainId,
    /// Mirror key. `None` when the chain id could not be resolved.
    pub offchain_id: Option<String>,
    pub creation_tx: TxHash,
    pub candidate_txs: Vec<TxHash>,
    /// Status of the new election at creation time.
    pub status: ElectionStatus,
    /// Confirmed on chain but left for an operator; see `inconsistency`.
    pub needs_reconciliation: bool,
    pub inconsistency: Option<u64>,
}

pub struct ElectionManager {
    voting: VotingSystemContract,
    mirror: Arc<dyn MirrorStore>,
    reconciler: Arc<Reconciler>,
}

impl ElectionManager {
    pub fn new(
        voting: VotingSystemContract,
        mirror: Arc<dyn MirrorStore>,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self {
            voting,
            mirror,
            reconciler,
        }
    }

    pub fn contract(&self) -> &VotingSystemContract {
        &self.voting
    }

    /// Create the election on chain, register its candidates in order, then
    /// write the mirror.
    ///
    /// Nothing is rolled back on chain. A failure after the creation
    /// transaction confirmed is journalled before it is returned.
    pub async fn create_election(
        &self,
        admin: Address,
        draft: &ElectionDraft,
        now: Timestamp,
    ) -> Result<CreatedElection, ElectionError> {
        let draft = draft.validate()?;
        let chain = self.voting.provider().descriptor().kind;
        let span = election_create_span(chain.as_str(), &draft.title);
        self.create_validated(admin, draft, now).instrument(span).await
    }

    async fn create_validated(
        &self,
        admin: Address,
        draft: ValidatedDraft,
        now: Timestamp,
    ) -> Result<CreatedElection, ElectionError> {
        let provider = self.voting.provider().as_ref();
        let status = ElectionStatus::at(draft.start, draft.end, now, false);
        if status == ElectionStatus::Completed {
            warn!(end = %draft.end, "creating an election whose window has already closed");
        }

        let confirmed = self
            .reconciler
            .submit_and_confirm(provider, || {
                self.voting.submit_create_election(
                    admin,
                    &draft.title,
                    &draft.description,
                    draft.start,
                    draft.end,
                    &draft.eligible_areas,
                )
            })
            .await?;
        let creation_tx = confirmed.hash;

        let events = ElectionCreatedEvent::from_receipt(&confirmed.receipt, &self.voting.address());
        let chain_id = ElectionChainId::from(events.first().map(|e| e.election_id));
        let Some(election) = chain_id.assigned() else {
            let entry = self.reconciler.journal().record(
                InconsistencyKind::ElectionIdUnresolved,
                confirmed.chain,
                creation_tx,
                format!(
                    "election '{}' confirmed in block {} without an ElectionCreated event",
                    draft.title,
                    confirmed.block_number()
                ),
                self.reconciler.clock().now(),
            );
            return Ok(CreatedElection {
                chain_id,
                offchain_id: None,
                creation_tx,
                candidate_txs: Vec::new(),
                status,
                needs_reconciliation: true,
                inconsistency: Some(entry.id),
            });
        };
        info!(%election, tx = %creation_tx, "election created on chain");

        let candidate_txs = self
            .register_candidates(admin, election, &draft, &confirmed)
            .await?;

        let request = CreateElectionWithTx {
            title: draft.title.clone(),
            description: draft.description.clone(),
            candidates: draft
                .candidates
                .iter()
                .map(|c| NewCandidateDto {
                    name: c.name.clone(),
                    party: c.party.clone(),
                    description: c.description.clone(),
                })
                .collect(),
            start_time: draft.start.to_rfc3339(),
            end_time: draft.end.to_rfc3339(),
            voting_area: draft.voting_area.clone(),
            eligible_areas: draft.eligible_areas.clone(),
            chain_type: confirmed.chain,
            tx_hash: creation_tx,
            blockchain_election_id: Some(election.to_string()),
        };
        let mirror = Arc::clone(&self.mirror);
        let committed = self
            .reconciler
            .mirror(
                confirmed,
                InconsistencyKind::ElectionMirror,
                &format!("election {election} '{}'", draft.title),
                |_| async move { mirror.create_election_with_tx(&request).await },
            )
            .await?;
        info!(%election, offchain_id = %committed.mirrored, "election mirrored");

        Ok(CreatedElection {
            chain_id,
            offchain_id: Some(committed.mirrored),
            creation_tx,
            candidate_txs,
            status,
            needs_reconciliation: false,
            inconsistency: None,
        })
    }

    /// `addCandidate` for each candidate, waiting for each receipt before the next.
    async fn register_candidates(
        &self,
        admin: Address,
        election: BlockchainElectionId,
        draft: &ValidatedDraft,
        creation: &ConfirmedTx,
    ) -> Result<Vec<TxHash>, ElectionError> {
        let provider = self.voting.provider().as_ref();
        let mut hashes = Vec::with_capacity(draft.candidates.len());
        for (index, candidate) in draft.candidates.iter().enumerate() {
            let result = self
                .reconciler
                .submit_and_confirm(provider, || {
                    self.voting.submit_add_candidate(
                        admin,
                        election,
                        &candidate.name,
                        &candidate.party,
                        &candidate.description,
                    )
                })
                .await;
            match result {
                Ok(tx) => {
                    info!(%election, ordinal = index + 1, name = %candidate.name, tx = %tx.hash, "candidate added");
                    hashes.push(tx.hash);
                }
                Err(source) => {
                    error!(%election, ordinal = index + 1, error = %source, "candidate registration failed after election creation");
                    let entry = self.reconciler.journal().record(
                        InconsistencyKind::ElectionMirror,
                        creation.chain,
                        creation.hash,
                        format!(
                            "election {election}: {} of {} candidates registered, '{}' failed: {source}",
                            index,
                            draft.candidates.len(),
                            candidate.name
                        ),
                        self.reconciler.clock().now(),
                    );
                    return Err(ElectionError::CandidateRegistration {
                        election,
                        creation_tx: creation.hash,
                        registered: index,
                        entry: entry.id,
                        source,
                    });
                }
            }
        }
        Ok(hashes)
    }

    pub fn status(&self, election: &Election, now: Timestamp) -> ElectionStatus {
        election.status(now)
    }

    /// Votes for `election` recorded per originating chain.
    pub async fn chain_tally(
        &self,
        election: BlockchainElectionId,
        chains: &[ChainDescriptor],
    ) -> Result<ChainVotes, ElectionError> {
        let mut tally = ChainVotes::default();
        for chain in chains {
            let votes = self.voting.votes_by_chain(election, chain.chain_id).await?;
            tally.add(chain.kind, votes);
        }
        Ok(tally)
    }

    pub async fn fetch(&self, offchain_id: &str) -> Result<Election, ElectionError> {
        Election::from_dto(self.mirror.get_voting(offchain_id).await?)
    }

    pub async fn list(&self, status: Option<ElectionStatus>) -> Result<Vec<Election>, ElectionError> {
        self.mirror
            .list_votings(status.as_ref().map(ElectionStatus::as_str))
            .await?
            .into_iter()
            .map(Election::from_dto)
            .collect()
    }

    /// The ledger's own view of an election and its candidates.
    pub async fn on_chain(
        &self,
        election: BlockchainElectionId,
    ) -> Result<(OnChainElection, Vec<OnChainCandidate>), ElectionError> {
        let info = self.voting.election_info(election).await?;
        let candidates = self.voting.election_candidates(election).await?;
        Ok((info, candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CandidateDraft;
    use nftvote_abi::contracts::voting_system;
    use nftvote_backend::BackendError;
    use nftvote_nullables::{NullChain, NullClock, NullMirror};
    use nftvote_reconciler::{CommitError, InconsistencyJournal};
    use nftvote_types::{ChainKind, Clock};
    use std::time::Duration;

    struct Fixture {
        chain: Arc<NullChain>,
        mirror: Arc<NullMirror>,
        manager: ElectionManager,
        admin: Address,
        now: Timestamp,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(NullClock::default());
        let chain = Arc::new(NullChain::bsc_with_clock(clock.clone()));
        let admin = Address::new([0xad; 20]);
        chain.connect(&[admin]);
        let mirror = Arc::new(NullMirror::new());
        let reconciler = Arc::new(
            Reconciler::new(Arc::new(InconsistencyJournal::new()), clock.clone())
                .with_poll_interval(Duration::from_millis(1)),
        );
        let voting = VotingSystemContract::new(chain.clone(), chain.deployment().voting_system);
        let manager = ElectionManager::new(voting, mirror.clone(), reconciler);
        Fixture {
            now: clock.now(),
            chain,
            mirror,
            manager,
            admin,
        }
    }

    fn draft(now: Timestamp) -> ElectionDraft {
        ElectionDraft {
            title: "Ward Council".into(),
            description: "Ward 7 council seat".into(),
            start: now.plus_secs(60),
            end: now.plus_secs(86_400),
            voting_area: "Dhaka".into(),
            eligible_areas: vec!["Dhaka".into(), "DHAKA".into(), "Gazipur".into()],
            candidates: vec![
                CandidateDraft::new("Amina", "Green", "incumbent"),
                CandidateDraft::new("", "", ""),
                CandidateDraft::new("Borhan", "Blue", ""),
                CandidateDraft::new("Chitra", "Red", ""),
            ],
        }
    }

    #[tokio::test]
    async fn creates_registers_in_order_and_mirrors() {
        let f = fixture();
        let created = f.manager.create_election(f.admin, &draft(f.now), f.now).await.unwrap();

        let election = created.chain_id.assigned().unwrap();
        assert_eq!(election.get(), 1);
        assert_eq!(created.status, ElectionStatus::Upcoming);
        assert!(!created.needs_reconciliation);
        assert_eq!(created.candidate_txs.len(), 3);
        assert_eq!(f.chain.candidates(election), vec!["Amina", "Borhan", "Chitra"]);

        let mirrored = f.mirror.created_elections();
        assert_eq!(mirrored.len(), 1);
        assert_eq!(mirrored[0].blockchain_election_id.as_deref(), Some("1"));
        assert_eq!(mirrored[0].eligible_areas, vec!["Dhaka", "Gazipur"]);
        assert_eq!(mirrored[0].tx_hash, created.creation_tx);
        assert_eq!(mirrored[0].chain_type, ChainKind::Bnb);

        let fetched = f.manager.fetch(created.offchain_id.as_deref().unwrap()).await.unwrap();
        assert_eq!(fetched.blockchain_id(), Some(election));
        assert_eq!(fetched.candidates[2].name, "Chitra");
        assert_eq!(fetched.candidates[2].ordinal.get(), 3);
    }

    #[tokio::test]
    async fn invalid_draft_never_reaches_the_chain() {
        let f = fixture();
        let mut bad = draft(f.now);
        bad.candidates.truncate(2);
        let err = f.manager.create_election(f.admin, &bad, f.now).await.unwrap_err();
        assert!(matches!(err, ElectionError::Validation(_)));
        assert_eq!(f.chain.send_attempts(), 0);
    }

    #[tokio::test]
    async fn missing_creation_event_is_flagged_not_guessed() {
        let f = fixture();
        f.chain.omit_events(true);
        let created = f.manager.create_election(f.admin, &draft(f.now), f.now).await.unwrap();

        assert!(created.chain_id.is_unresolved());
        assert!(created.needs_reconciliation);
        assert_eq!(f.chain.sent_calls(&voting_system::add_candidate()), 0);
        assert!(f.mirror.created_elections().is_empty());

        let journal = f.manager.reconciler.journal();
        let entry = journal.get(created.inconsistency.unwrap()).unwrap();
        assert_eq!(entry.kind, InconsistencyKind::ElectionIdUnresolved);
        assert_eq!(entry.tx_hash, created.creation_tx);
    }

    #[tokio::test]
    async fn rejected_creation_writes_nothing() {
        let f = fixture();
        f.chain.reject_next_sends(1);
        let err = f.manager.create_election(f.admin, &draft(f.now), f.now).await.unwrap_err();
        assert_eq!(err, ElectionError::Commit(CommitError::Rejected));
        assert!(!err.left_chain_state());
        assert!(f.mirror.created_elections().is_empty());
        assert!(f.manager.reconciler.journal().all().is_empty());
    }

    #[tokio::test]
    async fn candidate_failure_aborts_and_is_journalled() {
        let f = fixture();
        // creation and the first candidate are signed, the second is declined
        f.chain.reject_send_after(2);
        let err = f.manager.create_election(f.admin, &draft(f.now), f.now).await.unwrap_err();

        assert!(err.left_chain_state());
        let ElectionError::CandidateRegistration { election, registered, entry, source, .. } = err
        else {
            panic!("expected candidate registration failure");
        };
        assert_eq!(registered, 1);
        assert_eq!(source, CommitError::Rejected);
        assert_eq!(f.chain.candidates(election), vec!["Amina"]);
        assert_eq!(
            f.manager.reconciler.journal().get(entry).map(|e| e.kind),
            Some(InconsistencyKind::ElectionMirror)
        );
        assert!(f.mirror.created_elections().is_empty());
    }

    #[tokio::test]
    async fn mirror_failure_after_candidates_is_journalled() {
        let f = fixture();
        f.mirror.fail_next_writes(1, BackendError::Http(500));
        let err = f.manager.create_election(f.admin, &draft(f.now), f.now).await.unwrap_err();
        assert!(err.left_chain_state());
        let ElectionError::Commit(CommitError::MirrorFailed { entry, .. }) = err else {
            panic!("expected mirror failure");
        };
        let journalled = f.manager.reconciler.journal().get(entry).unwrap();
        assert_eq!(journalled.kind, InconsistencyKind::ElectionMirror);
        assert_eq!(f.chain.candidates(BlockchainElectionId::new(1)).len(), 3);
    }

    #[tokio::test]
    async fn tally_reads_every_configured_chain() {
        let f = fixture();
        let voter = Address::new([9; 20]);
        f.chain.register_voter(voter, "Dhaka", true);
        let election = f.chain.seed_election("T", f.now, f.now.plus_secs(60), &["Dhaka"], &["A", "B"]);
        f.chain.connect(&[voter]);
        let voting = f.manager.contract();
        let tx = voting
            .submit_cast_vote(voter, election, nftvote_types::CandidateId::from_index(1))
            .await
            .unwrap();
        assert!(!tx.is_zero());

        let tally = f
            .manager
            .chain_tally(election, &ChainDescriptor::defaults())
            .await
            .unwrap();
        assert_eq!(tally, ChainVotes { bnb: 1, eth: 0 });
    }
}
