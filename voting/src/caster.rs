//! The async service that drives a [`VoteMachine`] against the ledger.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use nftvote_backend::{BackendError, MirrorStore, VoteReceiptDto, VoteWithTx};
use nftvote_chain::{ChainError, VoteCastEvent, VotingSystemContract};
use nftvote_election::Election;
use nftvote_reconciler::{CommitError, ConfirmedTx, InconsistencyKind, Reconciler};
use nftvote_registry::CredentialRegistry;
use nftvote_types::{Address, BlockchainElectionId, CandidateId, Timestamp, TokenId};
use nftvote_utils::{remirror_span, vote_cast_span};
use tracing::{debug, info, warn, Instrument};

use crate::{
    classify, EligibilityFacts, Fact, Verdict, VoteError, VoteEvent, VoteMachine, VoteRecord,
    VoterContext,
};

type InFlight = Arc<Mutex<HashSet<(BlockchainElectionId, TokenId)>>>;

/// Result of querying the four eligibility facts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EligibilityCheck {
    pub facts: EligibilityFacts,
    pub verdict: Verdict,
}

impl EligibilityCheck {
    pub fn token(&self) -> Option<TokenId> {
        self.facts.credential.known().copied().flatten()
    }
}

/// Releases the `(election, token)` slot when the submission ends,
/// however it ends.
struct InFlightGuard {
    set: InFlight,
    key: (BlockchainElectionId, TokenId),
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.key);
    }
}

pub struct VoteCaster {
    voting: VotingSystemContract,
    registry: Arc<dyn CredentialRegistry>,
    mirror: Arc<dyn MirrorStore>,
    reconciler: Arc<Reconciler>,
    in_flight: InFlight,
}

impl VoteCaster {
    pub fn new(
        voting: VotingSystemContract,
        registry: Arc<dyn CredentialRegistry>,
        mirror: Arc<dyn MirrorStore>,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self {
            voting,
            registry,
            mirror,
            reconciler,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn claim(
        &self,
        election: BlockchainElectionId,
        token: TokenId,
    ) -> Result<InFlightGuard, VoteError> {
        let key = (election, token);
        let inserted = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key);
        if !inserted {
            return Err(VoteError::InFlight);
        }
        Ok(InFlightGuard {
            set: Arc::clone(&self.in_flight),
            key,
        })
    }

    /// Query the eligibility facts for `ctx` in `election`.
    ///
    /// The holder's token is resolved first. Verification, area and voting
    /// status depend only on the token and are queried concurrently.
    pub async fn check_eligibility(
        &self,
        ctx: &VoterContext,
        election: &Election,
        now: Timestamp,
    ) -> EligibilityCheck {
        let mut facts = EligibilityFacts::pending(ctx.account, election.status(now));
        facts.is_admin = ctx.is_admin;
        facts.on_chain = election.blockchain_id().is_some();

        if let Some(account) = ctx.account {
            facts.credential = Fact::from_result(self.registry.resolve_holder_token(account).await);
            if let Some(Some(token)) = facts.credential.known().copied() {
                let voted = async {
                    match election.blockchain_id() {
                        Some(id) => self.voting.has_nft_voted(id, token).await,
                        None => Ok::<_, ChainError>(false),
                    }
                };
                let (verified, info, voted) = tokio::join!(
                    self.registry.is_verified(token),
                    self.registry.credential_info(account),
                    voted
                );
                facts.verified = Fact::from_result(verified);
                facts.area_eligible = Fact::from_result(
                    info.map(|info| info.is_some_and(|i| election.is_area_eligible(&i.area))),
                );
                facts.already_voted = Fact::from_result(voted);
            }
        }

        let verdict = facts.verdict();
        debug!(account = ?ctx.account, election = %election.chain_id, %verdict, "eligibility checked");
        EligibilityCheck { facts, verdict }
    }

    /// Cast a vote for the candidate with on-chain ordinal `candidate`.
    pub async fn cast_vote(
        &self,
        ctx: &VoterContext,
        election: &Election,
        candidate: CandidateId,
        now: Timestamp,
    ) -> Result<VoteRecord, VoteError> {
        let mut machine = VoteMachine::new();
        self.drive(&mut machine, ctx, election, candidate, now).await
    }

    /// [`VoteCaster::cast_vote`] recording every state in a caller-owned machine.
    pub async fn drive(
        &self,
        machine: &mut VoteMachine,
        ctx: &VoterContext,
        election: &Election,
        candidate: CandidateId,
        now: Timestamp,
    ) -> Result<VoteRecord, VoteError> {
        machine.apply(VoteEvent::CheckStarted)?;
        let check = self.check_eligibility(ctx, election, now).await;
        machine.apply(VoteEvent::VerdictReached(check.verdict.clone()))?;

        let (Some(voter), Some(token), Some(election_id), true) = (
            ctx.account,
            check.token(),
            election.blockchain_id(),
            check.verdict.is_eligible(),
        ) else {
            return Err(VoteError::NotEligible(check.verdict));
        };
        if election.candidate(candidate).is_none() {
            return Err(VoteError::InvalidCandidate {
                ordinal: candidate.get(),
                count: election.candidates.len(),
            });
        }

        let chain = self.voting.provider().descriptor().kind;
        let span = vote_cast_span(chain.as_str(), election_id.get(), token.get());
        self.submit(machine, voter, token, election_id, election, candidate)
            .instrument(span)
            .await
    }

    async fn submit(
        &self,
        machine: &mut VoteMachine,
        voter: Address,
        token: TokenId,
        election_id: BlockchainElectionId,
        election: &Election,
        candidate: CandidateId,
    ) -> Result<VoteRecord, VoteError> {
        let _guard = self.claim(election_id, token)?;
        machine.apply(VoteEvent::SubmitRequested(candidate))?;

        match self.voting.has_nft_voted(election_id, token).await {
            Ok(false) => {}
            Ok(true) => return Err(fail(machine, "AlreadyVoted")),
            Err(e) => {
                warn!(error = %e, "voting status re-check failed");
                fail(machine, &e.to_string());
                return Err(VoteError::StatusCheck(e));
            }
        }

        let provider = self.voting.provider().as_ref();
        let hash = match self.voting.submit_cast_vote(voter, election_id, candidate).await {
            Ok(hash) => hash,
            Err(e) => return Err(fail(machine, &e.to_string())),
        };
        machine.apply(VoteEvent::Submitted(hash))?;

        let confirmed = match self.reconciler.confirm(provider, hash).await {
            Ok(confirmed) => confirmed,
            Err(e) => return Err(fail(machine, &e.to_string())),
        };
        let record = self.record(&confirmed, voter, token, election_id, election, candidate);
        info!(tx = %record.tx_hash, block = record.block_number, candidate = %candidate.get(), "vote confirmed on chain");

        let mirror = Arc::clone(&self.mirror);
        let (voting_id, candidate_id) = (
            record.offchain_election.clone(),
            record.offchain_candidate.clone(),
        );
        let result = self
            .reconciler
            .mirror(
                confirmed,
                InconsistencyKind::VoteMirror,
                &format!("vote of token {token} in election {election_id}"),
                move |tx| async move {
                    let (Some(voting_id), Some(candidate_id)) = (voting_id, candidate_id) else {
                        return Err(BackendError::Other(
                            "election has no mirror record".into(),
                        ));
                    };
                    let request = VoteWithTx {
                        candidate_id,
                        tx_hash: tx.hash,
                        block_number: tx.block_number(),
                    };
                    mirror.record_vote_with_tx(&voting_id, &request).await
                },
            )
            .await;

        match result {
            Ok(_) => {
                machine.apply(VoteEvent::Confirmed(record.clone()))?;
                info!(tx = %record.tx_hash, "vote mirrored");
                Ok(record)
            }
            Err(CommitError::MirrorFailed { entry, source, .. }) => {
                machine.apply(VoteEvent::MirrorFailed {
                    record: record.clone(),
                    inconsistency: entry,
                })?;
                Err(VoteError::NotMirrored {
                    record: Box::new(record),
                    inconsistency: entry,
                    source,
                })
            }
            Err(other) => Err(fail(machine, &other.to_string())),
        }
    }

    fn record(
        &self,
        confirmed: &ConfirmedTx,
        voter: Address,
        token: TokenId,
        election_id: BlockchainElectionId,
        election: &Election,
        candidate: CandidateId,
    ) -> VoteRecord {
        let event = VoteCastEvent::from_receipt(&confirmed.receipt, &self.voting.address())
            .into_iter()
            .find(|e| e.election_id == election_id);
        VoteRecord {
            election: election_id,
            token,
            candidate,
            voter,
            chain: confirmed.chain,
            tx_hash: confirmed.hash,
            block_number: confirmed.block_number(),
            cast_at: event
                .as_ref()
                .map(|e| e.timestamp)
                .unwrap_or_else(|| self.reconciler.clock().now()),
            offchain_election: election.offchain_id.clone(),
            offchain_candidate: election
                .candidate(candidate)
                .and_then(|c| c.offchain_id.clone()),
            event_chain_id: event.as_ref().map(|e| e.chain_id),
            vote_hash: event.map(|e| e.vote_hash),
        }
    }

    /// Retry the mirror write for a vote that is confirmed on chain.
    ///
    /// The chain is consulted first. The mirror is written only if the
    /// credential has voted and `record.tx_hash` is a mined, successful
    /// transaction whose `VoteCast` log and block match the record. On
    /// success the journal entry for the transaction is resolved.
    pub async fn remirror(&self, record: &VoteRecord) -> Result<VoteReceiptDto, VoteError> {
        let span = remirror_span(InconsistencyKind::VoteMirror.as_str(), &record.tx_hash.to_string());
        async {
            let (Some(voting_id), Some(candidate_id)) =
                (&record.offchain_election, &record.offchain_candidate)
            else {
                return Err(VoteError::MissingMirrorIds);
            };
            let voted = self
                .voting
                .has_nft_voted(record.election, record.token)
                .await
                .map_err(VoteError::StatusCheck)?;
            if !voted {
                return Err(VoteError::NotOnChain {
                    election: record.election,
                    token: record.token,
                });
            }
            self.verify_record(record).await?;

            let journal = self.reconciler.journal();
            let open = journal.find_unresolved(InconsistencyKind::VoteMirror, record.tx_hash);
            let request = VoteWithTx {
                candidate_id: candidate_id.clone(),
                tx_hash: record.tx_hash,
                block_number: record.block_number,
            };
            match self.mirror.record_vote_with_tx(voting_id, &request).await {
                Ok(receipt) => {
                    if let Some(entry) = open {
                        journal.resolve(entry.id);
                    }
                    info!(tx = %record.tx_hash, "vote re-mirrored");
                    Ok(receipt)
                }
                Err(source) => {
                    let inconsistency = match open {
                        Some(entry) => entry.id,
                        None => {
                            journal
                                .record(
                                    InconsistencyKind::VoteMirror,
                                    record.chain,
                                    record.tx_hash,
                                    format!("re-mirror failed: {source}"),
                                    self.reconciler.clock().now(),
                                )
                                .id
                        }
                    };
                    Err(VoteError::NotMirrored {
                        record: Box::new(record.clone()),
                        inconsistency,
                        source,
                    })
                }
            }
        }
        .instrument(span)
        .await
    }

    /// The receipt of `record.tx_hash` must show this vote.
    async fn verify_record(&self, record: &VoteRecord) -> Result<(), VoteError> {
        let unconfirmed = |detail: String| VoteError::Unconfirmed {
            tx: record.tx_hash,
            detail,
        };
        let provider = self.voting.provider().as_ref();
        let confirmed = match self.reconciler.verify(provider, record.tx_hash).await {
            Ok(confirmed) => confirmed,
            Err(CommitError::Chain(e)) => return Err(VoteError::StatusCheck(e)),
            Err(e) => return Err(unconfirmed(e.to_string())),
        };
        if confirmed.block_number() != record.block_number {
            return Err(unconfirmed(format!(
                "mined in block {}, record says {}",
                confirmed.block_number(),
                record.block_number
            )));
        }
        let cast = VoteCastEvent::from_receipt(&confirmed.receipt, &self.voting.address())
            .into_iter()
            .any(|e| {
                e.election_id == record.election
                    && e.candidate_id == record.candidate
                    && e.voter == record.voter
            });
        if !cast {
            return Err(unconfirmed("no matching VoteCast log".into()));
        }
        Ok(())
    }
}

/// Classify `text`, move the machine to `Failed`, and build the error.
fn fail(machine: &mut VoteMachine, text: &str) -> VoteError {
    let failure = classify(text);
    warn!(category = failure.category(), detail = %text, "vote failed");
    match machine.apply(VoteEvent::Failed(failure.clone())) {
        Ok(_) => VoteError::Failed(failure),
        Err(e) => VoteError::Transition(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IneligibleReason, VoteFailure, VoteState};
    use nftvote_abi::contracts::voting_system;
    use nftvote_chain::VoterNftContract;
    use nftvote_election::{Candidate, ChainVotes};
    use nftvote_nullables::{NullChain, NullClock, NullMirror};
    use nftvote_reconciler::InconsistencyJournal;
    use nftvote_registry::ChainRegistry;
    use nftvote_types::{ChainKind, Clock, ElectionChainId};
    use std::time::Duration;

    struct Fixture {
        clock: Arc<NullClock>,
        chain: Arc<NullChain>,
        mirror: Arc<NullMirror>,
        caster: VoteCaster,
        journal: Arc<InconsistencyJournal>,
        voter: Address,
        token: TokenId,
        election: Election,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(NullClock::default());
        let chain = Arc::new(NullChain::bsc_with_clock(clock.clone()));
        let voter = Address::new([0x11; 20]);
        chain.connect(&[voter]);
        let token = chain.register_voter(voter, "Dhaka", true);
        let now = clock.now();
        let id = chain.seed_election(
            "Mayor",
            now,
            now.plus_secs(3_600),
            &["dhaka", "Gazipur"],
            &["A", "B"],
        );

        let deployment = chain.deployment();
        let registry = Arc::new(ChainRegistry::new(VoterNftContract::new(
            chain.clone(),
            deployment.voter_nft,
        )));
        let journal = Arc::new(InconsistencyJournal::new());
        let reconciler = Arc::new(
            Reconciler::new(journal.clone(), clock.clone())
                .with_poll_interval(Duration::from_millis(1)),
        );
        let mirror = Arc::new(NullMirror::new());
        let caster = VoteCaster::new(
            VotingSystemContract::new(chain.clone(), deployment.voting_system),
            registry,
            mirror.clone(),
            reconciler,
        );

        let candidate = |i: usize, name: &str| Candidate {
            offchain_id: Some(format!("c{}", i + 1)),
            ordinal: CandidateId::from_index(i),
            name: name.into(),
            party: String::new(),
            description: String::new(),
            vote_count: 0,
            votes_by_chain: ChainVotes::default(),
        };
        let election = Election {
            offchain_id: Some("e1".into()),
            chain_id: ElectionChainId::Assigned(id),
            chain: ChainKind::Bnb,
            title: "Mayor".into(),
            description: String::new(),
            start: now,
            end: now.plus_secs(3_600),
            voting_area: "Dhaka".into(),
            eligible_areas: vec!["DHAKA".into(), "Gazipur".into()],
            candidates: vec![candidate(0, "A"), candidate(1, "B")],
            cancelled: false,
            creation_tx: None,
            total_votes: 0,
            votes_by_chain: ChainVotes::default(),
        };

        Fixture {
            clock,
            chain,
            mirror,
            caster,
            journal,
            voter,
            token,
            election,
        }
    }

    fn second() -> CandidateId {
        CandidateId::from_index(1)
    }

    #[tokio::test]
    async fn eligible_voter_is_confirmed_and_mirrored() {
        let f = fixture();
        let ctx = VoterContext::connected(f.voter);
        let mut machine = VoteMachine::new();
        let record = f
            .caster
            .drive(&mut machine, &ctx, &f.election, second(), f.clock.now())
            .await
            .unwrap();

        assert_eq!(machine.state(), &VoteState::Confirmed(record.clone()));
        assert_eq!(record.token, f.token);
        assert_eq!(record.event_chain_id, Some(97));
        assert!(record.vote_hash.is_some());
        assert_eq!(f.chain.candidate_votes(record.election, 2), 1);

        let votes = f.mirror.recorded_votes();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].0, "e1");
        assert_eq!(votes[0].1.candidate_id, "c2");
        assert_eq!(votes[0].1.tx_hash, record.tx_hash);
        assert_eq!(votes[0].1.block_number, record.block_number);
    }

    #[tokio::test]
    async fn second_vote_with_same_credential_is_ineligible() {
        let f = fixture();
        let ctx = VoterContext::connected(f.voter);
        f.caster.cast_vote(&ctx, &f.election, second(), f.clock.now()).await.unwrap();

        let err = f
            .caster
            .cast_vote(&ctx, &f.election, second(), f.clock.now())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            VoteError::NotEligible(Verdict::Ineligible(vec![IneligibleReason::AlreadyVoted]))
        );
        assert_eq!(f.chain.sent_calls(&voting_system::cast_vote()), 1);
    }

    #[tokio::test]
    async fn transferred_credential_votes_once() {
        let f = fixture();
        f.caster
            .cast_vote(&VoterContext::connected(f.voter), &f.election, second(), f.clock.now())
            .await
            .unwrap();

        let new_holder = Address::new([0x22; 20]);
        f.chain.transfer(f.token, new_holder);
        f.chain.connect(&[new_holder]);
        let check = f
            .caster
            .check_eligibility(&VoterContext::connected(new_holder), &f.election, f.clock.now())
            .await;
        assert_eq!(check.token(), Some(f.token));
        assert_eq!(check.verdict, Verdict::Ineligible(vec![IneligibleReason::AlreadyVoted]));
    }

    #[tokio::test]
    async fn failed_read_is_indeterminate_and_nothing_is_sent() {
        let f = fixture();
        f.chain.fail_read("isTokenVerified", ChainError::Transport("timeout".into()));
        let err = f
            .caster
            .cast_vote(&VoterContext::connected(f.voter), &f.election, second(), f.clock.now())
            .await
            .unwrap_err();
        assert!(matches!(err, VoteError::NotEligible(Verdict::Indeterminate(_))));
        assert_eq!(f.chain.send_attempts(), 0);
    }

    #[tokio::test]
    async fn ineligible_reasons_are_all_reported() {
        let f = fixture();
        let outsider = Address::new([0x33; 20]);
        f.chain.register_voter(outsider, "Khulna", false);
        let later = f.clock.now().plus_secs(7_200);
        let check = f
            .caster
            .check_eligibility(&VoterContext::connected(outsider), &f.election, later)
            .await;
        assert_eq!(
            check.verdict,
            Verdict::Ineligible(vec![
                IneligibleReason::NotVerified,
                IneligibleReason::AreaIneligible,
                IneligibleReason::ElectionNotOpen(nftvote_election::ElectionStatus::Completed),
            ])
        );
    }

    #[tokio::test]
    async fn verified_voter_outside_the_eligible_areas_sends_nothing() {
        let f = fixture();
        let now = f.clock.now();
        let id = f
            .chain
            .seed_election("Port", now, now.plus_secs(3_600), &["Chittagong"], &["A", "B"]);
        let mut election = f.election.clone();
        election.chain_id = ElectionChainId::Assigned(id);
        election.voting_area = "Chittagong".into();
        election.eligible_areas = vec!["Chittagong".into()];

        let err = f
            .caster
            .cast_vote(&VoterContext::connected(f.voter), &election, second(), now)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            VoteError::NotEligible(Verdict::Ineligible(vec![IneligibleReason::AreaIneligible]))
        );
        assert_eq!(f.chain.send_attempts(), 0);
        assert!(f.mirror.recorded_votes().is_empty());
    }

    #[tokio::test]
    async fn no_wallet_and_no_credential() {
        let f = fixture();
        let now = f.clock.now();
        let check = f
            .caster
            .check_eligibility(&VoterContext::disconnected(), &f.election, now)
            .await;
        assert_eq!(check.verdict, Verdict::Ineligible(vec![IneligibleReason::NoWallet]));

        let stranger = VoterContext::connected(Address::new([0x44; 20]));
        let check = f.caster.check_eligibility(&stranger, &f.election, now).await;
        assert_eq!(check.verdict, Verdict::Ineligible(vec![IneligibleReason::NoCredential]));
    }

    #[tokio::test]
    async fn out_of_range_candidate_is_rejected_locally() {
        let f = fixture();
        let err = f
            .caster
            .cast_vote(
                &VoterContext::connected(f.voter),
                &f.election,
                CandidateId::from_index(2),
                f.clock.now(),
            )
            .await
            .unwrap_err();
        assert_eq!(err, VoteError::InvalidCandidate { ordinal: 3, count: 2 });
        assert_eq!(f.chain.send_attempts(), 0);
    }

    #[tokio::test]
    async fn wallet_rejection_is_classified() {
        let f = fixture();
        f.chain.reject_next_sends(1);
        let mut machine = VoteMachine::new();
        let err = f
            .caster
            .drive(&mut machine, &VoterContext::connected(f.voter), &f.election, second(), f.clock.now())
            .await
            .unwrap_err();
        assert_eq!(err, VoteError::Failed(VoteFailure::UserRejected));
        assert_eq!(machine.state(), &VoteState::Failed(VoteFailure::UserRejected));
        assert!(f.mirror.recorded_votes().is_empty());
    }

    #[tokio::test]
    async fn contract_revert_is_classified() {
        let f = fixture();
        f.chain.revert_next_send("NotEligibleArea");
        let err = f
            .caster
            .cast_vote(&VoterContext::connected(f.voter), &f.election, second(), f.clock.now())
            .await
            .unwrap_err();
        assert_eq!(err.failure(), Some(&VoteFailure::AreaIneligible));
    }

    #[tokio::test]
    async fn failed_receipt_writes_no_mirror() {
        let f = fixture();
        f.chain.fail_next_receipts(1);
        let err = f
            .caster
            .cast_vote(&VoterContext::connected(f.voter), &f.election, second(), f.clock.now())
            .await
            .unwrap_err();
        assert!(matches!(err, VoteError::Failed(VoteFailure::Unknown(_))));
        assert!(f.mirror.recorded_votes().is_empty());
        assert!(f.journal.all().is_empty());
    }

    #[tokio::test]
    async fn concurrent_submission_for_same_credential_is_blocked() {
        let f = fixture();
        f.chain.apply_when_mined(true);
        f.chain.delay_receipts(5);
        let ctx = VoterContext::connected(f.voter);
        let now = f.clock.now();
        let (a, b) = tokio::join!(
            f.caster.cast_vote(&ctx, &f.election, second(), now),
            f.caster.cast_vote(&ctx, &f.election, second(), now),
        );
        assert!(a.is_ok(), "first submission should confirm: {a:?}");
        assert_eq!(b, Err(VoteError::InFlight));
        assert_eq!(f.chain.sent_calls(&voting_system::cast_vote()), 1);
        assert_eq!(f.chain.candidate_votes(f.election.blockchain_id().unwrap(), 2), 1);
    }

    #[tokio::test]
    async fn in_flight_slot_is_exclusive_until_released() {
        let f = fixture();
        let election = f.election.blockchain_id().unwrap();
        let guard = f.caster.claim(election, f.token).unwrap();
        assert_eq!(f.caster.claim(election, f.token).err(), Some(VoteError::InFlight));
        drop(guard);
        assert!(f.caster.claim(election, f.token).is_ok());
    }

    #[tokio::test]
    async fn mirror_failure_leaves_vote_on_chain_and_remirror_resolves_it() {
        let f = fixture();
        f.mirror.fail_next_writes(1, BackendError::Unreachable("offline".into()));
        let mut machine = VoteMachine::new();
        let err = f
            .caster
            .drive(&mut machine, &VoterContext::connected(f.voter), &f.election, second(), f.clock.now())
            .await
            .unwrap_err();
        assert!(err.vote_is_on_chain());
        let VoteError::NotMirrored { record, inconsistency, .. } = err else {
            panic!("expected NotMirrored");
        };
        assert_eq!(machine.state().name(), "confirmed-unmirrored");
        assert_eq!(f.journal.unresolved().len(), 1);
        assert_eq!(f.journal.get(inconsistency).map(|e| e.kind), Some(InconsistencyKind::VoteMirror));

        f.caster.remirror(&record).await.unwrap();
        machine.apply(VoteEvent::Remirrored).unwrap();
        assert_eq!(machine.state().name(), "confirmed");
        assert!(f.journal.unresolved().is_empty());
        assert_eq!(f.mirror.recorded_votes().len(), 1);
        assert_eq!(f.chain.sent_calls(&voting_system::cast_vote()), 1);
    }

    async fn unmirrored_vote(f: &Fixture) -> VoteRecord {
        f.mirror.fail_next_writes(1, BackendError::Unreachable("offline".into()));
        let err = f
            .caster
            .cast_vote(&VoterContext::connected(f.voter), &f.election, second(), f.clock.now())
            .await
            .unwrap_err();
        let VoteError::NotMirrored { record, .. } = err else {
            panic!("expected NotMirrored, got {err:?}");
        };
        *record
    }

    #[tokio::test]
    async fn remirror_refuses_a_transaction_that_was_never_mined() {
        let f = fixture();
        let mut record = unmirrored_vote(&f).await;
        let fabricated = nftvote_types::TxHash::new([0xee; 32]);
        record.tx_hash = fabricated;

        let err = f.caster.remirror(&record).await.unwrap_err();
        assert!(matches!(err, VoteError::Unconfirmed { tx, .. } if tx == fabricated));
        assert!(f.mirror.recorded_votes().is_empty());
        assert_eq!(f.journal.unresolved().len(), 1);
    }

    #[tokio::test]
    async fn remirror_refuses_a_transaction_that_is_not_this_vote() {
        let f = fixture();
        let mut record = unmirrored_vote(&f).await;

        let mut wrong_block = record.clone();
        wrong_block.block_number += 1;
        let err = f.caster.remirror(&wrong_block).await.unwrap_err();
        assert!(matches!(err, VoteError::Unconfirmed { .. }));

        record.candidate = CandidateId::from_index(0);
        record.offchain_candidate = Some("c1".into());
        let err = f.caster.remirror(&record).await.unwrap_err();
        assert!(matches!(err, VoteError::Unconfirmed { .. }));
        assert!(f.mirror.recorded_votes().is_empty());
    }

    #[tokio::test]
    async fn remirror_refuses_a_failed_transaction() {
        let f = fixture();
        let mut record = unmirrored_vote(&f).await;
        let other = Address::new([0x55; 20]);
        f.chain.connect(&[other]);
        f.chain.fail_next_receipts(1);
        let failed = f
            .caster
            .voting
            .submit_cast_vote(other, record.election, second())
            .await
            .unwrap();
        record.tx_hash = failed;

        let err = f.caster.remirror(&record).await.unwrap_err();
        assert!(matches!(err, VoteError::Unconfirmed { tx, .. } if tx == failed));
        assert!(f.mirror.recorded_votes().is_empty());
    }

    #[tokio::test]
    async fn remirror_requires_the_vote_on_chain() {
        let f = fixture();
        let record = VoteRecord {
            election: f.election.blockchain_id().unwrap(),
            token: f.token,
            candidate: second(),
            voter: f.voter,
            chain: ChainKind::Bnb,
            tx_hash: nftvote_types::TxHash::new([9; 32]),
            block_number: 1,
            cast_at: f.clock.now(),
            offchain_election: Some("e1".into()),
            offchain_candidate: Some("c2".into()),
            event_chain_id: None,
            vote_hash: None,
        };
        let err = f.caster.remirror(&record).await.unwrap_err();
        assert!(matches!(err, VoteError::NotOnChain { .. }));
        assert!(f.mirror.recorded_votes().is_empty());
    }

    #[tokio::test]
    async fn unresolved_election_cannot_be_voted_on() {
        let mut f = fixture();
        f.election.chain_id = ElectionChainId::Unresolved;
        let check = f
            .caster
            .check_eligibility(&VoterContext::connected(f.voter), &f.election, f.clock.now())
            .await;
        assert_eq!(check.verdict, Verdict::Ineligible(vec![IneligibleReason::ElectionNotOnChain]));
    }
}
