//! Ledger first, mirror second: the commit protocol and its phases.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use nftvote_backend::BackendError;
use nftvote_chain::{ChainError, ChainProvider, DEFAULT_POLL_INTERVAL};
use nftvote_types::{ChainKind, Clock, TransactionReceipt, TxHash};
use tracing::{info, warn};

use crate::{CommitError, InconsistencyJournal, InconsistencyKind};

/// A transaction mined with success status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmedTx {
    pub chain: ChainKind,
    pub hash: TxHash,
    pub receipt: TransactionReceipt,
}

impl ConfirmedTx {
    pub fn block_number(&self) -> u64 {
        self.receipt.block_number
    }
}

/// Both phases done.
#[derive(Clone, Debug, PartialEq)]
pub struct Committed<T> {
    pub tx: ConfirmedTx,
    pub mirrored: T,
}

pub struct Reconciler {
    journal: Arc<InconsistencyJournal>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
}

impl Reconciler {
    pub fn new(journal: Arc<InconsistencyJournal>, clock: Arc<dyn Clock>) -> Self {
        Self {
            journal,
            clock,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn journal(&self) -> &Arc<InconsistencyJournal> {
        &self.journal
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Phase one: submit and wait for a successful receipt.
    ///
    /// Wallet rejection, a revert at submission and a failed receipt are all
    /// full failures: nothing downstream may run.
    pub async fn submit_and_confirm<S, F>(
        &self,
        provider: &dyn ChainProvider,
        submit: S,
    ) -> Result<ConfirmedTx, CommitError>
    where
        S: FnOnce() -> F,
        F: Future<Output = Result<TxHash, ChainError>>,
    {
        let chain = provider.descriptor().kind;
        let hash = submit().await.map_err(|e| {
            warn!(%chain, error = %e, "transaction not submitted");
            CommitError::from(e)
        })?;
        self.confirm(provider, hash).await
    }

    /// Wait for an already submitted transaction and require success.
    pub async fn confirm(
        &self,
        provider: &dyn ChainProvider,
        hash: TxHash,
    ) -> Result<ConfirmedTx, CommitError> {
        let chain = provider.descriptor().kind;
        info!(%chain, tx = %hash, "transaction submitted, awaiting receipt");
        let receipt = provider.wait_for_receipt(hash, self.poll_interval).await?;
        if !receipt.is_success() {
            warn!(%chain, tx = %hash, block = receipt.block_number, "transaction failed on chain");
            return Err(CommitError::Reverted {
                reason: "transaction failed on chain".into(),
                tx: Some(hash),
            });
        }
        info!(%chain, tx = %hash, block = receipt.block_number, "transaction confirmed");
        Ok(ConfirmedTx {
            chain,
            hash,
            receipt,
        })
    }

    /// Check, without polling, that `hash` is already mined with success.
    ///
    /// Used before re-mirroring a transaction the caller did not submit in
    /// this process. A missing receipt is [`CommitError::NotMined`].
    pub async fn verify(
        &self,
        provider: &dyn ChainProvider,
        hash: TxHash,
    ) -> Result<ConfirmedTx, CommitError> {
        let chain = provider.descriptor().kind;
        let Some(receipt) = provider.transaction_receipt(hash).await? else {
            warn!(%chain, tx = %hash, "no receipt for transaction");
            return Err(CommitError::NotMined { tx: hash });
        };
        if !receipt.is_success() {
            warn!(%chain, tx = %hash, block = receipt.block_number, "transaction failed on chain");
            return Err(CommitError::Reverted {
                reason: "transaction failed on chain".into(),
                tx: Some(hash),
            });
        }
        Ok(ConfirmedTx {
            chain,
            hash,
            receipt,
        })
    }

    /// Phase two for an already confirmed transaction.
    ///
    /// A mirror failure is journalled as `kind` and returned as
    /// [`CommitError::MirrorFailed`] carrying the confirmed transaction.
    pub async fn mirror<T, M, F>(
        &self,
        confirmed: ConfirmedTx,
        kind: InconsistencyKind,
        subject: &str,
        mirror: M,
    ) -> Result<Committed<T>, CommitError>
    where
        M: FnOnce(ConfirmedTx) -> F,
        F: Future<Output = Result<T, BackendError>>,
    {
        match mirror(confirmed.clone()).await {
            Ok(mirrored) => {
                info!(chain = %confirmed.chain, tx = %confirmed.hash, %subject, "mirror written");
                Ok(Committed {
                    tx: confirmed,
                    mirrored,
                })
            }
            Err(source) => {
                let entry = self.journal.record(
                    kind,
                    confirmed.chain,
                    confirmed.hash,
                    format!("{subject}: {source}"),
                    self.clock.now(),
                );
                Err(CommitError::MirrorFailed {
                    confirmed: Box::new(confirmed),
                    entry: entry.id,
                    source,
                })
            }
        }
    }

    /// Submit, confirm, then mirror.
    pub async fn commit<T, S, SF, M, MF>(
        &self,
        provider: &dyn ChainProvider,
        kind: InconsistencyKind,
        subject: &str,
        submit: S,
        mirror: M,
    ) -> Result<Committed<T>, CommitError>
    where
        S: FnOnce() -> SF,
        SF: Future<Output = Result<TxHash, ChainError>>,
        M: FnOnce(ConfirmedTx) -> MF,
        MF: Future<Output = Result<T, BackendError>>,
    {
        let confirmed = self.submit_and_confirm(provider, submit).await?;
        self.mirror(confirmed, kind, subject, mirror).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nftvote_abi::contracts::voting_system;
    use nftvote_chain::VotingSystemContract;
    use nftvote_nullables::{NullChain, NullClock};
    use nftvote_types::{Address, BlockchainElectionId, CandidateId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        chain: Arc<NullChain>,
        voting: VotingSystemContract,
        reconciler: Reconciler,
        voter: Address,
        election: BlockchainElectionId,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(NullClock::default());
        let chain = Arc::new(NullChain::bsc_with_clock(clock.clone()));
        let voter = Address::new([5; 20]);
        chain.connect(&[voter]);
        chain.register_voter(voter, "Dhaka", true);
        let now = clock.now();
        let election =
            chain.seed_election("Mayor", now, now.plus_secs(3600), &["Dhaka"], &["A", "B"]);
        let voting = VotingSystemContract::new(chain.clone(), chain.deployment().voting_system);
        let reconciler = Reconciler::new(Arc::new(InconsistencyJournal::new()), clock)
            .with_poll_interval(Duration::from_millis(1));
        Fixture {
            chain,
            voting,
            reconciler,
            voter,
            election,
        }
    }

    fn first() -> CandidateId {
        CandidateId::from_index(0)
    }

    #[tokio::test]
    async fn mirror_runs_after_confirmation() {
        let f = fixture();
        let committed = f
            .reconciler
            .commit(
                f.chain.as_ref(),
                InconsistencyKind::VoteMirror,
                "vote",
                || f.voting.submit_cast_vote(f.voter, f.election, first()),
                |tx| async move { Ok::<_, BackendError>(tx.block_number()) },
            )
            .await
            .unwrap();
        assert_eq!(committed.mirrored, committed.tx.receipt.block_number);
        assert_eq!(f.chain.candidate_votes(f.election, 1), 1);
        assert!(f.reconciler.journal().unresolved().is_empty());
    }

    #[tokio::test]
    async fn rejection_skips_mirror() {
        let f = fixture();
        f.chain.reject_next_sends(1);
        let mirrored = AtomicUsize::new(0);
        let err = f
            .reconciler
            .commit(
                f.chain.as_ref(),
                InconsistencyKind::VoteMirror,
                "vote",
                || f.voting.submit_cast_vote(f.voter, f.election, first()),
                |_| async {
                    mirrored.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, BackendError>(())
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, CommitError::Rejected);
        assert_eq!(mirrored.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_receipt_is_a_full_failure() {
        let f = fixture();
        f.chain.fail_next_receipts(1);
        let mirrored = AtomicUsize::new(0);
        let err = f
            .reconciler
            .commit(
                f.chain.as_ref(),
                InconsistencyKind::VoteMirror,
                "vote",
                || f.voting.submit_cast_vote(f.voter, f.election, first()),
                |_| async {
                    mirrored.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, BackendError>(())
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CommitError::Reverted { tx: Some(_), .. }));
        assert_eq!(mirrored.load(Ordering::SeqCst), 0);
        assert!(f.reconciler.journal().all().is_empty());
    }

    #[tokio::test]
    async fn pending_receipts_are_polled_until_mined() {
        let f = fixture();
        f.chain.delay_receipts(3);
        let confirmed = f
            .reconciler
            .submit_and_confirm(f.chain.as_ref(), || {
                f.voting.submit_cast_vote(f.voter, f.election, first())
            })
            .await
            .unwrap();
        assert!(confirmed.receipt.is_success());
        assert_eq!(f.chain.sent_calls(&voting_system::cast_vote()), 1);
    }

    #[tokio::test]
    async fn verify_accepts_only_mined_success() {
        let f = fixture();
        let hash = f
            .voting
            .submit_cast_vote(f.voter, f.election, first())
            .await
            .unwrap();
        let confirmed = f.reconciler.verify(f.chain.as_ref(), hash).await.unwrap();
        assert_eq!(confirmed.hash, hash);

        let unknown = TxHash::new([0xee; 32]);
        assert_eq!(
            f.reconciler.verify(f.chain.as_ref(), unknown).await,
            Err(CommitError::NotMined { tx: unknown })
        );

        f.chain.fail_next_receipts(1);
        let failed = f
            .voting
            .submit_cast_vote(f.voter, f.election, CandidateId::from_index(1))
            .await
            .unwrap();
        assert!(matches!(
            f.reconciler.verify(f.chain.as_ref(), failed).await,
            Err(CommitError::Reverted { tx: Some(tx), .. }) if tx == failed
        ));
    }

    #[tokio::test]
    async fn mirror_failure_is_journalled_with_the_confirmed_tx() {
        let f = fixture();
        let err = f
            .reconciler
            .commit(
                f.chain.as_ref(),
                InconsistencyKind::VoteMirror,
                "vote on election 1",
                || f.voting.submit_cast_vote(f.voter, f.election, first()),
                |_| async { Err::<(), _>(BackendError::Http(502)) },
            )
            .await
            .unwrap_err();

        let CommitError::MirrorFailed { confirmed, entry, source } = err else {
            panic!("expected mirror failure");
        };
        assert_eq!(source, BackendError::Http(502));
        let journalled = f.reconciler.journal().get(entry).unwrap();
        assert_eq!(journalled.kind, InconsistencyKind::VoteMirror);
        assert_eq!(journalled.tx_hash, confirmed.hash);
        assert!(journalled.detail.starts_with("vote on election 1"));
        assert_eq!(f.chain.candidate_votes(f.election, 1), 1);
    }
}
