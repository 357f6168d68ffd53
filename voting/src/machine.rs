//! The vote state machine.
//!
//! ```text
//! Idle -> CheckingEligibility -> Eligible | Ineligible | Indeterminate
//! Eligible -> Submitting -> AwaitingConfirmation -> Confirmed
//!                                                 | ConfirmedUnmirrored -> Confirmed
//!             Submitting | AwaitingConfirmation   -> Failed
//! ```
//!
//! Transitions are pure; the casting service performs the I/O and feeds
//! the results in as events.

use nftvote_types::{CandidateId, TxHash};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{IneligibleReason, VoteFailure, VoteRecord, Verdict};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteState {
    Idle,
    CheckingEligibility,
    Eligible,
    Ineligible(Vec<IneligibleReason>),
    Indeterminate(Vec<String>),
    Submitting {
        candidate: CandidateId,
    },
    AwaitingConfirmation {
        candidate: CandidateId,
        tx: TxHash,
    },
    Confirmed(VoteRecord),
    ConfirmedUnmirrored {
        record: VoteRecord,
        inconsistency: u64,
    },
    Failed(VoteFailure),
}

impl VoteState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CheckingEligibility => "checking-eligibility",
            Self::Eligible => "eligible",
            Self::Ineligible(_) => "ineligible",
            Self::Indeterminate(_) => "indeterminate",
            Self::Submitting { .. } => "submitting",
            Self::AwaitingConfirmation { .. } => "awaiting-confirmation",
            Self::Confirmed(_) => "confirmed",
            Self::ConfirmedUnmirrored { .. } => "confirmed-unmirrored",
            Self::Failed(_) => "failed",
        }
    }

    /// A transaction may be in the wallet or the mempool.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Submitting { .. } | Self::AwaitingConfirmation { .. })
    }

    /// The vote is on chain, mirrored or not.
    pub fn is_on_chain(&self) -> bool {
        matches!(self, Self::Confirmed(_) | Self::ConfirmedUnmirrored { .. })
    }

    /// Voting controls are enabled only here.
    pub fn can_submit(&self) -> bool {
        matches!(self, Self::Eligible)
    }

    fn can_recheck(&self) -> bool {
        match self {
            Self::Idle | Self::Eligible | Self::Ineligible(_) | Self::Indeterminate(_) => true,
            Self::Failed(failure) => !failure.is_terminal(),
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoteEvent {
    CheckStarted,
    VerdictReached(Verdict),
    SubmitRequested(CandidateId),
    Submitted(TxHash),
    Confirmed(VoteRecord),
    MirrorFailed { record: VoteRecord, inconsistency: u64 },
    Remirrored,
    Failed(VoteFailure),
}

impl VoteEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CheckStarted => "check-started",
            Self::VerdictReached(_) => "verdict-reached",
            Self::SubmitRequested(_) => "submit-requested",
            Self::Submitted(_) => "submitted",
            Self::Confirmed(_) => "confirmed",
            Self::MirrorFailed { .. } => "mirror-failed",
            Self::Remirrored => "remirrored",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid vote transition: {event} in state {state}")]
pub struct TransitionError {
    pub state: &'static str,
    pub event: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteMachine {
    state: VoteState,
}

impl Default for VoteMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl VoteMachine {
    pub fn new() -> Self {
        Self {
            state: VoteState::Idle,
        }
    }

    pub fn state(&self) -> &VoteState {
        &self.state
    }

    /// Apply `event`. An invalid transition leaves the state unchanged.
    pub fn apply(&mut self, event: VoteEvent) -> Result<&VoteState, TransitionError> {
        let next = match (&self.state, event) {
            (state, VoteEvent::CheckStarted) if state.can_recheck() => VoteState::CheckingEligibility,

            (VoteState::CheckingEligibility, VoteEvent::VerdictReached(verdict)) => match verdict {
                Verdict::Checking => VoteState::CheckingEligibility,
                Verdict::Eligible => VoteState::Eligible,
                Verdict::Ineligible(reasons) => VoteState::Ineligible(reasons),
                Verdict::Indeterminate(errors) => VoteState::Indeterminate(errors),
            },

            (VoteState::Eligible, VoteEvent::SubmitRequested(candidate)) => {
                VoteState::Submitting { candidate }
            }

            (VoteState::Submitting { candidate }, VoteEvent::Submitted(tx)) => {
                VoteState::AwaitingConfirmation {
                    candidate: *candidate,
                    tx,
                }
            }

            (
                VoteState::Submitting { .. } | VoteState::AwaitingConfirmation { .. },
                VoteEvent::Failed(failure),
            ) => VoteState::Failed(failure),

            (VoteState::AwaitingConfirmation { .. }, VoteEvent::Confirmed(record)) => {
                VoteState::Confirmed(record)
            }

            (
                VoteState::AwaitingConfirmation { .. },
                VoteEvent::MirrorFailed {
                    record,
                    inconsistency,
                },
            ) => VoteState::ConfirmedUnmirrored {
                record,
                inconsistency,
            },

            (VoteState::ConfirmedUnmirrored { record, .. }, VoteEvent::Remirrored) => {
                VoteState::Confirmed(record.clone())
            }

            (state, event) => {
                return Err(TransitionError {
                    state: state.name(),
                    event: event.name(),
                })
            }
        };
        self.state = next;
        Ok(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nftvote_types::{Address, BlockchainElectionId, ChainKind, Timestamp, TokenId};

    fn record() -> VoteRecord {
        VoteRecord {
            election: BlockchainElectionId::new(1),
            token: TokenId::from_raw(1).unwrap(),
            candidate: CandidateId::from_index(0),
            voter: Address::new([1; 20]),
            chain: ChainKind::Bnb,
            tx_hash: TxHash::new([1; 32]),
            block_number: 1,
            cast_at: Timestamp::new(1),
            offchain_election: None,
            offchain_candidate: None,
            event_chain_id: None,
            vote_hash: None,
        }
    }

    fn eligible_machine() -> VoteMachine {
        let mut m = VoteMachine::new();
        m.apply(VoteEvent::CheckStarted).unwrap();
        m.apply(VoteEvent::VerdictReached(Verdict::Eligible)).unwrap();
        m
    }

    #[test]
    fn happy_path() {
        let mut m = eligible_machine();
        let candidate = CandidateId::from_index(0);
        m.apply(VoteEvent::SubmitRequested(candidate)).unwrap();
        m.apply(VoteEvent::Submitted(TxHash::new([1; 32]))).unwrap();
        assert!(m.state().is_in_flight());
        m.apply(VoteEvent::Confirmed(record())).unwrap();
        assert_eq!(m.state(), &VoteState::Confirmed(record()));
    }

    #[test]
    fn cannot_submit_unless_eligible() {
        let mut m = VoteMachine::new();
        m.apply(VoteEvent::CheckStarted).unwrap();
        m.apply(VoteEvent::VerdictReached(Verdict::Indeterminate(vec!["rpc".into()])))
            .unwrap();
        let err = m
            .apply(VoteEvent::SubmitRequested(CandidateId::from_index(0)))
            .unwrap_err();
        assert_eq!(err.state, "indeterminate");
        assert_eq!(m.state().name(), "indeterminate");
    }

    #[test]
    fn checking_verdict_keeps_checking() {
        let mut m = VoteMachine::new();
        m.apply(VoteEvent::CheckStarted).unwrap();
        m.apply(VoteEvent::VerdictReached(Verdict::Checking)).unwrap();
        assert!(!m.state().can_submit());
    }

    #[test]
    fn unmirrored_vote_can_be_completed() {
        let mut m = eligible_machine();
        m.apply(VoteEvent::SubmitRequested(CandidateId::from_index(0))).unwrap();
        m.apply(VoteEvent::Submitted(TxHash::new([1; 32]))).unwrap();
        m.apply(VoteEvent::MirrorFailed {
            record: record(),
            inconsistency: 3,
        })
        .unwrap();
        assert!(m.state().is_on_chain());
        assert!(m.apply(VoteEvent::CheckStarted).is_err());
        m.apply(VoteEvent::Remirrored).unwrap();
        assert_eq!(m.state().name(), "confirmed");
    }

    #[test]
    fn terminal_failure_blocks_recheck() {
        let mut m = eligible_machine();
        m.apply(VoteEvent::SubmitRequested(CandidateId::from_index(0))).unwrap();
        m.apply(VoteEvent::Failed(VoteFailure::AlreadyVoted)).unwrap();
        assert!(m.apply(VoteEvent::CheckStarted).is_err());

        let mut m = eligible_machine();
        m.apply(VoteEvent::SubmitRequested(CandidateId::from_index(0))).unwrap();
        m.apply(VoteEvent::Failed(VoteFailure::UserRejected)).unwrap();
        assert!(m.apply(VoteEvent::CheckStarted).is_ok());
    }

    #[test]
    fn double_submit_is_rejected() {
        let mut m = eligible_machine();
        m.apply(VoteEvent::SubmitRequested(CandidateId::from_index(0))).unwrap();
        assert!(m
            .apply(VoteEvent::SubmitRequested(CandidateId::from_index(1)))
            .is_err());
    }
}
