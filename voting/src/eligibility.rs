//! Eligibility as a verdict over independently queried facts.

use std::fmt;

use nftvote_election::ElectionStatus;
use nftvote_types::{Address, TokenId};
use serde::{Deserialize, Serialize};

/// One queried fact. A failed query is kept apart from a negative answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fact<T> {
    Pending,
    Known(T),
    Failed(String),
}

impl<T> Fact<T> {
    pub fn from_result<E: fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Known(value),
            Err(e) => Self::Failed(e.to_string()),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn known(&self) -> Option<&T> {
        match self {
            Self::Known(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IneligibleReason {
    NoWallet,
    NoCredential,
    NotVerified,
    AreaIneligible,
    AlreadyVoted,
    ElectionNotOpen(ElectionStatus),
    /// Election has no confirmed on-chain id.
    ElectionNotOnChain,
    AdminAccount,
}

impl IneligibleReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoWallet => "no-wallet",
            Self::NoCredential => "no-credential",
            Self::NotVerified => "not-verified",
            Self::AreaIneligible => "area-ineligible",
            Self::AlreadyVoted => "already-voted",
            Self::ElectionNotOpen(_) => "election-not-open",
            Self::ElectionNotOnChain => "election-not-on-chain",
            Self::AdminAccount => "admin-account",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::NoWallet => "Connect your wallet to vote.".into(),
            Self::NoCredential => {
                "No Voter NFT found in your wallet. Complete KYC verification to receive one.".into()
            }
            Self::NotVerified => "Your Voter NFT is not verified yet.".into(),
            Self::AreaIneligible => {
                "Your residential area is not eligible for this election.".into()
            }
            Self::AlreadyVoted => "You have already voted in this election.".into(),
            Self::ElectionNotOpen(status) => format!("This election is {status}."),
            Self::ElectionNotOnChain => "This election is not registered on the blockchain.".into(),
            Self::AdminAccount => "Administrator accounts cannot vote.".into(),
        }
    }
}

impl fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// At least one fact is still loading. Never treated as eligible.
    Checking,
    Eligible,
    /// Every failing condition, in check order.
    Ineligible(Vec<IneligibleReason>),
    /// A query failed; neither allow nor deny.
    Indeterminate(Vec<String>),
}

impl Verdict {
    pub fn is_eligible(&self) -> bool {
        *self == Self::Eligible
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checking => f.write_str("checking eligibility"),
            Self::Eligible => f.write_str("eligible"),
            Self::Ineligible(reasons) => {
                let names: Vec<&str> = reasons.iter().map(IneligibleReason::as_str).collect();
                write!(f, "ineligible ({})", names.join(", "))
            }
            Self::Indeterminate(errors) => {
                write!(f, "unable to determine eligibility: {}", errors.join("; "))
            }
        }
    }
}

/// Inputs to the verdict. The four queried facts plus what the caller
/// already knows without a query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityFacts {
    pub wallet: Option<Address>,
    pub credential: Fact<Option<TokenId>>,
    pub verified: Fact<bool>,
    pub area_eligible: Fact<bool>,
    pub already_voted: Fact<bool>,
    pub election_status: ElectionStatus,
    pub on_chain: bool,
    pub is_admin: bool,
}

impl EligibilityFacts {
    /// Facts for a session before any query has returned.
    pub fn pending(wallet: Option<Address>, election_status: ElectionStatus) -> Self {
        Self {
            wallet,
            credential: Fact::Pending,
            verified: Fact::Pending,
            area_eligible: Fact::Pending,
            already_voted: Fact::Pending,
            election_status,
            on_chain: true,
            is_admin: false,
        }
    }

    /// No wallet or no credential is decisive: the facts that depend on the
    /// credential do not apply. Otherwise pending beats failed, failed beats
    /// false, and false lists every failing reason.
    pub fn verdict(&self) -> Verdict {
        if self.wallet.is_none() {
            return Verdict::Ineligible(vec![IneligibleReason::NoWallet]);
        }
        match &self.credential {
            Fact::Known(None) => return Verdict::Ineligible(vec![IneligibleReason::NoCredential]),
            Fact::Pending => return Verdict::Checking,
            Fact::Failed(e) => return Verdict::Indeterminate(vec![e.clone()]),
            Fact::Known(Some(_)) => {}
        }

        let dependent = [&self.verified, &self.area_eligible, &self.already_voted];
        if dependent.iter().any(|f| f.is_pending()) {
            return Verdict::Checking;
        }
        let failures: Vec<String> = dependent
            .iter()
            .filter_map(|f| f.failure().map(str::to_string))
            .collect();
        if !failures.is_empty() {
            return Verdict::Indeterminate(failures);
        }

        let mut reasons = Vec::new();
        if self.verified == Fact::Known(false) {
            reasons.push(IneligibleReason::NotVerified);
        }
        if self.area_eligible == Fact::Known(false) {
            reasons.push(IneligibleReason::AreaIneligible);
        }
        if self.already_voted == Fact::Known(true) {
            reasons.push(IneligibleReason::AlreadyVoted);
        }
        if !self.on_chain {
            reasons.push(IneligibleReason::ElectionNotOnChain);
        }
        if !self.election_status.accepts_votes() {
            reasons.push(IneligibleReason::ElectionNotOpen(self.election_status));
        }
        if self.is_admin {
            reasons.push(IneligibleReason::AdminAccount);
        }

        if reasons.is_empty() {
            Verdict::Eligible
        } else {
            Verdict::Ineligible(reasons)
        }
    }
}
