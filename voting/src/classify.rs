//! Failure taxonomy for vote submission.
//!
//! Wallets and nodes report failures as free text. [`classify`] maps any
//! such text to one category, matching case-insensitively on the contract's
//! custom error names and their common phrasings. It is total: text that
//! matches nothing is [`VoteFailure::Unknown`] carrying the raw message.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "category", content = "message", rename_all = "kebab-case")]
pub enum VoteFailure {
    AlreadyVoted,
    NotVerified,
    NotTokenOwner,
    AreaIneligible,
    ElectionNotActive,
    ElectionEnded,
    UserRejected,
    InsufficientFunds,
    Unknown(String),
}

/// Patterns in match order. Earlier entries win when text matches several.
const PATTERNS: &[(&[&str], VoteFailure)] = &[
    (&["alreadyvoted", "already voted"], VoteFailure::AlreadyVoted),
    (&["notverifiedvoter", "not verified"], VoteFailure::NotVerified),
    (&["nottokenowner", "not token owner"], VoteFailure::NotTokenOwner),
    (&["noteligiblearea", "not eligible"], VoteFailure::AreaIneligible),
    (&["electionnotactive", "not active"], VoteFailure::ElectionNotActive),
    (&["electionended", "ended"], VoteFailure::ElectionEnded),
    (&["user rejected", "user denied"], VoteFailure::UserRejected),
    (&["insufficient funds"], VoteFailure::InsufficientFunds),
];

pub fn classify(text: &str) -> VoteFailure {
    let lowered = text.to_lowercase();
    PATTERNS
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lowered.contains(n)))
        .map(|(_, failure)| failure.clone())
        .unwrap_or_else(|| VoteFailure::Unknown(text.to_string()))
}

impl VoteFailure {
    pub fn category(&self) -> &'static str {
        match self {
            Self::AlreadyVoted => "already-voted",
            Self::NotVerified => "not-verified",
            Self::NotTokenOwner => "not-token-owner",
            Self::AreaIneligible => "area-ineligible",
            Self::ElectionNotActive => "election-not-active",
            Self::ElectionEnded => "election-ended",
            Self::UserRejected => "user-rejected",
            Self::InsufficientFunds => "insufficient-funds",
            Self::Unknown(_) => "unknown",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::AlreadyVoted => {
                "You have already voted in this election. Each NFT can only vote once.".into()
            }
            Self::NotVerified => {
                "Your NFT is not verified. Please complete KYC verification first.".into()
            }
            Self::NotTokenOwner => {
                "You do not own this Voter NFT. The NFT must be in your connected wallet.".into()
            }
            Self::AreaIneligible => {
                "Your residential area does not match this election's eligible voting areas.".into()
            }
            Self::ElectionNotActive => "This election is not currently active.".into(),
            Self::ElectionEnded => "This election has ended.".into(),
            Self::UserRejected => "Transaction was cancelled by user.".into(),
            Self::InsufficientFunds => "Insufficient funds for gas fees.".into(),
            Self::Unknown(raw) => raw.clone(),
        }
    }

    /// No retry with the same credential in the same election can succeed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AlreadyVoted | Self::ElectionEnded)
    }
}

impl fmt::Display for VoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message())
    }
}
