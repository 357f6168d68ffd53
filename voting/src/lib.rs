//! Vote casting.
//!
//! A vote is allowed only when four independently queried facts hold: the
//! connected wallet holds a credential, the credential is verified, its area
//! is eligible, and it has not voted in this election. The vote is then
//! submitted, confirmed, and mirrored, in that order.

pub mod caster;
pub mod classify;
pub mod eligibility;
pub mod error;
pub mod machine;
pub mod record;

pub use caster::{EligibilityCheck, VoteCaster};
pub use classify::{classify, VoteFailure};
pub use eligibility::{EligibilityFacts, Fact, IneligibleReason, Verdict};
pub use error::VoteError;
pub use machine::{TransitionError, VoteEvent, VoteMachine, VoteState};
pub use record::{VoteRecord, VoterContext};
