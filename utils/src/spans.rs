//! Span constructors for the voting flows.
//!
//! Consistent span names and fields let a single flow be followed across
//! crates in the log output.

use tracing::{info_span, Span};

/// Creating an election and registering its candidates.
pub fn election_create_span(chain: &str, title: &str) -> Span {
    info_span!("election_create", chain = %chain, title = %title)
}

/// Casting one vote with one credential.
pub fn vote_cast_span(chain: &str, election: u64, token: u64) -> Span {
    info_span!("vote_cast", chain = %chain, election, token)
}

/// Issuing a credential for an approved KYC request.
pub fn mint_span(chain: &str, request: &str) -> Span {
    info_span!("mint", chain = %chain, request = %request)
}

/// Retrying the mirror write for a confirmed transaction.
pub fn remirror_span(kind: &str, tx: &str) -> Span {
    info_span!("remirror", kind = %kind, tx = %tx)
}
