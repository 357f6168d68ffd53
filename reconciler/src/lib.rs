//! Two-phase commit reconciler.
//!
//! Phase one submits a ledger transaction and waits for a successful
//! receipt. Phase two writes the off-chain mirror. The mirror is never
//! written for an unconfirmed or failed transaction, and a mirror failure
//! after confirmation is journalled rather than rolled back: the ledger is
//! the source of truth.

pub mod commit;
pub mod error;
pub mod journal;

pub use commit::{Committed, ConfirmedTx, Reconciler};
pub use error::{CommitError, JournalError};
pub use journal::{Inconsistency, InconsistencyJournal, InconsistencyKind};
