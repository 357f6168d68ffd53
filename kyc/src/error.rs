//! Credential issuance errors.

use nftvote_backend::{BackendError, KycStatus};
use nftvote_chain::ChainError;
use nftvote_pinning::PinningError;
use nftvote_reconciler::CommitError;
use nftvote_types::{Address, ChainKind, TokenId, TxHash};
use thiserror::Error;

use crate::{IdentityError, Minted};

/// Where a duplicate NID was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NidRegistry {
    Mirror,
    Chain,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum KycError {
    #[error("invalid identity data: {0}")]
    Identity(#[from] IdentityError),

    #[error("KYC request {request} is {status:?}, not pending")]
    NotPending { request: String, status: KycStatus },

    #[error("request is for {requested} but the issuer is connected to {issuer}")]
    WrongChain {
        requested: ChainKind,
        issuer: ChainKind,
    },

    #[error("{recipient} already holds voter credential {token}")]
    AlreadyHolds { recipient: Address, token: TokenId },

    #[error("NID already registered ({found_in:?})")]
    DuplicateNid { found_in: NidRegistry },

    #[error("face photo: {0}")]
    Photo(String),

    #[error("pinning failed: {0}")]
    Pinning(#[from] PinningError),

    #[error("mirror read failed: {0}")]
    Backend(#[from] BackendError),

    #[error("chain read failed: {0}")]
    Chain(#[from] ChainError),

    #[error("Access denied: the wallet does not have minter/admin role on the NFT contract")]
    NotMinter,

    #[error("Transaction reverted on blockchain. You may not have admin/minter role on this contract. (tx {tx})")]
    MintReverted { tx: TxHash },

    #[error("mint failed: {0}")]
    Mint(CommitError),

    /// The credential exists on chain but the mirror still shows the request
    /// as pending. Retry with `remirror_approval`, never by minting again.
    #[error("credential minted in tx {} but the approval was not recorded: {source}", .minted.tx)]
    NotMirrored {
        minted: Box<Minted>,
        inconsistency: u64,
        source: BackendError,
    },

    #[error("{recipient} holds no voter credential on chain")]
    NotMinted { recipient: Address },

    /// The transaction is not a mined, successful mint of this credential.
    #[error("transaction {tx} did not mint this credential: {detail}")]
    Unconfirmed { tx: TxHash, detail: String },
}

impl KycError {
    /// True when a credential was minted despite the error.
    pub fn minted(&self) -> bool {
        matches!(self, Self::NotMirrored { .. })
    }

    pub(crate) fn from_mint(err: CommitError) -> Self {
        match err {
            CommitError::Reverted { tx: Some(tx), .. } => Self::MintReverted { tx },
            CommitError::Reverted { ref reason, .. }
                if reason.contains("AccessControl") || reason.contains("missing role") =>
            {
                Self::NotMinter
            }
            other => Self::Mint(other),
        }
    }
}
