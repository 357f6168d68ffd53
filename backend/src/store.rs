//! Seams over the off-chain services.

use async_trait::async_trait;

use crate::dto::*;
use crate::BackendError;

/// The off-chain database that mirrors on-chain facts.
///
/// Writes here happen only after the corresponding transaction is confirmed.
#[async_trait]
pub trait MirrorStore: Send + Sync {
    /// `POST /api/voting/create-with-tx`; returns the off-chain election id.
    async fn create_election_with_tx(
        &self,
        request: &CreateElectionWithTx,
    ) -> Result<String, BackendError>;

    /// `POST /api/voting/{id}/vote-with-tx`.
    async fn record_vote_with_tx(
        &self,
        voting_id: &str,
        request: &VoteWithTx,
    ) -> Result<VoteReceiptDto, BackendError>;

    async fn get_voting(&self, voting_id: &str) -> Result<VotingDto, BackendError>;

    async fn list_votings(&self, status: Option<&str>) -> Result<Vec<VotingDto>, BackendError>;

    async fn my_votes(&self) -> Result<Vec<MyVoteDto>, BackendError>;

    async fn kyc_request(&self, request_id: &str) -> Result<KycRequestDto, BackendError>;

    /// `POST /api/kyc/requests/{id}/approve-with-tx`.
    async fn approve_kyc_with_tx(
        &self,
        request_id: &str,
        request: &ApproveWithTx,
    ) -> Result<ApprovalDto, BackendError>;

    async fn check_duplicate_nid(&self, nid: &str) -> Result<DuplicateNidDto, BackendError>;
}

/// The identity-document extraction service.
#[async_trait]
pub trait IdentityExtractor: Send + Sync {
    async fn extract_id(&self, image_base64: &str) -> Result<ExtractionDto, BackendError>;
}
