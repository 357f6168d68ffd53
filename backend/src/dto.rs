//! Wire types of the REST backend (camelCase JSON).

use nftvote_types::{Address, ChainKind, TxHash};
use serde::{Deserialize, Serialize};

use crate::BackendError;

/// Success code of the response envelope.
pub const SUCCESS: &str = "SUCCESS";

/// `{code, msg, data}` wrapper around every response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: String,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: SUCCESS.to_string(),
            msg: String::new(),
            data: Some(data),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS
    }

    /// Payload of a successful envelope. A success without data is an error.
    pub fn into_data(self) -> Result<T, BackendError> {
        if !self.is_success() {
            return Err(BackendError::Rejected {
                code: self.code,
                msg: self.msg,
            });
        }
        self.data
            .ok_or_else(|| BackendError::InvalidResponse("success envelope without data".into()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotesByChainDto {
    #[serde(rename = "BNB", default)]
    pub bnb: u64,
    #[serde(rename = "ETH", default)]
    pub eth: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub party: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default)]
    pub vote_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub votes_by_chain: Option<VotesByChainDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingDto {
    pub id: String,
    #[serde(default)]
    pub blockchain_election_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub candidates: Vec<CandidateDto>,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub voting_area: String,
    #[serde(default)]
    pub eligible_areas: Vec<String>,
    pub chain_type: ChainKind,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub total_votes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub votes_by_chain: Option<VotesByChainDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCandidateDto {
    pub name: String,
    pub party: String,
    pub description: String,
}

/// Body of `POST /api/voting/create-with-tx`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateElectionWithTx {
    pub title: String,
    pub description: String,
    pub candidates: Vec<NewCandidateDto>,
    /// RFC 3339.
    pub start_time: String,
    pub end_time: String,
    pub voting_area: String,
    pub eligible_areas: Vec<String>,
    pub chain_type: ChainKind,
    pub tx_hash: TxHash,
    pub blockchain_election_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedVotingDto {
    pub voting_id: String,
}

/// Body of `POST /api/voting/{id}/vote-with-tx`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteWithTx {
    /// Off-chain candidate id.
    pub candidate_id: String,
    pub tx_hash: TxHash,
    pub block_number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceiptDto {
    pub transaction_hash: String,
    #[serde(default)]
    pub block_number: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirroredVoteStatus {
    Pending,
    Confirmed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyVoteDto {
    pub id: String,
    pub voting_id: String,
    #[serde(default)]
    pub voting_title: String,
    #[serde(default)]
    pub candidate_name: String,
    #[serde(default)]
    pub candidate_party: String,
    pub timestamp: String,
    pub transaction_hash: String,
    #[serde(default)]
    pub block_number: u64,
    pub chain_type: ChainKind,
    pub status: MirroredVoteStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    NotSubmitted,
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedIdentityDto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub father_name: String,
    #[serde(default)]
    pub mother_name: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub nid_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycRequestDto {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub user_name: String,
    /// Face photo as a data URL or a remote URL.
    #[serde(default)]
    pub face_photo: String,
    pub wallet_address: Address,
    pub chain_type: ChainKind,
    pub residential_area: String,
    pub status: KycStatus,
    #[serde(default)]
    pub submitted_at: String,
    #[serde(default)]
    pub nft_token_id: Option<String>,
    #[serde(default)]
    pub nft_transaction_hash: Option<String>,
    #[serde(default)]
    pub nid_number: Option<String>,
    #[serde(default)]
    pub extracted_data: Option<ExtractedIdentityDto>,
}

/// Body of `POST /api/kyc/requests/{id}/approve-with-tx`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveWithTx {
    pub ipfs_hash: String,
    pub tx_hash: TxHash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalDto {
    #[serde(default)]
    pub nft_token_id: String,
    #[serde(default)]
    pub transaction_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateNidDto {
    pub is_duplicate: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    Success,
    Partial,
    Failed,
}

/// Result of `POST /api/kyc/extract-id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionDto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub name_bangla: String,
    #[serde(default)]
    pub father_name: String,
    #[serde(default)]
    pub mother_name: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub id_number: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub confidence: f64,
    pub extraction_status: ExtractionStatus,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_yields_data() {
        let json = r#"{"code":"SUCCESS","msg":"ok","data":{"votingId":"v1"}}"#;
        let env: ApiEnvelope<CreatedVotingDto> = serde_json::from_str(json).unwrap();
        assert_eq!(env.into_data().unwrap().voting_id, "v1");
    }

    #[test]
    fn failure_envelope_is_rejected() {
        let json = r#"{"code":"ALREADY_VOTED","msg":"You have already voted","data":null}"#;
        let env: ApiEnvelope<VoteReceiptDto> = serde_json::from_str(json).unwrap();
        assert_eq!(
            env.into_data(),
            Err(BackendError::Rejected {
                code: "ALREADY_VOTED".into(),
                msg: "You have already voted".into()
            })
        );
    }

    #[test]
    fn success_without_data_is_invalid() {
        let json = r#"{"code":"SUCCESS","msg":"ok"}"#;
        let env: ApiEnvelope<ApprovalDto> = serde_json::from_str(json).unwrap();
        assert!(matches!(env.into_data(), Err(BackendError::InvalidResponse(_))));
    }

    #[test]
    fn voting_parses_with_optional_fields_missing() {
        let json = r#"{
            "id": "e1",
            "title": "Mayor",
            "startTime": "2025-03-01T09:00:00Z",
            "endTime": "2025-03-02T09:00:00Z",
            "chainType": "BNB",
            "candidates": [{"id": "c1", "name": "A", "voteCount": 3, "votesByChain": {"BNB": 2, "ETH": 1}}]
        }"#;
        let v: VotingDto = serde_json::from_str(json).unwrap();
        assert_eq!(v.blockchain_election_id, None);
        assert_eq!(v.candidates[0].votes_by_chain, Some(VotesByChainDto { bnb: 2, eth: 1 }));
    }

    #[test]
    fn create_request_serializes_camel_case() {
        let req = CreateElectionWithTx {
            title: "t".into(),
            description: "d".into(),
            candidates: vec![],
            start_time: "2025-03-01T09:00:00Z".into(),
            end_time: "2025-03-02T09:00:00Z".into(),
            voting_area: "Dhaka".into(),
            eligible_areas: vec!["Dhaka".into()],
            chain_type: ChainKind::Bnb,
            tx_hash: TxHash::new([1; 32]),
            blockchain_election_id: Some("4".into()),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["chainType"], "BNB");
        assert_eq!(v["blockchainElectionId"], "4");
        assert_eq!(v["txHash"], format!("0x{}", "01".repeat(32)));
    }

    #[test]
    fn kyc_status_wire_names() {
        let s: KycStatus = serde_json::from_str("\"not_submitted\"").unwrap();
        assert_eq!(s, KycStatus::NotSubmitted);
    }

    #[test]
    fn extraction_parses() {
        let json = r#"{"name":"RAHIM UDDIN","dateOfBirth":"01 Feb 1993","idNumber":"1234567890",
            "confidence":0.82,"extractionStatus":"partial","errors":["father name unreadable"]}"#;
        let e: ExtractionDto = serde_json::from_str(json).unwrap();
        assert_eq!(e.extraction_status, ExtractionStatus::Partial);
        assert_eq!(e.errors.len(), 1);
    }
}
