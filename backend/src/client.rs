//! HTTP client for the REST backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::dto::*;
use crate::{BackendError, IdentityExtractor, MirrorStore};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RestBackend {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl RestBackend {
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        Self::with_timeout(base_url, auth_token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "cannot build HTTP client with timeouts, using defaults");
                reqwest::Client::default()
            });
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let request = self.authorize(self.http.get(self.url(path)));
        self.execute(path, request).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        let request = self.authorize(self.http.post(self.url(path)).json(body));
        self.execute(path, request).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, BackendError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Unreachable(format!("request timed out: {e}"))
            } else if e.is_connect() {
                BackendError::Unreachable(format!("connection failed: {e}"))
            } else {
                BackendError::Other(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("failed to read body: {e}")))?;

        // The backend reports domain failures inside the envelope even on 4xx.
        match serde_json::from_str::<ApiEnvelope<T>>(&body) {
            Ok(envelope) => {
                if !envelope.is_success() {
                    tracing::debug!(path, code = %envelope.code, msg = %envelope.msg, "backend rejected request");
                }
                envelope.into_data()
            }
            Err(_) if !status.is_success() => Err(BackendError::Http(status.as_u16())),
            Err(e) => Err(BackendError::InvalidResponse(format!("{path}: {e}"))),
        }
    }
}

#[async_trait]
impl MirrorStore for RestBackend {
    async fn create_election_with_tx(
        &self,
        request: &CreateElectionWithTx,
    ) -> Result<String, BackendError> {
        let created: CreatedVotingDto = self.post("/api/voting/create-with-tx", request).await?;
        Ok(created.voting_id)
    }

    async fn record_vote_with_tx(
        &self,
        voting_id: &str,
        request: &VoteWithTx,
    ) -> Result<VoteReceiptDto, BackendError> {
        self.post(&format!("/api/voting/{voting_id}/vote-with-tx"), request)
            .await
    }

    async fn get_voting(&self, voting_id: &str) -> Result<VotingDto, BackendError> {
        self.get(&format!("/api/voting/{voting_id}")).await
    }

    async fn list_votings(&self, status: Option<&str>) -> Result<Vec<VotingDto>, BackendError> {
        match status {
            Some(status) => self.get(&format!("/api/voting?status={status}")).await,
            None => self.get("/api/voting").await,
        }
    }

    async fn my_votes(&self) -> Result<Vec<MyVoteDto>, BackendError> {
        self.get("/api/voting/my-votes").await
    }

    async fn kyc_request(&self, request_id: &str) -> Result<KycRequestDto, BackendError> {
        self.get(&format!("/api/kyc/requests/{request_id}")).await
    }

    async fn approve_kyc_with_tx(
        &self,
        request_id: &str,
        request: &ApproveWithTx,
    ) -> Result<ApprovalDto, BackendError> {
        self.post(&format!("/api/kyc/requests/{request_id}/approve-with-tx"), request)
            .await
    }

    async fn check_duplicate_nid(&self, nid: &str) -> Result<DuplicateNidDto, BackendError> {
        self.post("/api/kyc/check-duplicate-nid", &json!({ "nidNumber": nid }))
            .await
    }
}

#[async_trait]
impl IdentityExtractor for RestBackend {
    async fn extract_id(&self, image_base64: &str) -> Result<ExtractionDto, BackendError> {
        self.post("/api/kyc/extract-id", &json!({ "imageBase64": image_base64 }))
            .await
    }
}
