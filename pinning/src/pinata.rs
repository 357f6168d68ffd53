//! Pinata-compatible pinning client (JWT bearer auth).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::{ContentHash, ContentStore, PinningError};

pub const DEFAULT_API_URL: &str = "https://api.pinata.cloud";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct PinataClient {
    http: reqwest::Client,
    api_url: String,
    jwt: String,
}

/// `{"IpfsHash": "...", "PinSize": n, "Timestamp": "..."}`
#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

impl PinataClient {
    pub fn new(jwt: impl Into<String>) -> Self {
        Self::with_api_url(DEFAULT_API_URL, jwt)
    }

    pub fn with_api_url(api_url: impl Into<String>, jwt: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "cannot build HTTP client with timeouts, using defaults");
                reqwest::Client::default()
            });
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            jwt: jwt.into(),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<ContentHash, PinningError> {
        let response = request.bearer_auth(&self.jwt).send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                PinningError::Unreachable(e.to_string())
            } else {
                PinningError::Other(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PinningError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: PinResponse = response
            .json()
            .await
            .map_err(|e| PinningError::InvalidResponse(e.to_string()))?;
        parsed.ipfs_hash.parse()
    }
}

#[async_trait]
impl ContentStore for PinataClient {
    async fn pin_json(
        &self,
        name: &str,
        content: &serde_json::Value,
    ) -> Result<ContentHash, PinningError> {
        let body = json!({
            "pinataContent": content,
            "pinataMetadata": { "name": name },
        });
        let request = self
            .http
            .post(format!("{}/pinning/pinJSONToIPFS", self.api_url))
            .json(&body);
        let hash = self.send(request).await?;
        tracing::info!(name, cid = %hash, "pinned json");
        Ok(hash)
    }

    async fn pin_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<ContentHash, PinningError> {
        let size = bytes.len();
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let request = self
            .http
            .post(format!("{}/pinning/pinFileToIPFS", self.api_url))
            .multipart(form);
        let hash = self.send(request).await?;
        tracing::info!(file_name, size, cid = %hash, "pinned file");
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_response_parses() {
        let json = r#"{"IpfsHash":"QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG","PinSize":1234,"Timestamp":"2025-01-01T00:00:00Z"}"#;
        let parsed: PinResponse = serde_json::from_str(json).unwrap();
        assert!(ContentHash::is_valid(&parsed.ipfs_hash));
    }

    #[test]
    fn api_url_is_normalised() {
        let client = PinataClient::with_api_url("http://localhost:8080/", "jwt");
        assert_eq!(client.api_url, "http://localhost:8080");
    }
}
