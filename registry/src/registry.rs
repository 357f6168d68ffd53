//! The credential registry seam and the facts it reports.

use async_trait::async_trait;
use nftvote_types::{Address, Timestamp, TokenId};
use serde::{Deserialize, Serialize};

use crate::RegistryError;

/// What `getVoterInfo` reports for a holder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialInfo {
    pub token: TokenId,
    pub area: String,
    pub verified: bool,
    pub registered_at: Timestamp,
}

/// Everything known about one address at one moment, resolved once and
/// passed explicitly to the flows that need it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSnapshot {
    pub holder: Address,
    pub token: Option<TokenId>,
    pub info: Option<CredentialInfo>,
}

impl CredentialSnapshot {
    pub fn without_credential(holder: Address) -> Self {
        Self {
            holder,
            token: None,
            info: None,
        }
    }

    pub fn has_credential(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_verified(&self) -> bool {
        self.info.as_ref().is_some_and(|i| i.verified)
    }

    pub fn area(&self) -> Option<&str> {
        self.info.as_ref().map(|i| i.area.as_str())
    }
}

#[async_trait]
pub trait CredentialRegistry: Send + Sync {
    /// Token currently held by `holder`, `None` if it holds none.
    async fn resolve_holder_token(&self, holder: Address)
        -> Result<Option<TokenId>, RegistryError>;

    async fn is_verified(&self, token: TokenId) -> Result<bool, RegistryError>;

    /// Credential details of `holder`, `None` if it holds none.
    async fn credential_info(&self, holder: Address)
        -> Result<Option<CredentialInfo>, RegistryError>;

    async fn is_nid_registered(&self, nid: &str) -> Result<bool, RegistryError>;

    async fn snapshot(&self, holder: Address) -> Result<CredentialSnapshot, RegistryError> {
        let Some(token) = self.resolve_holder_token(holder).await? else {
            return Ok(CredentialSnapshot::without_credential(holder));
        };
        let info = self.credential_info(holder).await?;
        Ok(CredentialSnapshot {
            holder,
            token: Some(token),
            info,
        })
    }
}
