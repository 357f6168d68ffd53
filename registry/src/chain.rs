//! Registry backed directly by the VoterNFT contract.

use async_trait::async_trait;
use nftvote_chain::VoterNftContract;
use nftvote_types::{Address, TokenId};
use tracing::debug;

use crate::{CredentialInfo, CredentialRegistry, RegistryError};

pub struct ChainRegistry {
    contract: VoterNftContract,
}

impl ChainRegistry {
    pub fn new(contract: VoterNftContract) -> Self {
        Self { contract }
    }

    pub fn contract(&self) -> &VoterNftContract {
        &self.contract
    }
}

#[async_trait]
impl CredentialRegistry for ChainRegistry {
    async fn resolve_holder_token(
        &self,
        holder: Address,
    ) -> Result<Option<TokenId>, RegistryError> {
        let token = self.contract.owned_token_id(holder).await?;
        debug!(%holder, token = ?token, "resolved credential holder");
        Ok(token)
    }

    async fn is_verified(&self, token: TokenId) -> Result<bool, RegistryError> {
        Ok(self.contract.is_token_verified(token).await?)
    }

    async fn credential_info(
        &self,
        holder: Address,
    ) -> Result<Option<CredentialInfo>, RegistryError> {
        let record = self.contract.voter_info(holder).await?;
        Ok(record.token_id.map(|token| CredentialInfo {
            token,
            area: record.area,
            verified: record.verified,
            registered_at: record.registered_at,
        }))
    }

    async fn is_nid_registered(&self, nid: &str) -> Result<bool, RegistryError> {
        Ok(self.contract.is_nid_registered(nid).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nftvote_chain::ChainError;
    use nftvote_nullables::NullChain;
    use std::sync::Arc;

    fn setup() -> (Arc<NullChain>, ChainRegistry) {
        let chain = Arc::new(NullChain::bsc());
        let contract = VoterNftContract::new(chain.clone(), chain.deployment().voter_nft);
        (chain, ChainRegistry::new(contract))
    }

    #[tokio::test]
    async fn holder_without_token_resolves_to_none() {
        let (_chain, registry) = setup();
        let holder = Address::new([7; 20]);
        assert_eq!(registry.resolve_holder_token(holder).await, Ok(None));
        assert_eq!(registry.credential_info(holder).await, Ok(None));
        let snapshot = registry.snapshot(holder).await.unwrap();
        assert!(!snapshot.has_credential());
        assert!(!snapshot.is_verified());
    }

    #[tokio::test]
    async fn snapshot_carries_area_and_verification() {
        let (chain, registry) = setup();
        let holder = Address::new([7; 20]);
        let token = chain.register_voter(holder, "Dhaka", true);
        let snapshot = registry.snapshot(holder).await.unwrap();
        assert_eq!(snapshot.token, Some(token));
        assert_eq!(snapshot.area(), Some("Dhaka"));
        assert!(snapshot.is_verified());
        assert_eq!(registry.is_verified(token).await, Ok(true));
    }

    #[tokio::test]
    async fn eligibility_follows_the_current_holder() {
        let (chain, registry) = setup();
        let first = Address::new([1; 20]);
        let second = Address::new([2; 20]);
        let token = chain.register_voter(first, "Dhaka", true);
        chain.transfer(token, second);
        assert_eq!(registry.resolve_holder_token(first).await, Ok(None));
        assert_eq!(registry.resolve_holder_token(second).await, Ok(Some(token)));
    }

    #[tokio::test]
    async fn read_failure_is_an_error_not_absence() {
        let (chain, registry) = setup();
        chain.fail_reads(ChainError::Transport("timeout".into()));
        let err = registry
            .resolve_holder_token(Address::new([1; 20]))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
