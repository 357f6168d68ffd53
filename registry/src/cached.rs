//! Per-session read cache in front of a [`CredentialRegistry`].
//!
//! Only successful reads are remembered. A failed read is returned to the
//! caller and the next call goes back to the chain. NID lookups are never
//! cached: they gate minting and must reflect the ledger at that moment.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use nftvote_types::{Address, TokenId};
use tracing::trace;

use crate::{CredentialInfo, CredentialRegistry, RegistryError};

#[derive(Default)]
struct Entries {
    holders: HashMap<Address, Option<TokenId>>,
    verified: HashMap<TokenId, bool>,
    info: HashMap<Address, Option<CredentialInfo>>,
}

pub struct CachedRegistry<R> {
    inner: R,
    entries: Mutex<Entries>,
}

impl<R: CredentialRegistry> CachedRegistry<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            entries: Mutex::new(Entries::default()),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Forget everything known about `holder` and the token it held.
    pub fn invalidate(&self, holder: Address) {
        let mut entries = self.entries();
        if let Some(Some(token)) = entries.holders.remove(&holder) {
            entries.verified.remove(&token);
        }
        entries.info.remove(&holder);
    }

    pub fn clear(&self) {
        *self.entries() = Entries::default();
    }
}

#[async_trait]
impl<R: CredentialRegistry> CredentialRegistry for CachedRegistry<R> {
    async fn resolve_holder_token(
        &self,
        holder: Address,
    ) -> Result<Option<TokenId>, RegistryError> {
        let cached = self.entries().holders.get(&holder).copied();
        if let Some(token) = cached {
            trace!(%holder, "holder token cache hit");
            return Ok(token);
        }
        let token = self.inner.resolve_holder_token(holder).await?;
        self.entries().holders.insert(holder, token);
        Ok(token)
    }

    async fn is_verified(&self, token: TokenId) -> Result<bool, RegistryError> {
        let cached = self.entries().verified.get(&token).copied();
        if let Some(verified) = cached {
            return Ok(verified);
        }
        let verified = self.inner.is_verified(token).await?;
        self.entries().verified.insert(token, verified);
        Ok(verified)
    }

    async fn credential_info(
        &self,
        holder: Address,
    ) -> Result<Option<CredentialInfo>, RegistryError> {
        let cached = self.entries().info.get(&holder).cloned();
        if let Some(info) = cached {
            return Ok(info);
        }
        let info = self.inner.credential_info(holder).await?;
        self.entries().info.insert(holder, info.clone());
        Ok(info)
    }

    async fn is_nid_registered(&self, nid: &str) -> Result<bool, RegistryError> {
        self.inner.is_nid_registered(nid).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChainRegistry;
    use nftvote_chain::{ChainError, VoterNftContract};
    use nftvote_nullables::NullChain;
    use std::sync::Arc;

    fn setup() -> (Arc<NullChain>, CachedRegistry<ChainRegistry>) {
        let chain = Arc::new(NullChain::bsc());
        let contract = VoterNftContract::new(chain.clone(), chain.deployment().voter_nft);
        (chain, CachedRegistry::new(ChainRegistry::new(contract)))
    }

    #[tokio::test]
    async fn successful_reads_are_served_from_cache() {
        let (chain, registry) = setup();
        let holder = Address::new([3; 20]);
        let token = chain.register_voter(holder, "Khulna", false);
        assert_eq!(registry.is_verified(token).await, Ok(false));

        chain.set_verified(token, true);
        assert_eq!(registry.is_verified(token).await, Ok(false));

        registry.clear();
        assert_eq!(registry.is_verified(token).await, Ok(true));
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let (chain, registry) = setup();
        let holder = Address::new([3; 20]);
        let token = chain.register_voter(holder, "Khulna", true);

        chain.fail_reads(ChainError::Transport("reset".into()));
        assert!(registry.resolve_holder_token(holder).await.is_err());

        chain.restore_reads();
        assert_eq!(registry.resolve_holder_token(holder).await, Ok(Some(token)));
    }

    #[tokio::test]
    async fn invalidate_drops_holder_entries() {
        let (chain, registry) = setup();
        let holder = Address::new([3; 20]);
        assert_eq!(registry.resolve_holder_token(holder).await, Ok(None));

        let token = chain.register_voter(holder, "Khulna", true);
        assert_eq!(registry.resolve_holder_token(holder).await, Ok(None));

        registry.invalidate(holder);
        assert_eq!(registry.resolve_holder_token(holder).await, Ok(Some(token)));
        assert_eq!(
            registry.credential_info(holder).await.unwrap().map(|i| i.area),
            Some("Khulna".to_string())
        );
    }

    #[tokio::test]
    async fn nid_lookups_always_reach_the_chain() {
        let (chain, registry) = setup();
        assert_eq!(registry.is_nid_registered("1234567890").await, Ok(false));
        chain.register_nid("1234567890");
        assert_eq!(registry.is_nid_registered("1234567890").await, Ok(true));
    }
}
