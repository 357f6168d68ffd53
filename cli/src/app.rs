//! Service wiring from a [`CliConfig`].

use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use nftvote_backend::{IdentityExtractor, MirrorStore, RestBackend};
use nftvote_chain::{ChainProvider, Deployment, JsonRpcProvider, VoterNftContract, VotingSystemContract};
use nftvote_election::ElectionManager;
use nftvote_kyc::CredentialIssuer;
use nftvote_pinning::PinataClient;
use nftvote_reconciler::{InconsistencyJournal, Reconciler};
use nftvote_registry::{CachedRegistry, ChainRegistry, CredentialRegistry};
use nftvote_types::{Address, SystemClock};
use nftvote_voting::{VoteCaster, VoterContext};
use tracing::info;

use crate::config::CliConfig;

pub struct App {
    pub config: CliConfig,
    provider: Arc<dyn ChainProvider>,
    deployment: Deployment,
    backend: Arc<RestBackend>,
    mirror: Arc<dyn MirrorStore>,
    reconciler: Arc<Reconciler>,
}

impl App {
    pub fn new(config: CliConfig) -> anyhow::Result<Self> {
        let descriptor = config.active_chain()?.clone();
        let deployment = Deployment::for_chain(&descriptor)
            .with_context(|| format!("contracts are not deployed on {}", descriptor.name))?;
        info!(chain = %descriptor.name, chain_id = descriptor.chain_id, "using chain");

        let journal = InconsistencyJournal::open(&config.journal_path).with_context(|| {
            format!("cannot open journal {}", config.journal_path.display())
        })?;
        let reconciler = Reconciler::new(Arc::new(journal), Arc::new(SystemClock))
            .with_poll_interval(config.poll_interval());
        let backend = Arc::new(RestBackend::new(
            config.backend_url.clone(),
            config.backend_token.clone(),
        ));

        Ok(Self {
            provider: Arc::new(JsonRpcProvider::new(descriptor)),
            deployment,
            mirror: backend.clone(),
            backend,
            reconciler: Arc::new(reconciler),
            config,
        })
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    pub fn mirror(&self) -> &Arc<dyn MirrorStore> {
        &self.mirror
    }

    pub fn extractor(&self) -> &dyn IdentityExtractor {
        self.backend.as_ref()
    }

    fn voting_contract(&self) -> VotingSystemContract {
        VotingSystemContract::new(self.provider.clone(), self.deployment.voting_system)
    }

    fn nft_contract(&self) -> VoterNftContract {
        VoterNftContract::new(self.provider.clone(), self.deployment.voter_nft)
    }

    pub fn elections(&self) -> ElectionManager {
        ElectionManager::new(
            self.voting_contract(),
            self.mirror.clone(),
            self.reconciler.clone(),
        )
    }

    pub fn caster(&self) -> VoteCaster {
        let registry = ChainRegistry::new(self.nft_contract());
        let registry: Arc<dyn CredentialRegistry> = if self.config.cache_credentials {
            Arc::new(CachedRegistry::new(registry))
        } else {
            Arc::new(registry)
        };
        VoteCaster::new(
            self.voting_contract(),
            registry,
            self.mirror.clone(),
            self.reconciler.clone(),
        )
    }

    pub fn issuer(&self) -> anyhow::Result<CredentialIssuer> {
        let jwt = self
            .config
            .pinata_jwt
            .clone()
            .ok_or_else(|| anyhow!("credential issuance needs a Pinata JWT (NFTVOTE_PINATA_JWT)"))?;
        Ok(CredentialIssuer::new(
            self.nft_contract(),
            self.mirror.clone(),
            Arc::new(PinataClient::new(jwt)),
            self.reconciler.clone(),
        )
        .with_external_url(self.config.metadata_external_url.clone()))
    }

    /// `explicit`, or the wallet's first account.
    pub async fn account(&self, explicit: Option<Address>) -> anyhow::Result<Address> {
        if let Some(account) = explicit {
            return Ok(account);
        }
        match VoterContext::from_wallet(self.provider.as_ref()).await?.account {
            Some(account) => Ok(account),
            None => bail!("no wallet account available; pass --from"),
        }
    }

    pub async fn voter(&self, explicit: Option<Address>) -> anyhow::Result<VoterContext> {
        let account = self.account(explicit).await?;
        Ok(VoterContext::connected(account).with_admin(self.config.is_admin(account)))
    }
}
