//! Minting a voter credential for an approved KYC request.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use nftvote_backend::{ApprovalDto, ApproveWithTx, KycRequestDto, KycStatus, MirrorStore};
use nftvote_chain::{VoterInfoInput, VoterNftContract, VoterRegisteredEvent};
use nftvote_pinning::{ContentHash, ContentStore};
use nftvote_reconciler::{CommitError, ConfirmedTx, InconsistencyKind, Reconciler};
use nftvote_types::{Address, ChainKind, TokenId, TxHash};
use nftvote_utils::{mint_span, remirror_span};
use tracing::{debug, info, warn, Instrument};

use crate::metadata::DEFAULT_EXTERNAL_URL;
use crate::{
    clean_name, validate_dob, validate_nid, IdentityError, IdentityRecord, KycError, NidRegistry,
    PhotoSource, VoterMetadata, NOT_DETECTED,
};

/// A credential that is on chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Minted {
    pub request_id: String,
    pub recipient: Address,
    /// `None` when the receipt carried no `VoterRegistered` event and the
    /// follow-up ownership read failed.
    pub token: Option<TokenId>,
    pub chain: ChainKind,
    pub tx: TxHash,
    pub block_number: u64,
    pub metadata: ContentHash,
    pub photo: ContentHash,
}

pub struct CredentialIssuer {
    nft: VoterNftContract,
    mirror: Arc<dyn MirrorStore>,
    content: Arc<dyn ContentStore>,
    reconciler: Arc<Reconciler>,
    external_url: String,
}

impl CredentialIssuer {
    pub fn new(
        nft: VoterNftContract,
        mirror: Arc<dyn MirrorStore>,
        content: Arc<dyn ContentStore>,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self {
            nft,
            mirror,
            content,
            reconciler,
            external_url: DEFAULT_EXTERNAL_URL.to_string(),
        }
    }

    pub fn with_external_url(mut self, url: impl Into<String>) -> Self {
        self.external_url = url.into();
        self
    }

    fn chain(&self) -> ChainKind {
        self.nft.provider().descriptor().kind
    }

    fn now(&self) -> DateTime<Utc> {
        self.reconciler
            .clock()
            .now()
            .to_datetime()
            .unwrap_or_else(Utc::now)
    }

    /// Validate the request's identity data.
    pub fn identity(
        &self,
        request: &KycRequestDto,
        today: NaiveDate,
    ) -> Result<IdentityRecord, KycError> {
        let extracted = request.extracted_data.clone().unwrap_or_default();
        let raw_nid = if extracted.nid_number.trim().is_empty() {
            request.nid_number.clone().unwrap_or_default()
        } else {
            extracted.nid_number.clone()
        };
        let nid = validate_nid(&raw_nid)?;
        validate_dob(&extracted.date_of_birth, today)?;

        let name = match clean_name(&extracted.name) {
            n if n.is_empty() || n == NOT_DETECTED => request.user_name.trim().to_string(),
            n => n,
        };
        if name.is_empty() {
            return Err(IdentityError::MissingName.into());
        }
        Ok(IdentityRecord {
            name,
            father_name: extracted.father_name.trim().to_string(),
            mother_name: extracted.mother_name.trim().to_string(),
            date_of_birth: extracted.date_of_birth.trim().to_string(),
            nid,
            residential_area: request.residential_area.trim().to_string(),
        })
    }

    /// Approve `request_id` by minting its credential, signed by `admin`.
    ///
    /// Every check runs before anything is pinned. The mirror is only told
    /// about the approval once the mint is confirmed; if that write fails the
    /// result is [`KycError::NotMirrored`] and the request must be finished
    /// with [`CredentialIssuer::remirror_approval`].
    pub async fn approve_and_mint(
        &self,
        admin: Address,
        request_id: &str,
    ) -> Result<Minted, KycError> {
        let span = mint_span(self.chain().as_str(), request_id);
        self.mint(admin, request_id).instrument(span).await
    }

    async fn mint(&self, admin: Address, request_id: &str) -> Result<Minted, KycError> {
        let request = self.mirror.kyc_request(request_id).await?;
        if request.status != KycStatus::Pending {
            return Err(KycError::NotPending {
                request: request_id.to_string(),
                status: request.status,
            });
        }
        let chain = self.chain();
        if request.chain_type != chain {
            return Err(KycError::WrongChain {
                requested: request.chain_type,
                issuer: chain,
            });
        }
        let issued_at = self.now();
        let identity = self.identity(&request, issued_at.date_naive())?;
        let recipient = request.wallet_address;

        if let Some(token) = self.nft.owned_token_id(recipient).await? {
            return Err(KycError::AlreadyHolds { recipient, token });
        }
        if self.mirror.check_duplicate_nid(identity.nid.as_str()).await?.is_duplicate {
            return Err(KycError::DuplicateNid {
                found_in: NidRegistry::Mirror,
            });
        }
        if self.nft.is_nid_registered(identity.nid.as_str()).await? {
            return Err(KycError::DuplicateNid {
                found_in: NidRegistry::Chain,
            });
        }

        let photo = self.pin_photo(&request.face_photo).await?;
        let metadata =
            VoterMetadata::build(&identity, recipient, chain, &photo, &self.external_url, issued_at);
        let metadata_hash = self
            .content
            .pin_json(&metadata.pin_name(), &metadata.to_json())
            .await?;
        debug!(photo = %photo, metadata = %metadata_hash, "credential content pinned");

        let info = VoterInfoInput {
            name: identity.name.clone(),
            father_name: identity.father_name.clone(),
            mother_name: identity.mother_name.clone(),
            date_of_birth: identity.date_of_birth.clone(),
            nid_number: identity.nid.as_str().to_string(),
            residential_area: identity.residential_area.clone(),
            ipfs_metadata_hash: metadata_hash.to_string(),
        };
        let provider = self.nft.provider().as_ref();
        let confirmed = self
            .reconciler
            .submit_and_confirm(provider, || self.nft.submit_mint(admin, recipient, &info))
            .await
            .map_err(KycError::from_mint)?;

        let minted = Minted {
            request_id: request_id.to_string(),
            recipient,
            token: self.minted_token(&confirmed, recipient).await,
            chain,
            tx: confirmed.hash,
            block_number: confirmed.block_number(),
            metadata: metadata_hash.clone(),
            photo,
        };
        info!(recipient = %recipient, token = ?minted.token.map(|t| t.get()), tx = %minted.tx, "credential minted");

        let mirror = Arc::clone(&self.mirror);
        let id = request_id.to_string();
        let result = self
            .reconciler
            .mirror(
                confirmed,
                InconsistencyKind::MintMirror,
                &format!("kyc request {request_id} for {recipient}"),
                move |tx| async move {
                    let request = ApproveWithTx {
                        ipfs_hash: metadata_hash.to_string(),
                        tx_hash: tx.hash,
                    };
                    mirror.approve_kyc_with_tx(&id, &request).await
                },
            )
            .await;

        match result {
            Ok(_) => {
                info!(tx = %minted.tx, "approval recorded");
                Ok(minted)
            }
            Err(CommitError::MirrorFailed { entry, source, .. }) => Err(KycError::NotMirrored {
                minted: Box::new(minted),
                inconsistency: entry,
                source,
            }),
            Err(other) => Err(KycError::Mint(other)),
        }
    }

    async fn pin_photo(&self, raw: &str) -> Result<ContentHash, KycError> {
        let photo = PhotoSource::parse(raw)?;
        let name = photo.file_name();
        match photo {
            PhotoSource::Pinned(hash) => Ok(hash),
            PhotoSource::Inline { bytes, .. } => Ok(self.content.pin_file(&name, bytes).await?),
        }
    }

    async fn verify_mint(
        &self,
        tx: TxHash,
        recipient: Address,
        token: TokenId,
    ) -> Result<(), KycError> {
        let unconfirmed = |detail: String| KycError::Unconfirmed { tx, detail };
        let provider = self.nft.provider().as_ref();
        let confirmed = match self.reconciler.verify(provider, tx).await {
            Ok(confirmed) => confirmed,
            Err(CommitError::Chain(e)) => return Err(KycError::Chain(e)),
            Err(e) => return Err(unconfirmed(e.to_string())),
        };
        let minted = VoterRegisteredEvent::from_receipt(&confirmed.receipt, &self.nft.address())
            .into_iter()
            .any(|e| e.voter == recipient && e.token_id == token);
        if !minted {
            return Err(unconfirmed(format!(
                "no VoterRegistered log for token {token} to {recipient}"
            )));
        }
        Ok(())
    }

    /// Token id from the receipt, or from an ownership read if the event is
    /// missing.
    async fn minted_token(&self, confirmed: &ConfirmedTx, recipient: Address) -> Option<TokenId> {
        let from_event = VoterRegisteredEvent::from_receipt(&confirmed.receipt, &self.nft.address())
            .into_iter()
            .find(|e| e.voter == recipient)
            .map(|e| e.token_id);
        if from_event.is_some() {
            return from_event;
        }
        warn!(tx = %confirmed.hash, "no VoterRegistered event in receipt, reading ownership");
        match self.nft.owned_token_id(recipient).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "ownership read failed");
                None
            }
        }
    }

    /// Record the approval for a credential that was minted in `tx` but
    /// never mirrored. Nothing is submitted on chain.
    ///
    /// `tx` must be mined with success and carry the `VoterRegistered` log
    /// for `recipient` and the token it holds now.
    pub async fn remirror_approval(
        &self,
        request_id: &str,
        recipient: Address,
        tx: TxHash,
    ) -> Result<ApprovalDto, KycError> {
        let span = remirror_span(InconsistencyKind::MintMirror.as_str(), &tx.to_string());
        async {
            let journal = self.reconciler.journal();
            let open = journal.find_unresolved(InconsistencyKind::MintMirror, tx);

            let token = self
                .nft
                .owned_token_id(recipient)
                .await?
                .ok_or(KycError::NotMinted { recipient })?;
            self.verify_mint(tx, recipient, token).await?;

            let request = self.mirror.kyc_request(request_id).await?;
            if request.status == KycStatus::Approved {
                if let Some(entry) = &open {
                    journal.resolve(entry.id);
                }
                info!(request = %request_id, "approval already recorded");
                return Ok(ApprovalDto {
                    nft_token_id: request.nft_token_id.unwrap_or_else(|| token.to_string()),
                    transaction_hash: request
                        .nft_transaction_hash
                        .unwrap_or_else(|| tx.to_string()),
                });
            }

            let uri = self.nft.token_uri(token).await?;
            let approval = ApproveWithTx {
                ipfs_hash: uri.trim().trim_start_matches("ipfs://").to_string(),
                tx_hash: tx,
            };
            match self.mirror.approve_kyc_with_tx(request_id, &approval).await {
                Ok(dto) => {
                    if let Some(entry) = open {
                        journal.resolve(entry.id);
                    }
                    info!(request = %request_id, token = token.get(), "approval re-mirrored");
                    Ok(dto)
                }
                Err(source) => {
                    if open.is_none() {
                        journal.record(
                            InconsistencyKind::MintMirror,
                            self.chain(),
                            tx,
                            format!("kyc request {request_id}: re-mirror failed: {source}"),
                            self.reconciler.clock().now(),
                        );
                    }
                    Err(source.into())
                }
            }
        }
        .instrument(span)
        .await
    }
}
