//! Typed wrappers over the two deployed contracts.

use std::sync::Arc;

use nftvote_abi::contracts::{voter_nft, voting_system};
use nftvote_abi::{Function, Token};
use nftvote_types::{
    Address, BlockchainElectionId, CandidateId, ChainDescriptor, Timestamp, TokenId, TxHash,
};

use crate::{ChainError, ChainProvider};

/// Contract addresses on one chain, resolved from its descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deployment {
    pub voter_nft: Address,
    pub voting_system: Address,
}

impl Deployment {
    pub fn for_chain(descriptor: &ChainDescriptor) -> Result<Self, ChainError> {
        match (descriptor.contracts.voter_nft, descriptor.contracts.voting_system) {
            (Some(voter_nft), Some(voting_system)) => Ok(Self {
                voter_nft,
                voting_system,
            }),
            _ => Err(ChainError::ContractNotDeployed(descriptor.chain_id)),
        }
    }
}

async fn call(
    provider: &dyn ChainProvider,
    to: Address,
    function: &Function,
    args: &[Token],
) -> Result<Vec<Token>, ChainError> {
    let data = function.encode_call(args)?;
    let output = provider.call(to, data).await?;
    Ok(function.decode_output(&output)?)
}

async fn call_single(
    provider: &dyn ChainProvider,
    to: Address,
    function: &Function,
    args: &[Token],
) -> Result<Token, ChainError> {
    call(provider, to, function, args)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ChainError::InvalidResponse(format!("{} returned nothing", function.name)))
}

/// Raw `getVoterInfo` result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoterInfoRecord {
    pub token_id: Option<TokenId>,
    pub area: String,
    pub verified: bool,
    pub registered_at: Timestamp,
}

/// The `voterInfo` tuple of `mintVoterNFT`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoterInfoInput {
    pub name: String,
    pub father_name: String,
    pub mother_name: String,
    pub date_of_birth: String,
    pub nid_number: String,
    pub residential_area: String,
    pub ipfs_metadata_hash: String,
}

impl VoterInfoInput {
    fn to_token(&self) -> Token {
        Token::Tuple(
            [
                &self.name,
                &self.father_name,
                &self.mother_name,
                &self.date_of_birth,
                &self.nid_number,
                &self.residential_area,
                &self.ipfs_metadata_hash,
            ]
            .into_iter()
            .map(|s| Token::String(s.clone()))
            .collect(),
        )
    }

    /// Inverse of the calldata tuple, used by test doubles.
    pub fn from_token(token: Token) -> Result<Self, ChainError> {
        let fields = token.into_tuple()?;
        let mut it = fields.into_iter().map(Token::into_string);
        let mut next = || -> Result<String, ChainError> {
            it.next()
                .ok_or_else(|| ChainError::InvalidResponse("voterInfo tuple too short".into()))?
                .map_err(ChainError::from)
        };
        Ok(Self {
            name: next()?,
            father_name: next()?,
            mother_name: next()?,
            date_of_birth: next()?,
            nid_number: next()?,
            residential_area: next()?,
            ipfs_metadata_hash: next()?,
        })
    }
}

/// The voter credential contract.
#[derive(Clone)]
pub struct VoterNftContract {
    provider: Arc<dyn ChainProvider>,
    address: Address,
}

impl VoterNftContract {
    pub fn new(provider: Arc<dyn ChainProvider>, address: Address) -> Self {
        Self { provider, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn provider(&self) -> &Arc<dyn ChainProvider> {
        &self.provider
    }

    /// Credential currently held by `holder`; `None` when the contract reports `0`.
    pub async fn owned_token_id(&self, holder: Address) -> Result<Option<TokenId>, ChainError> {
        let raw = call_single(
            self.provider.as_ref(),
            self.address,
            &voter_nft::get_owned_token_id(),
            &[Token::Address(holder)],
        )
        .await?
        .into_u64()?;
        Ok(TokenId::from_raw(raw))
    }

    pub async fn is_token_verified(&self, token: TokenId) -> Result<bool, ChainError> {
        Ok(call_single(
            self.provider.as_ref(),
            self.address,
            &voter_nft::is_token_verified(),
            &[Token::uint(token.get())],
        )
        .await?
        .into_bool()?)
    }

    pub async fn voter_info(&self, holder: Address) -> Result<VoterInfoRecord, ChainError> {
        let mut it = call(
            self.provider.as_ref(),
            self.address,
            &voter_nft::get_voter_info(),
            &[Token::Address(holder)],
        )
        .await?
        .into_iter();
        let mut next = || {
            it.next()
                .ok_or_else(|| ChainError::InvalidResponse("getVoterInfo result too short".into()))
        };
        Ok(VoterInfoRecord {
            token_id: TokenId::from_raw(next()?.into_u64()?),
            area: next()?.into_string()?,
            verified: next()?.into_bool()?,
            registered_at: Timestamp::new(next()?.into_u64()?),
        })
    }

    pub async fn is_nid_registered(&self, nid: &str) -> Result<bool, ChainError> {
        Ok(call_single(
            self.provider.as_ref(),
            self.address,
            &voter_nft::is_nid_registered(),
            &[Token::string(nid)],
        )
        .await?
        .into_bool()?)
    }

    pub async fn total_registered_voters(&self) -> Result<u64, ChainError> {
        Ok(call_single(
            self.provider.as_ref(),
            self.address,
            &voter_nft::total_registered_voters(),
            &[],
        )
        .await?
        .into_u64()?)
    }

    pub async fn token_uri(&self, token: TokenId) -> Result<String, ChainError> {
        Ok(call_single(
            self.provider.as_ref(),
            self.address,
            &voter_nft::token_uri(),
            &[Token::uint(token.get())],
        )
        .await?
        .into_string()?)
    }

    /// Submit `mintVoterNFT(to, info)` signed by `from`.
    pub async fn submit_mint(
        &self,
        from: Address,
        to: Address,
        info: &VoterInfoInput,
    ) -> Result<TxHash, ChainError> {
        let data = voter_nft::mint_voter_nft().encode_call(&[Token::Address(to), info.to_token()])?;
        self.provider.send_transaction(from, self.address, data).await
    }
}

/// On-chain election summary from `getElectionInfo`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OnChainElection {
    pub id: BlockchainElectionId,
    pub title: String,
    pub description: String,
    pub start: Timestamp,
    pub end: Timestamp,
    pub eligible_areas: Vec<String>,
    pub candidate_count: u64,
    pub total_votes: u64,
    pub is_active: bool,
    pub results_finalized: bool,
    pub creator: Address,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OnChainCandidate {
    pub id: CandidateId,
    pub name: String,
    pub party: String,
    pub description: String,
    pub vote_count: u64,
}

/// The election and ballot contract.
#[derive(Clone)]
pub struct VotingSystemContract {
    provider: Arc<dyn ChainProvider>,
    address: Address,
}

impl VotingSystemContract {
    pub fn new(provider: Arc<dyn ChainProvider>, address: Address) -> Self {
        Self { provider, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn provider(&self) -> &Arc<dyn ChainProvider> {
        &self.provider
    }

    pub async fn submit_create_election(
        &self,
        from: Address,
        title: &str,
        description: &str,
        start: Timestamp,
        end: Timestamp,
        eligible_areas: &[String],
    ) -> Result<TxHash, ChainError> {
        let data = voting_system::create_election().encode_call(&[
            Token::string(title),
            Token::string(description),
            Token::uint(start.as_secs()),
            Token::uint(end.as_secs()),
            Token::Array(eligible_areas.iter().cloned().map(Token::String).collect()),
        ])?;
        self.provider.send_transaction(from, self.address, data).await
    }

    pub async fn submit_add_candidate(
        &self,
        from: Address,
        election: BlockchainElectionId,
        name: &str,
        party: &str,
        description: &str,
    ) -> Result<TxHash, ChainError> {
        let data = voting_system::add_candidate().encode_call(&[
            Token::uint(election.get()),
            Token::string(name),
            Token::string(party),
            Token::string(description),
        ])?;
        self.provider.send_transaction(from, self.address, data).await
    }

    pub async fn submit_cast_vote(
        &self,
        from: Address,
        election: BlockchainElectionId,
        candidate: CandidateId,
    ) -> Result<TxHash, ChainError> {
        let data = voting_system::cast_vote()
            .encode_call(&[Token::uint(election.get()), Token::uint(candidate.get())])?;
        self.provider.send_transaction(from, self.address, data).await
    }

    /// Whether the credential has already been used in this election.
    pub async fn has_nft_voted(
        &self,
        election: BlockchainElectionId,
        token: TokenId,
    ) -> Result<bool, ChainError> {
        Ok(call_single(
            self.provider.as_ref(),
            self.address,
            &voting_system::has_nft_voted(),
            &[Token::uint(election.get()), Token::uint(token.get())],
        )
        .await?
        .into_bool()?)
    }

    pub async fn has_voter_voted(
        &self,
        election: BlockchainElectionId,
        voter: Address,
    ) -> Result<bool, ChainError> {
        Ok(call_single(
            self.provider.as_ref(),
            self.address,
            &voting_system::has_voter_voted(),
            &[Token::uint(election.get()), Token::Address(voter)],
        )
        .await?
        .into_bool()?)
    }

    pub async fn votes_by_chain(
        &self,
        election: BlockchainElectionId,
        chain_id: u64,
    ) -> Result<u64, ChainError> {
        Ok(call_single(
            self.provider.as_ref(),
            self.address,
            &voting_system::get_votes_by_chain(),
            &[Token::uint(election.get()), Token::uint(chain_id)],
        )
        .await?
        .into_u64()?)
    }

    pub async fn election_count(&self) -> Result<u64, ChainError> {
        Ok(call_single(
            self.provider.as_ref(),
            self.address,
            &voting_system::get_election_count(),
            &[],
        )
        .await?
        .into_u64()?)
    }

    pub async fn election_info(
        &self,
        election: BlockchainElectionId,
    ) -> Result<OnChainElection, ChainError> {
        let fields = call_single(
            self.provider.as_ref(),
            self.address,
            &voting_system::get_election_info(),
            &[Token::uint(election.get())],
        )
        .await?
        .into_tuple()?;
        let mut it = fields.into_iter();
        let mut next = || {
            it.next()
                .ok_or_else(|| ChainError::InvalidResponse("election info tuple too short".into()))
        };
        Ok(OnChainElection {
            id: BlockchainElectionId::new(next()?.into_u64()?),
            title: next()?.into_string()?,
            description: next()?.into_string()?,
            start: Timestamp::new(next()?.into_u64()?),
            end: Timestamp::new(next()?.into_u64()?),
            eligible_areas: next()?
                .into_array()?
                .into_iter()
                .map(Token::into_string)
                .collect::<Result<_, _>>()?,
            candidate_count: next()?.into_u64()?,
            total_votes: next()?.into_u64()?,
            is_active: next()?.into_bool()?,
            results_finalized: next()?.into_bool()?,
            creator: next()?.into_address()?,
        })
    }

    pub async fn election_candidates(
        &self,
        election: BlockchainElectionId,
    ) -> Result<Vec<OnChainCandidate>, ChainError> {
        let rows = call_single(
            self.provider.as_ref(),
            self.address,
            &voting_system::get_election_candidates(),
            &[Token::uint(election.get())],
        )
        .await?
        .into_array()?;
        rows.into_iter()
            .map(|row| -> Result<OnChainCandidate, ChainError> {
                let mut it = row.into_tuple()?.into_iter();
                let mut next = || {
                    it.next()
                        .ok_or_else(|| ChainError::InvalidResponse("candidate tuple too short".into()))
                };
                let id = CandidateId::new(next()?.into_u64()?)
                    .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;
                Ok(OnChainCandidate {
                    id,
                    name: next()?.into_string()?,
                    party: next()?.into_string()?,
                    description: next()?.into_string()?,
                    vote_count: next()?.into_u64()?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nftvote_types::TransactionReceipt;
    use std::sync::Mutex;

    /// Answers every call with a fixed output and records sent calldata.
    struct CannedProvider {
        descriptor: ChainDescriptor,
        output: Vec<u8>,
        sent: Mutex<Vec<Vec<u8>>>,
    }

    impl CannedProvider {
        fn new(output: Vec<u8>) -> Arc<Self> {
            Arc::new(Self {
                descriptor: ChainDescriptor::bsc_testnet(),
                output,
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChainProvider for CannedProvider {
        fn descriptor(&self) -> &ChainDescriptor {
            &self.descriptor
        }
        async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
            Ok(vec![])
        }
        async fn call(&self, _to: Address, _data: Vec<u8>) -> Result<Vec<u8>, ChainError> {
            Ok(self.output.clone())
        }
        async fn send_transaction(
            &self,
            _from: Address,
            _to: Address,
            data: Vec<u8>,
        ) -> Result<TxHash, ChainError> {
            self.sent.lock().unwrap().push(data);
            Ok(TxHash::new([1; 32]))
        }
        async fn transaction_receipt(
            &self,
            _hash: TxHash,
        ) -> Result<Option<TransactionReceipt>, ChainError> {
            Ok(None)
        }
    }

    #[test]
    fn deployment_requires_both_contracts() {
        assert!(Deployment::for_chain(&ChainDescriptor::bsc_testnet()).is_ok());
        assert_eq!(
            Deployment::for_chain(&ChainDescriptor::sepolia()),
            Err(ChainError::ContractNotDeployed(11_155_111))
        );
    }

    #[tokio::test]
    async fn zero_owned_token_is_none() {
        let provider = CannedProvider::new(nftvote_abi::encode(&[Token::Uint(0)]));
        let nft = VoterNftContract::new(provider, Address::new([1; 20]));
        assert_eq!(nft.owned_token_id(Address::new([2; 20])).await.unwrap(), None);
    }

    #[tokio::test]
    async fn voter_info_decodes_all_fields() {
        let output = nftvote_abi::encode(&[
            Token::Uint(8),
            Token::string("Chittagong-9"),
            Token::Bool(true),
            Token::Uint(1_700_000_000),
        ]);
        let nft = VoterNftContract::new(CannedProvider::new(output), Address::new([1; 20]));
        let info = nft.voter_info(Address::new([2; 20])).await.unwrap();
        assert_eq!(info.token_id, TokenId::from_raw(8));
        assert_eq!(info.area, "Chittagong-9");
        assert!(info.verified);
    }

    #[tokio::test]
    async fn malformed_output_is_an_error() {
        let nft = VoterNftContract::new(CannedProvider::new(vec![1, 2, 3]), Address::new([1; 20]));
        assert!(matches!(
            nft.is_token_verified(TokenId::from_raw(1).unwrap()).await,
            Err(ChainError::Abi(_))
        ));
    }

    #[tokio::test]
    async fn cast_vote_sends_encoded_call() {
        let provider = CannedProvider::new(vec![]);
        let voting = VotingSystemContract::new(provider.clone(), Address::new([3; 20]));
        voting
            .submit_cast_vote(
                Address::new([4; 20]),
                BlockchainElectionId::new(5),
                CandidateId::new(2).unwrap(),
            )
            .await
            .unwrap();
        let sent = provider.sent.lock().unwrap();
        let args = voting_system::cast_vote().decode_call(&sent[0]).unwrap();
        assert_eq!(args, vec![Token::Uint(5), Token::Uint(2)]);
    }

    #[tokio::test]
    async fn mint_calldata_roundtrips_voter_info() {
        let provider = CannedProvider::new(vec![]);
        let nft = VoterNftContract::new(provider.clone(), Address::new([3; 20]));
        let info = VoterInfoInput {
            name: "Rahim".into(),
            nid_number: "1234567890".into(),
            residential_area: "Dhaka-10".into(),
            ipfs_metadata_hash: "QmHash".into(),
            ..Default::default()
        };
        nft.submit_mint(Address::new([4; 20]), Address::new([5; 20]), &info)
            .await
            .unwrap();
        let sent = provider.sent.lock().unwrap();
        let mut args = voter_nft::mint_voter_nft().decode_call(&sent[0]).unwrap();
        let decoded = VoterInfoInput::from_token(args.remove(1)).unwrap();
        assert_eq!(decoded, info);
    }
}
