//! Nullable chain: an in-memory ledger running both contracts.
//!
//! Calldata is decoded with the real ABI definitions and executed against a
//! small model of the deployed contracts, so flows exercise the same encode
//! and decode paths they use against a live node. Faults (wallet rejection,
//! reverts, failed receipts, read errors, missing events, slow mining) are
//! injected per test.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use nftvote_abi::contracts::{voter_nft, voting_system};
use nftvote_abi::{Function, Token};
use nftvote_chain::{ChainError, ChainProvider, Deployment, VoterInfoInput};
use nftvote_crypto::{keccak256, keccak256_multi};
use nftvote_types::{
    Address, BlockchainElectionId, ChainDescriptor, Clock, ContractAddresses, Log, ReceiptStatus,
    Timestamp, TokenId, TransactionReceipt, TxHash,
};

use crate::NullClock;

/// A transaction accepted by the nullable wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentTx {
    pub hash: TxHash,
    pub from: Address,
    pub to: Address,
    pub data: Vec<u8>,
}

impl SentTx {
    pub fn calls(&self, function: &Function) -> bool {
        function.is_call(&self.data)
    }
}

struct TokenRecord {
    owner: Address,
    area: String,
    verified: bool,
    registered_at: Timestamp,
    uri: String,
}

struct CandidateRecord {
    name: String,
    party: String,
    description: String,
    votes: u64,
}

struct ElectionRecord {
    title: String,
    description: String,
    start: Timestamp,
    end: Timestamp,
    areas: Vec<String>,
    creator: Address,
    candidates: Vec<CandidateRecord>,
    voted_tokens: HashSet<TokenId>,
    voted_addresses: HashSet<Address>,
    votes_by_chain: HashMap<u64, u64>,
}

#[derive(Default)]
struct Faults {
    reject_sends: usize,
    reject_at_attempt: Option<usize>,
    revert_next: Option<String>,
    fail_receipts: usize,
    failing_reads: HashMap<&'static str, ChainError>,
    all_reads: Option<ChainError>,
    omit_events: bool,
    pending_polls: u32,
    apply_when_mined: bool,
}

struct PendingReceipt {
    receipt: TransactionReceipt,
    polls_left: u32,
    /// Sent but not yet executed; runs when the receipt first appears.
    unmined: Option<SentTx>,
}

#[derive(Default)]
struct State {
    accounts: Vec<Address>,
    block: u64,
    tx_counter: u64,
    send_attempts: usize,
    holders: HashMap<Address, TokenId>,
    tokens: BTreeMap<TokenId, TokenRecord>,
    nids: HashSet<String>,
    elections: Vec<ElectionRecord>,
    receipts: HashMap<TxHash, PendingReceipt>,
    sent: Vec<SentTx>,
    faults: Faults,
}

/// Outcome of executing a transaction: emitted logs or a revert reason.
type Execution = Result<Vec<Log>, String>;

pub struct NullChain {
    descriptor: ChainDescriptor,
    deployment: Deployment,
    clock: Arc<NullClock>,
    state: Mutex<State>,
}

impl NullChain {
    /// A chain for `descriptor`. Missing contract addresses are filled with
    /// fixed test addresses so the chain is always deployed.
    pub fn new(mut descriptor: ChainDescriptor, clock: Arc<NullClock>) -> Self {
        let voter_nft = descriptor
            .contracts
            .voter_nft
            .unwrap_or(Address::new([0x4d; 20]));
        let voting_system = descriptor
            .contracts
            .voting_system
            .unwrap_or(Address::new([0xdb; 20]));
        descriptor.contracts = ContractAddresses {
            voter_nft: Some(voter_nft),
            voting_system: Some(voting_system),
        };
        Self {
            descriptor,
            deployment: Deployment {
                voter_nft,
                voting_system,
            },
            clock,
            state: Mutex::new(State::default()),
        }
    }

    /// BSC testnet descriptor with its own clock.
    pub fn bsc() -> Self {
        Self::new(ChainDescriptor::bsc_testnet(), Arc::new(NullClock::default()))
    }

    pub fn bsc_with_clock(clock: Arc<NullClock>) -> Self {
        Self::new(ChainDescriptor::bsc_testnet(), clock)
    }

    /// Sepolia descriptor with test contract addresses.
    pub fn sepolia_with_clock(clock: Arc<NullClock>) -> Self {
        Self::new(ChainDescriptor::sepolia(), clock)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn deployment(&self) -> Deployment {
        self.deployment
    }

    pub fn clock(&self) -> Arc<NullClock> {
        self.clock.clone()
    }

    // --- wallet ---

    /// Connect a wallet exposing `accounts`.
    pub fn connect(&self, accounts: &[Address]) {
        self.state().accounts = accounts.to_vec();
    }

    pub fn disconnect(&self) {
        self.state().accounts.clear();
    }

    // --- seeding ---

    /// Mint a credential directly, without a transaction.
    pub fn register_voter(&self, holder: Address, area: &str, verified: bool) -> TokenId {
        let now = self.clock.now();
        let mut state = self.state();
        let token = next_token_id(&state);
        state.holders.insert(holder, token);
        state.tokens.insert(
            token,
            TokenRecord {
                owner: holder,
                area: area.to_string(),
                verified,
                registered_at: now,
                uri: String::new(),
            },
        );
        token
    }

    pub fn set_verified(&self, token: TokenId, verified: bool) {
        if let Some(record) = self.state().tokens.get_mut(&token) {
            record.verified = verified;
        }
    }

    /// Move a credential to another holder.
    pub fn transfer(&self, token: TokenId, to: Address) {
        let mut state = self.state();
        let Some(previous) = state.tokens.get(&token).map(|r| r.owner) else {
            return;
        };
        state.holders.remove(&previous);
        state.holders.insert(to, token);
        if let Some(record) = state.tokens.get_mut(&token) {
            record.owner = to;
        }
    }

    pub fn register_nid(&self, nid: &str) {
        self.state().nids.insert(nid.to_string());
    }

    /// Create an election with candidates directly, without transactions.
    pub fn seed_election(
        &self,
        title: &str,
        start: Timestamp,
        end: Timestamp,
        areas: &[&str],
        candidates: &[&str],
    ) -> BlockchainElectionId {
        let mut state = self.state();
        state.elections.push(ElectionRecord {
            title: title.to_string(),
            description: String::new(),
            start,
            end,
            areas: areas.iter().map(|a| a.to_string()).collect(),
            creator: Address::ZERO,
            candidates: candidates
                .iter()
                .map(|name| CandidateRecord {
                    name: name.to_string(),
                    party: String::new(),
                    description: String::new(),
                    votes: 0,
                })
                .collect(),
            voted_tokens: HashSet::new(),
            voted_addresses: HashSet::new(),
            votes_by_chain: HashMap::new(),
        });
        BlockchainElectionId::new(state.elections.len() as u64)
    }

    /// Record a vote as if cast by another client on this ledger.
    pub fn mark_voted(&self, election: BlockchainElectionId, token: TokenId) {
        let chain_id = self.descriptor.chain_id;
        let mut state = self.state();
        if let Some(record) = election_mut(&mut state, election) {
            record.voted_tokens.insert(token);
            *record.votes_by_chain.entry(chain_id).or_default() += 1;
        }
    }

    // --- faults ---

    /// The wallet owner declines the next `n` signature requests.
    pub fn reject_next_sends(&self, n: usize) {
        self.state().faults.reject_sends = n;
    }

    /// Let `skip` signature requests through, then reject the one after.
    pub fn reject_send_after(&self, skip: usize) {
        let mut state = self.state();
        state.faults.reject_at_attempt = Some(state.send_attempts + skip + 1);
    }

    /// The next send fails gas estimation with `reason`.
    pub fn revert_next_send(&self, reason: &str) {
        self.state().faults.revert_next = Some(reason.to_string());
    }

    /// The next `n` transactions are mined with a failed status.
    pub fn fail_next_receipts(&self, n: usize) {
        self.state().faults.fail_receipts = n;
    }

    /// Every read fails with `error` until [`NullChain::restore_reads`].
    pub fn fail_reads(&self, error: ChainError) {
        self.state().faults.all_reads = Some(error);
    }

    /// Reads of the contract function `name` fail with `error`.
    pub fn fail_read(&self, name: &'static str, error: ChainError) {
        self.state().faults.failing_reads.insert(name, error);
    }

    pub fn restore_reads(&self) {
        let mut state = self.state();
        state.faults.all_reads = None;
        state.faults.failing_reads.clear();
    }

    /// Mined receipts carry no logs.
    pub fn omit_events(&self, omit: bool) {
        self.state().faults.omit_events = omit;
    }

    /// Execute transactions when their receipt first appears instead of when
    /// they are sent. Until then reads see the old state, and a rule the
    /// transaction breaks at that point mines it with a failed status.
    pub fn apply_when_mined(&self, enabled: bool) {
        self.state().faults.apply_when_mined = enabled;
    }

    /// Receipts stay pending for `polls` queries before appearing.
    pub fn delay_receipts(&self, polls: u32) {
        self.state().faults.pending_polls = polls;
    }

    // --- inspection ---

    /// Transactions the wallet signed and broadcast, in order.
    pub fn sent(&self) -> Vec<SentTx> {
        self.state().sent.clone()
    }

    pub fn sent_calls(&self, function: &Function) -> usize {
        self.state().sent.iter().filter(|tx| tx.calls(function)).count()
    }

    /// Signature requests made, including rejected and reverted ones.
    pub fn send_attempts(&self) -> usize {
        self.state().send_attempts
    }

    pub fn token_of(&self, holder: Address) -> Option<TokenId> {
        self.state().holders.get(&holder).copied()
    }

    pub fn token_uri_of(&self, token: TokenId) -> Option<String> {
        self.state().tokens.get(&token).map(|r| r.uri.clone())
    }

    pub fn election_count(&self) -> u64 {
        self.state().elections.len() as u64
    }

    /// Candidate names of an election in ordinal order.
    pub fn candidates(&self, election: BlockchainElectionId) -> Vec<String> {
        let state = self.state();
        election_ref(&state, election)
            .map(|e| e.candidates.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn candidate_votes(&self, election: BlockchainElectionId, ordinal: u64) -> u64 {
        let state = self.state();
        election_ref(&state, election)
            .and_then(|e| e.candidates.get(ordinal.checked_sub(1)? as usize))
            .map(|c| c.votes)
            .unwrap_or(0)
    }

    // --- execution ---

    fn next_hash(state: &mut State) -> TxHash {
        state.tx_counter += 1;
        TxHash::new(keccak256(&state.tx_counter.to_be_bytes()))
    }

    fn execute(&self, state: &mut State, from: Address, to: Address, data: &[u8]) -> Execution {
        if to == self.deployment.voting_system {
            self.execute_voting(state, from, data)
        } else if to == self.deployment.voter_nft {
            self.execute_nft(state, data)
        } else {
            Err(format!("no contract at {to}"))
        }
    }

    fn execute_voting(&self, state: &mut State, from: Address, data: &[u8]) -> Execution {
        let now = self.clock.now();
        let emitter = self.deployment.voting_system;

        let create = voting_system::create_election();
        if create.is_call(data) {
            let mut args = decode(&create, data)?.into_iter();
            let title = string_arg(&mut args)?;
            let description = string_arg(&mut args)?;
            let start = Timestamp::new(u64_arg(&mut args)?);
            let end = Timestamp::new(u64_arg(&mut args)?);
            let areas = args
                .next()
                .ok_or("missing areas")?
                .into_array()
                .map_err(|e| e.to_string())?
                .into_iter()
                .map(|t| t.into_string().map_err(|e| e.to_string()))
                .collect::<Result<Vec<_>, _>>()?;
            if end <= start {
                return Err("Invalid time range".into());
            }
            state.elections.push(ElectionRecord {
                title: title.clone(),
                description,
                start,
                end,
                areas,
                creator: from,
                candidates: Vec::new(),
                voted_tokens: HashSet::new(),
                voted_addresses: HashSet::new(),
                votes_by_chain: HashMap::new(),
            });
            let id = state.elections.len() as u64;
            let log = voting_system::election_created()
                .encode_log(
                    emitter,
                    &[
                        Token::uint(id),
                        Token::String(title),
                        Token::uint(start.as_secs()),
                        Token::uint(end.as_secs()),
                        Token::Address(from),
                    ],
                )
                .map_err(|e| e.to_string())?;
            return Ok(vec![log]);
        }

        let add = voting_system::add_candidate();
        if add.is_call(data) {
            let mut args = decode(&add, data)?.into_iter();
            let election = BlockchainElectionId::new(u64_arg(&mut args)?);
            let name = string_arg(&mut args)?;
            let party = string_arg(&mut args)?;
            let description = string_arg(&mut args)?;
            let record = election_mut(state, election).ok_or("Election does not exist")?;
            record.candidates.push(CandidateRecord {
                name,
                party,
                description,
                votes: 0,
            });
            return Ok(vec![]);
        }

        let cast = voting_system::cast_vote();
        if cast.is_call(data) {
            let mut args = decode(&cast, data)?.into_iter();
            let election = BlockchainElectionId::new(u64_arg(&mut args)?);
            let candidate = u64_arg(&mut args)?;
            let chain_id = self.descriptor.chain_id;

            let token = state.holders.get(&from).copied();
            let token_record = token.and_then(|t| state.tokens.get(&t));
            let verified = token_record.map(|r| r.verified).unwrap_or(false);
            let area = token_record.map(|r| r.area.to_lowercase()).unwrap_or_default();

            let record = election_mut(state, election).ok_or("Election does not exist")?;
            if now < record.start {
                return Err("ElectionNotActive".into());
            }
            if now >= record.end {
                return Err("ElectionEnded".into());
            }
            let token = token.ok_or("NotTokenOwner")?;
            if !verified {
                return Err("NotVerifiedVoter".into());
            }
            if !record.areas.iter().any(|a| a.to_lowercase() == area) {
                return Err("NotEligibleArea".into());
            }
            if record.voted_tokens.contains(&token) {
                return Err("AlreadyVoted".into());
            }
            let slot = candidate
                .checked_sub(1)
                .and_then(|i| record.candidates.get_mut(i as usize))
                .ok_or("Invalid candidate")?;
            slot.votes += 1;
            record.voted_tokens.insert(token);
            record.voted_addresses.insert(from);
            *record.votes_by_chain.entry(chain_id).or_default() += 1;

            let vote_hash = keccak256_multi(&[
                &election.get().to_be_bytes(),
                &candidate.to_be_bytes(),
                from.as_bytes(),
                &now.as_secs().to_be_bytes(),
            ]);
            let log = voting_system::vote_cast()
                .encode_log(
                    emitter,
                    &[
                        Token::uint(election.get()),
                        Token::uint(candidate),
                        Token::Address(from),
                        Token::uint(chain_id),
                        Token::word(vote_hash),
                        Token::uint(now.as_secs()),
                    ],
                )
                .map_err(|e| e.to_string())?;
            return Ok(vec![log]);
        }

        Err("unknown function selector".into())
    }

    fn execute_nft(&self, state: &mut State, data: &[u8]) -> Execution {
        let mint = voter_nft::mint_voter_nft();
        if !mint.is_call(data) {
            return Err("unknown function selector".into());
        }
        let mut args = decode(&mint, data)?.into_iter();
        let to = args
            .next()
            .ok_or("missing recipient")?
            .into_address()
            .map_err(|e| e.to_string())?;
        let info = VoterInfoInput::from_token(args.next().ok_or("missing voter info")?)
            .map_err(|e| e.to_string())?;

        if state.holders.contains_key(&to) {
            return Err("AlreadyHasNFT".into());
        }
        if state.nids.contains(&info.nid_number) {
            return Err("NIDAlreadyRegistered".into());
        }

        let now = self.clock.now();
        let token = next_token_id(state);
        state.holders.insert(to, token);
        state.nids.insert(info.nid_number.clone());
        state.tokens.insert(
            token,
            TokenRecord {
                owner: to,
                area: info.residential_area.clone(),
                verified: true,
                registered_at: now,
                uri: format!("ipfs://{}", info.ipfs_metadata_hash),
            },
        );
        let data_hash = keccak256_multi(&[
            info.name.as_bytes(),
            info.father_name.as_bytes(),
            info.mother_name.as_bytes(),
            info.date_of_birth.as_bytes(),
            info.nid_number.as_bytes(),
        ]);
        let log = voter_nft::voter_registered()
            .encode_log(
                self.deployment.voter_nft,
                &[
                    Token::uint(token.get()),
                    Token::Address(to),
                    Token::String(info.residential_area),
                    Token::word(data_hash),
                    Token::uint(now.as_secs()),
                ],
            )
            .map_err(|e| e.to_string())?;
        Ok(vec![log])
    }

    fn read(&self, state: &State, to: Address, data: &[u8]) -> Result<Vec<u8>, ChainError> {
        let reads = if to == self.deployment.voter_nft {
            vec![
                voter_nft::get_owned_token_id(),
                voter_nft::is_token_verified(),
                voter_nft::get_voter_info(),
                voter_nft::is_nid_registered(),
                voter_nft::total_registered_voters(),
                voter_nft::token_uri(),
            ]
        } else if to == self.deployment.voting_system {
            vec![
                voting_system::has_nft_voted(),
                voting_system::has_voter_voted(),
                voting_system::get_votes_by_chain(),
                voting_system::get_election_count(),
                voting_system::get_election_info(),
                voting_system::get_election_candidates(),
            ]
        } else {
            return Err(ChainError::InvalidResponse(format!("no contract at {to}")));
        };
        let function = reads
            .into_iter()
            .find(|f| f.is_call(data))
            .ok_or_else(|| ChainError::Reverted("unknown function selector".into()))?;

        if let Some(err) = &state.faults.all_reads {
            return Err(err.clone());
        }
        if let Some(err) = state.faults.failing_reads.get(function.name) {
            return Err(err.clone());
        }

        let mut args = function.decode_call(data)?.into_iter();
        let output = self
            .answer(state, function.name, &mut args)
            .map_err(ChainError::Reverted)?;
        Ok(function.encode_output(&output)?)
    }

    fn answer(
        &self,
        state: &State,
        name: &str,
        args: &mut impl Iterator<Item = Token>,
    ) -> Result<Vec<Token>, String> {
        let out = match name {
            "getOwnedTokenId" => {
                let holder = address_arg(args)?;
                let token = state.holders.get(&holder).map(|t| t.get()).unwrap_or(0);
                vec![Token::uint(token)]
            }
            "isTokenVerified" => {
                let token = TokenId::from_raw(u64_arg(args)?);
                let verified = token
                    .and_then(|t| state.tokens.get(&t))
                    .map(|r| r.verified)
                    .unwrap_or(false);
                vec![Token::Bool(verified)]
            }
            "getVoterInfo" => {
                let holder = address_arg(args)?;
                match state.holders.get(&holder).and_then(|t| Some((*t, state.tokens.get(t)?))) {
                    Some((token, r)) => vec![
                        Token::uint(token.get()),
                        Token::String(r.area.clone()),
                        Token::Bool(r.verified),
                        Token::uint(r.registered_at.as_secs()),
                    ],
                    None => vec![
                        Token::uint(0u64),
                        Token::string(""),
                        Token::Bool(false),
                        Token::uint(0u64),
                    ],
                }
            }
            "isNIDRegistered" => {
                let nid = string_arg(args)?;
                vec![Token::Bool(state.nids.contains(&nid))]
            }
            "totalRegisteredVoters" => vec![Token::uint(state.tokens.len() as u64)],
            "tokenURI" => {
                let token = TokenId::from_raw(u64_arg(args)?)
                    .and_then(|t| state.tokens.get(&t))
                    .ok_or("ERC721: invalid token ID")?;
                vec![Token::String(token.uri.clone())]
            }
            "hasNFTVoted" => {
                let election = BlockchainElectionId::new(u64_arg(args)?);
                let token = TokenId::from_raw(u64_arg(args)?);
                let voted = election_ref(state, election)
                    .zip(token)
                    .map(|(e, t)| e.voted_tokens.contains(&t))
                    .unwrap_or(false);
                vec![Token::Bool(voted)]
            }
            "hasVoterVoted" => {
                let election = BlockchainElectionId::new(u64_arg(args)?);
                let voter = address_arg(args)?;
                let voted = election_ref(state, election)
                    .map(|e| e.voted_addresses.contains(&voter))
                    .unwrap_or(false);
                vec![Token::Bool(voted)]
            }
            "getVotesByChain" => {
                let election = BlockchainElectionId::new(u64_arg(args)?);
                let chain_id = u64_arg(args)?;
                let votes = election_ref(state, election)
                    .and_then(|e| e.votes_by_chain.get(&chain_id).copied())
                    .unwrap_or(0);
                vec![Token::uint(votes)]
            }
            "getElectionCount" => vec![Token::uint(state.elections.len() as u64)],
            "getElectionInfo" => {
                let id = u64_arg(args)?;
                let e = election_ref(state, BlockchainElectionId::new(id))
                    .ok_or("Election does not exist")?;
                let now = self.clock.now();
                let total: u64 = e.candidates.iter().map(|c| c.votes).sum();
                vec![Token::Tuple(vec![
                    Token::uint(id),
                    Token::String(e.title.clone()),
                    Token::String(e.description.clone()),
                    Token::uint(e.start.as_secs()),
                    Token::uint(e.end.as_secs()),
                    Token::Array(e.areas.iter().cloned().map(Token::String).collect()),
                    Token::uint(e.candidates.len() as u64),
                    Token::uint(total),
                    Token::Bool(now >= e.start && now < e.end),
                    Token::Bool(false),
                    Token::Address(e.creator),
                ])]
            }
            "getElectionCandidates" => {
                let id = u64_arg(args)?;
                let e = election_ref(state, BlockchainElectionId::new(id))
                    .ok_or("Election does not exist")?;
                vec![Token::Array(
                    e.candidates
                        .iter()
                        .enumerate()
                        .map(|(i, c)| {
                            Token::Tuple(vec![
                                Token::uint(i as u64 + 1),
                                Token::String(c.name.clone()),
                                Token::String(c.party.clone()),
                                Token::String(c.description.clone()),
                                Token::uint(c.votes),
                            ])
                        })
                        .collect(),
                )]
            }
            other => return Err(format!("unsupported read {other}")),
        };
        Ok(out)
    }
}

fn next_token_id(state: &State) -> TokenId {
    let next = state.tokens.keys().next_back().map(|t| t.get()).unwrap_or(0) + 1;
    TokenId::from_raw(next).unwrap_or_else(|| unreachable!("next token id is at least 1"))
}

fn election_ref(state: &State, id: BlockchainElectionId) -> Option<&ElectionRecord> {
    state.elections.get((id.get() as usize).checked_sub(1)?)
}

fn election_mut(state: &mut State, id: BlockchainElectionId) -> Option<&mut ElectionRecord> {
    state.elections.get_mut((id.get() as usize).checked_sub(1)?)
}

fn decode(function: &Function, data: &[u8]) -> Result<Vec<Token>, String> {
    function.decode_call(data).map_err(|e| e.to_string())
}

fn u64_arg(args: &mut impl Iterator<Item = Token>) -> Result<u64, String> {
    args.next()
        .ok_or("missing argument")?
        .into_u64()
        .map_err(|e| e.to_string())
}

fn string_arg(args: &mut impl Iterator<Item = Token>) -> Result<String, String> {
    args.next()
        .ok_or("missing argument")?
        .into_string()
        .map_err(|e| e.to_string())
}

fn address_arg(args: &mut impl Iterator<Item = Token>) -> Result<Address, String> {
    args.next()
        .ok_or("missing argument")?
        .into_address()
        .map_err(|e| e.to_string())
}

#[async_trait]
impl ChainProvider for NullChain {
    fn descriptor(&self) -> &ChainDescriptor {
        &self.descriptor
    }

    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        Ok(self.state().accounts.clone())
    }

    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, ChainError> {
        let state = self.state();
        self.read(&state, to, &data)
    }

    async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        data: Vec<u8>,
    ) -> Result<TxHash, ChainError> {
        let mut state = self.state();
        state.send_attempts += 1;

        if state.faults.reject_sends > 0 {
            state.faults.reject_sends -= 1;
            return Err(ChainError::UserRejected);
        }
        if state.faults.reject_at_attempt == Some(state.send_attempts) {
            state.faults.reject_at_attempt = None;
            return Err(ChainError::UserRejected);
        }
        if let Some(reason) = state.faults.revert_next.take() {
            return Err(ChainError::Reverted(reason));
        }

        let mined_failed = state.faults.fail_receipts > 0;
        let deferred = !mined_failed && state.faults.apply_when_mined;
        let (status, logs) = if mined_failed {
            state.faults.fail_receipts -= 1;
            (ReceiptStatus::Failed, Vec::new())
        } else if deferred {
            (ReceiptStatus::Success, Vec::new())
        } else {
            let logs = self
                .execute(&mut state, from, to, &data)
                .map_err(ChainError::Reverted)?;
            (ReceiptStatus::Success, logs)
        };

        let hash = Self::next_hash(&mut state);
        state.block += 1;
        let logs = if state.faults.omit_events { Vec::new() } else { logs };
        let receipt = TransactionReceipt {
            tx_hash: hash,
            block_number: state.block,
            status,
            logs,
        };
        let polls_left = state.faults.pending_polls;
        let sent = SentTx { hash, from, to, data };
        state.receipts.insert(
            hash,
            PendingReceipt {
                receipt,
                polls_left,
                unmined: deferred.then(|| sent.clone()),
            },
        );
        state.sent.push(sent);
        Ok(hash)
    }

    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<TransactionReceipt>, ChainError> {
        let mut state = self.state();
        let unmined = match state.receipts.get_mut(&hash) {
            Some(pending) if pending.polls_left > 0 => {
                pending.polls_left -= 1;
                return Ok(None);
            }
            Some(pending) => pending.unmined.take(),
            None => return Ok(None),
        };

        if let Some(tx) = unmined {
            let (status, logs) = match self.execute(&mut state, tx.from, tx.to, &tx.data) {
                Ok(logs) if !state.faults.omit_events => (ReceiptStatus::Success, logs),
                Ok(_) => (ReceiptStatus::Success, Vec::new()),
                Err(_) => (ReceiptStatus::Failed, Vec::new()),
            };
            state.block += 1;
            let block_number = state.block;
            if let Some(pending) = state.receipts.get_mut(&hash) {
                pending.receipt.status = status;
                pending.receipt.logs = logs;
                pending.receipt.block_number = block_number;
            }
        }
        Ok(state.receipts.get(&hash).map(|p| p.receipt.clone()))
    }
}
