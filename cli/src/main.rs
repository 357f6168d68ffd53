//! nftvote: command line for NFT-gated cross-chain voting.

mod app;
mod config;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{Parser, Subcommand, ValueEnum};
use nftvote_election::{ElectionDraft, ElectionError, ElectionStatus};
use nftvote_kyc::{clean_name, validate_dob, validate_nid, KycError};
use nftvote_types::{Address, ChainKind, Clock, SystemClock, TxHash};
use nftvote_utils::{format_remaining, init_logging, LogFormat};
use nftvote_voting::{VoteError, VoteRecord};

use crate::app::App;
use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "nftvote", about = "NFT-gated cross-chain voting")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// flags and environment variables override them.
    #[arg(long, env = "NFTVOTE_CONFIG")]
    config: Option<PathBuf>,

    /// Chain to send transactions to: "BNB" or "ETH".
    #[arg(long, env = "NFTVOTE_CHAIN")]
    chain: Option<ChainKind>,

    /// Base URL of the REST mirror.
    #[arg(long, env = "NFTVOTE_BACKEND_URL")]
    backend_url: Option<String>,

    /// Bearer token for the REST mirror.
    #[arg(long, env = "NFTVOTE_BACKEND_TOKEN", hide_env_values = true)]
    backend_token: Option<String>,

    #[arg(long, env = "NFTVOTE_PINATA_JWT", hide_env_values = true)]
    pinata_jwt: Option<String>,

    /// Inconsistency journal file.
    #[arg(long, env = "NFTVOTE_JOURNAL")]
    journal: Option<PathBuf>,

    /// Log format: "human" or "json".
    #[arg(long, env = "NFTVOTE_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "NFTVOTE_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create and inspect elections.
    Election {
        #[command(subcommand)]
        action: ElectionAction,
    },
    /// Check whether an account may vote in an election.
    Eligibility {
        /// Off-chain election id.
        election: String,
        #[arg(long)]
        account: Option<Address>,
    },
    /// Cast a vote.
    Vote {
        /// Off-chain election id.
        election: String,
        /// Candidate ordinal as shown by `election show` (1-based).
        candidate: u64,
        #[arg(long)]
        from: Option<Address>,
    },
    /// Issue voter credentials.
    Kyc {
        #[command(subcommand)]
        action: KycAction,
    },
    /// Inspect and resolve ledger/mirror divergences.
    Journal {
        #[command(subcommand)]
        action: JournalAction,
    },
    /// Votes of the authenticated user, as recorded by the mirror.
    MyVotes,
    /// Retry the mirror write for a vote confirmed on chain.
    Remirror {
        /// Vote record as printed when mirroring failed.
        #[arg(long)]
        record: PathBuf,
    },
    /// Print the effective configuration.
    Config,
}

#[derive(Subcommand)]
enum ElectionAction {
    /// Create an election from a JSON or TOML draft.
    Create {
        draft: PathBuf,
        #[arg(long)]
        from: Option<Address>,
    },
    List {
        #[arg(long, value_enum)]
        status: Option<StatusFilter>,
    },
    Show {
        election: String,
    },
    /// Votes per originating chain, read from the ledger.
    Tally {
        election: String,
    },
}

#[derive(Subcommand)]
enum KycAction {
    /// Mint the credential for a pending request.
    Approve {
        request: String,
        #[arg(long)]
        from: Option<Address>,
    },
    /// Run identity extraction on an ID card image and check the result.
    Extract {
        image: PathBuf,
    },
    /// Record the approval for a credential minted in `tx`.
    Remirror {
        request: String,
        #[arg(long)]
        recipient: Address,
        #[arg(long)]
        tx: TxHash,
    },
}

#[derive(Subcommand)]
enum JournalAction {
    List {
        /// Include resolved entries.
        #[arg(long)]
        all: bool,
    },
    Resolve {
        id: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusFilter {
    Upcoming,
    Active,
    Completed,
    Cancelled,
}

impl From<StatusFilter> for ElectionStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Upcoming => Self::Upcoming,
            StatusFilter::Active => Self::Active,
            StatusFilter::Completed => Self::Completed,
            StatusFilter::Cancelled => Self::Cancelled,
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<CliConfig> {
    let mut config = match &cli.config {
        Some(path) => CliConfig::from_toml_file(path)?,
        None => CliConfig::default(),
    };
    if let Some(chain) = cli.chain {
        config.chain = chain;
    }
    if let Some(url) = &cli.backend_url {
        config.backend_url = url.clone();
    }
    if cli.backend_token.is_some() {
        config.backend_token = cli.backend_token.clone();
    }
    if cli.pinata_jwt.is_some() {
        config.pinata_jwt = cli.pinata_jwt.clone();
    }
    if let Some(journal) = &cli.journal {
        config.journal_path = journal.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    Ok(config)
}

fn load_draft(path: &Path) -> anyhow::Result<ElectionDraft> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read draft {}", path.display()))?;
    let draft: ElectionDraft = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&text)?,
        _ => serde_json::from_str(&text)?,
    };
    Ok(draft)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level);

    if let Command::Config = cli.command {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let app = App::new(config)?;
    let now = SystemClock.now();

    match cli.command {
        Command::Election { action } => election(&app, action).await?,
        Command::Eligibility { election, account } => {
            let election = app.elections().fetch(&election).await?;
            let voter = app.voter(account).await?;
            let check = app.caster().check_eligibility(&voter, &election, now).await;
            println!("{}", check.verdict);
        }
        Command::Vote {
            election,
            candidate,
            from,
        } => {
            let election = app.elections().fetch(&election).await?;
            let voter = app.voter(from).await?;
            let candidate = nftvote_types::CandidateId::new(candidate)?;
            match app.caster().cast_vote(&voter, &election, candidate, now).await {
                Ok(record) => {
                    println!("vote confirmed in tx {} (block {})", record.tx_hash, record.block_number);
                }
                Err(VoteError::Failed(failure)) => bail!(failure.user_message()),
                Err(VoteError::NotMirrored {
                    record,
                    inconsistency,
                    source,
                }) => {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                    bail!(
                        "vote is on chain but the mirror write failed ({source}); journal entry \
                         {inconsistency}. Save the record above and run `nftvote remirror --record <file>`"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Kyc { action } => kyc(&app, action).await?,
        Command::Journal { action } => {
            let journal = app.reconciler().journal();
            match action {
                JournalAction::List { all } => {
                    let entries = if all { journal.all() } else { journal.unresolved() };
                    for e in entries {
                        println!(
                            "#{} {} {} tx {} at {}{}: {}",
                            e.id,
                            e.kind,
                            e.chain,
                            e.tx_hash,
                            e.detected_at,
                            if e.resolved { " (resolved)" } else { "" },
                            e.detail
                        );
                    }
                }
                JournalAction::Resolve { id } => {
                    if !journal.resolve(id) {
                        bail!("no unresolved journal entry {id}");
                    }
                    println!("entry {id} resolved");
                }
            }
        }
        Command::MyVotes => {
            for vote in app.mirror().my_votes().await? {
                println!(
                    "{} {} -> {} ({}) on {} tx {} [{:?}]",
                    vote.timestamp,
                    vote.voting_title,
                    vote.candidate_name,
                    vote.candidate_party,
                    vote.chain_type,
                    vote.transaction_hash,
                    vote.status
                );
            }
        }
        Command::Remirror { record } => {
            let text = std::fs::read_to_string(&record)
                .with_context(|| format!("cannot read {}", record.display()))?;
            let record: VoteRecord = serde_json::from_str(&text)?;
            app.caster().remirror(&record).await?;
            println!("vote {} mirrored", record.tx_hash);
        }
        Command::Config => {}
    }
    Ok(())
}

async fn election(app: &App, action: ElectionAction) -> anyhow::Result<()> {
    let manager = app.elections();
    let now = SystemClock.now();
    match action {
        ElectionAction::Create { draft, from } => {
            let draft = load_draft(&draft)?;
            let admin = app.account(from).await?;
            match manager.create_election(admin, &draft, now).await {
                Ok(created) => {
                    println!("election {} created in tx {}", created.chain_id, created.creation_tx);
                    println!("status: {}", created.status);
                    if let Some(id) = &created.offchain_id {
                        println!("mirror id: {id}");
                    }
                    if let Some(entry) = created.inconsistency {
                        println!("needs reconciliation: journal entry {entry}");
                    }
                }
                Err(e @ ElectionError::Validation(_)) => bail!("draft rejected: {e}"),
                Err(e) => return Err(e.into()),
            }
        }
        ElectionAction::List { status } => {
            for election in manager.list(status.map(Into::into)).await? {
                println!(
                    "{:<24} {:<10} {:>6} votes  {}",
                    election.offchain_id.as_deref().unwrap_or("-"),
                    election.status(now),
                    election.total_votes,
                    election.title
                );
            }
        }
        ElectionAction::Show { election } => {
            let election = manager.fetch(&election).await?;
            let status = election.status(now);
            println!("{} [{}] on {}", election.title, status, election.chain);
            println!("chain id: {}", election.chain_id);
            println!("eligible areas: {}", election.eligible_areas.join(", "));
            match status {
                ElectionStatus::Upcoming => println!(
                    "starts in {}",
                    format_remaining(now.as_secs(), election.start.as_secs())
                ),
                ElectionStatus::Active => println!(
                    "{}",
                    format_remaining(now.as_secs(), election.end.as_secs())
                ),
                _ => {}
            }
            for c in &election.candidates {
                println!(
                    "  {}. {} ({}) {} votes [BNB {} / ETH {}]",
                    c.ordinal.get(),
                    c.name,
                    c.party,
                    c.vote_count,
                    c.votes_by_chain.bnb,
                    c.votes_by_chain.eth
                );
            }
        }
        ElectionAction::Tally { election } => {
            let election = manager.fetch(&election).await?;
            let Some(id) = election.blockchain_id() else {
                bail!("election has no on-chain id");
            };
            let tally = manager.chain_tally(id, &app.config.chains).await?;
            let (info, candidates) = manager.on_chain(id).await?;
            println!("{}: {} votes (BNB {} / ETH {})", info.title, tally.total(), tally.bnb, tally.eth);
            for c in candidates {
                println!("  {}. {} ({}) {}", c.id.get(), c.name, c.party, c.vote_count);
            }
        }
    }
    Ok(())
}

async fn kyc(app: &App, action: KycAction) -> anyhow::Result<()> {
    if let KycAction::Extract { image } = &action {
        return extract(app, image).await;
    }
    let issuer = app.issuer()?;
    match action {
        KycAction::Approve { request, from } => {
            let admin = app.account(from).await?;
            match issuer.approve_and_mint(admin, &request).await {
                Ok(minted) => {
                    let token = minted.token.map(|t| t.to_string()).unwrap_or_else(|| "?".into());
                    println!("credential {token} minted in tx {}", minted.tx);
                    println!("metadata: {}", minted.metadata.ipfs_uri());
                }
                Err(KycError::NotMirrored {
                    minted,
                    inconsistency,
                    source,
                }) => bail!(
                    "credential minted in tx {} but the approval was not recorded ({source}); \
                     journal entry {inconsistency}. Run `nftvote kyc remirror {} --recipient {} --tx {}`",
                    minted.tx,
                    minted.request_id,
                    minted.recipient,
                    minted.tx
                ),
                Err(e) => return Err(e.into()),
            }
        }
        KycAction::Remirror {
            request,
            recipient,
            tx,
        } => {
            issuer.remirror_approval(&request, recipient, tx).await?;
            println!("approval for {request} recorded");
        }
        KycAction::Extract { .. } => {}
    }
    Ok(())
}

async fn extract(app: &App, image: &Path) -> anyhow::Result<()> {
    let bytes =
        std::fs::read(image).with_context(|| format!("cannot read {}", image.display()))?;
    let result = app.extractor().extract_id(&STANDARD.encode(bytes)).await?;
    println!("status: {:?} (confidence {:.2})", result.extraction_status, result.confidence);
    println!("name: {}", clean_name(&result.name));
    println!("father: {}", result.father_name);
    println!("mother: {}", result.mother_name);

    let today = SystemClock.now().to_datetime().map(|d| d.date_naive());
    match today.map(|today| validate_dob(&result.date_of_birth, today)) {
        Some(Ok(born)) => println!("date of birth: {born}"),
        Some(Err(e)) => println!("date of birth: {} ({e})", result.date_of_birth),
        None => println!("date of birth: {}", result.date_of_birth),
    }
    match validate_nid(&result.id_number) {
        Ok(nid) => println!("NID: {nid}"),
        Err(e) => println!("NID: {} ({e})", result.id_number),
    }
    for error in &result.errors {
        println!("warning: {error}");
    }
    Ok(())
}
