//! Command line configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use nftvote_types::{Address, ChainDescriptor, ChainKind};
use nftvote_utils::LogFormat;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("no chain configured for {0}")]
    UnknownChain(ChainKind),
}

/// Settings shared by every subcommand.
///
/// Loaded from a TOML file via [`CliConfig::from_toml_file`]; command line
/// flags and `NFTVOTE_*` variables override individual fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Chain that transactions are sent to.
    #[serde(default = "default_chain")]
    pub chain: ChainKind,

    /// Base URL of the REST mirror.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Bearer token for the REST mirror.
    #[serde(default)]
    pub backend_token: Option<String>,

    /// Pinata JWT. Credential issuance is unavailable without it.
    #[serde(default)]
    pub pinata_jwt: Option<String>,

    /// Accounts treated as administrators; they may not vote.
    #[serde(default)]
    pub admin_accounts: Vec<Address>,

    /// `external_url` written into credential metadata.
    #[serde(default = "default_external_url")]
    pub metadata_external_url: String,

    /// JSON-lines file of ledger/mirror divergences.
    #[serde(default = "default_journal_path")]
    pub journal_path: PathBuf,

    /// Receipt polling interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Cache credential lookups for the life of the process.
    #[serde(default = "default_true")]
    pub cache_credentials: bool,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Every chain the deployment knows about. Tallies read all of them.
    #[serde(default = "ChainDescriptor::defaults")]
    pub chains: Vec<ChainDescriptor>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_chain() -> ChainKind {
    ChainKind::Bnb
}

fn default_backend_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_external_url() -> String {
    nftvote_kyc::metadata::DEFAULT_EXTERNAL_URL.to_string()
}

fn default_journal_path() -> PathBuf {
    PathBuf::from("./nftvote_journal.jsonl")
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl CliConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Descriptor of the chain transactions go to.
    pub fn active_chain(&self) -> Result<&ChainDescriptor, ConfigError> {
        self.chains
            .iter()
            .find(|c| c.kind == self.chain)
            .ok_or(ConfigError::UnknownChain(self.chain))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn is_admin(&self, account: Address) -> bool {
        self.admin_accounts.contains(&account)
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            chain: default_chain(),
            chains: ChainDescriptor::defaults(),
            backend_url: default_backend_url(),
            backend_token: None,
            pinata_jwt: None,
            admin_accounts: Vec::new(),
            metadata_external_url: default_external_url(),
            journal_path: default_journal_path(),
            poll_interval_ms: default_poll_interval_ms(),
            cache_credentials: default_true(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = CliConfig::default();
        let text = config.to_toml_string().unwrap();
        let parsed = CliConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = CliConfig::from_toml_str("").unwrap();
        assert_eq!(config.chain, ChainKind::Bnb);
        assert_eq!(config.chains.len(), 2);
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.active_chain().unwrap().chain_id, 97);
    }

    #[test]
    fn partial_toml_overrides() {
        let config = CliConfig::from_toml_str(
            r#"
            chain = "ETH"
            backend_url = "https://api.example.org"
            log_format = "json"
            admin_accounts = ["0x00000000000000000000000000000000000000aa"]
            "#,
        )
        .unwrap();
        assert_eq!(config.chain, ChainKind::Eth);
        assert_eq!(config.backend_url, "https://api.example.org");
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.is_admin("0x00000000000000000000000000000000000000aa".parse().unwrap()));
        assert_eq!(config.active_chain().unwrap().name, "Sepolia");
    }

    #[test]
    fn unknown_active_chain_is_an_error() {
        let config = CliConfig {
            chain: ChainKind::Eth,
            chains: vec![ChainDescriptor::bsc_testnet()],
            ..CliConfig::default()
        };
        assert!(matches!(
            config.active_chain(),
            Err(ConfigError::UnknownChain(ChainKind::Eth))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "poll_interval_ms = 250\npinata_jwt = \"jwt\"").unwrap();
        let config = CliConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.pinata_jwt.as_deref(), Some("jwt"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = CliConfig::from_toml_file(Path::new("/nonexistent/nftvote.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
