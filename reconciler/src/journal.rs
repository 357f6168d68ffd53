//! Append-only record of ledger/mirror divergences.
//!
//! Entries are kept in memory and, when a path is configured, appended to a
//! JSON-lines file. Resolving an entry appends a new line with
//! `resolved: true`; on load the last line for an id wins.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use nftvote_types::{ChainKind, Timestamp, TxHash};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::JournalError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InconsistencyKind {
    /// Election and candidates confirmed, mirror write failed.
    ElectionMirror,
    /// Vote confirmed, mirror write failed.
    VoteMirror,
    /// Credential minted, approval write failed.
    MintMirror,
    /// Election transaction confirmed without a decodable `ElectionCreated` event.
    ElectionIdUnresolved,
}

impl InconsistencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ElectionMirror => "election-mirror",
            Self::VoteMirror => "vote-mirror",
            Self::MintMirror => "mint-mirror",
            Self::ElectionIdUnresolved => "election-id-unresolved",
        }
    }
}

impl std::fmt::Display for InconsistencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inconsistency {
    pub id: u64,
    pub kind: InconsistencyKind,
    pub chain: ChainKind,
    pub tx_hash: TxHash,
    pub detail: String,
    pub detected_at: Timestamp,
    #[serde(default)]
    pub resolved: bool,
}

pub struct InconsistencyJournal {
    entries: Mutex<Vec<Inconsistency>>,
    path: Option<PathBuf>,
}

impl InconsistencyJournal {
    /// In-memory journal.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            path: None,
        }
    }

    /// Journal persisted at `path`, loading any entries already there.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            Self::load(&path)?
        } else {
            Vec::new()
        };
        info!(path = %path.display(), entries = entries.len(), "opened inconsistency journal");
        Ok(Self {
            entries: Mutex::new(entries),
            path: Some(path),
        })
    }

    fn load(path: &Path) -> Result<Vec<Inconsistency>, JournalError> {
        let reader = BufReader::new(File::open(path)?);
        let mut entries: Vec<Inconsistency> = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: Inconsistency =
                serde_json::from_str(&line).map_err(|e| JournalError::Corrupt {
                    line: index + 1,
                    detail: e.to_string(),
                })?;
            match entries.iter_mut().find(|e| e.id == entry.id) {
                Some(existing) => *existing = entry,
                None => entries.push(entry),
            }
        }
        Ok(entries)
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Inconsistency>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The in-memory entry is authoritative; a failed file append is logged.
    fn append(&self, entry: &Inconsistency) {
        let Some(path) = &self.path else {
            return;
        };
        let result = serde_json::to_string(entry)
            .map_err(std::io::Error::other)
            .and_then(|line| {
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                writeln!(file, "{line}")
            });
        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "failed to persist journal entry");
        }
    }

    pub fn record(
        &self,
        kind: InconsistencyKind,
        chain: ChainKind,
        tx_hash: TxHash,
        detail: impl Into<String>,
        detected_at: Timestamp,
    ) -> Inconsistency {
        let entry = {
            let mut entries = self.entries();
            let id = entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
            let entry = Inconsistency {
                id,
                kind,
                chain,
                tx_hash,
                detail: detail.into(),
                detected_at,
                resolved: false,
            };
            entries.push(entry.clone());
            entry
        };
        error!(
            id = entry.id,
            kind = %entry.kind,
            chain = %entry.chain,
            tx = %entry.tx_hash,
            detail = %entry.detail,
            "ledger and mirror diverged"
        );
        self.append(&entry);
        entry
    }

    /// Mark an entry resolved. Returns false for unknown or already resolved ids.
    pub fn resolve(&self, id: u64) -> bool {
        let resolved = {
            let mut entries = self.entries();
            match entries.iter_mut().find(|e| e.id == id && !e.resolved) {
                Some(entry) => {
                    entry.resolved = true;
                    entry.clone()
                }
                None => return false,
            }
        };
        info!(id, kind = %resolved.kind, tx = %resolved.tx_hash, "inconsistency resolved");
        self.append(&resolved);
        true
    }

    pub fn all(&self) -> Vec<Inconsistency> {
        self.entries().clone()
    }

    pub fn unresolved(&self) -> Vec<Inconsistency> {
        self.entries().iter().filter(|e| !e.resolved).cloned().collect()
    }

    pub fn get(&self, id: u64) -> Option<Inconsistency> {
        self.entries().iter().find(|e| e.id == id).cloned()
    }

    /// Open entry of `kind` for `tx_hash`, if any.
    pub fn find_unresolved(&self, kind: InconsistencyKind, tx_hash: TxHash) -> Option<Inconsistency> {
        self.entries()
            .iter()
            .find(|e| !e.resolved && e.kind == kind && e.tx_hash == tx_hash)
            .cloned()
    }
}

impl Default for InconsistencyJournal {
    fn default() -> Self {
        Self::new()
    }
}
