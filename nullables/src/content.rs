//! Nullable content store: deterministic CIDs, nothing leaves memory.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use nftvote_crypto::keccak256_multi;
use nftvote_pinning::{ContentHash, ContentStore, PinningError};

const BASE58_ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

#[derive(Clone, Debug, PartialEq)]
pub enum Pinned {
    Json { name: String, content: serde_json::Value },
    File { name: String, bytes: Vec<u8> },
}

#[derive(Default)]
struct State {
    pins: Vec<(ContentHash, Pinned)>,
    fail_next: Option<PinningError>,
}

pub struct NullContentStore {
    state: Mutex<State>,
}

impl NullContentStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The next pin fails with `error`.
    pub fn fail_next(&self, error: PinningError) {
        self.state().fail_next = Some(error);
    }

    pub fn pins(&self) -> Vec<(ContentHash, Pinned)> {
        self.state().pins.clone()
    }

    /// CIDv0-shaped identifier derived from the content.
    pub fn cid_for(bytes: &[u8]) -> ContentHash {
        let first = keccak256_multi(&[b"cid".as_slice(), bytes]);
        let second = keccak256_multi(&[first.as_slice()]);
        let body: String = first
            .iter()
            .chain(second.iter())
            .take(44)
            .map(|b| BASE58_ALPHABET[(*b as usize) % 58] as char)
            .collect();
        format!("Qm{body}")
            .parse()
            .unwrap_or_else(|e| unreachable!("generated CID is well-formed: {e}"))
    }

    fn pin(&self, bytes: &[u8], pinned: Pinned) -> Result<ContentHash, PinningError> {
        let mut state = self.state();
        if let Some(err) = state.fail_next.take() {
            return Err(err);
        }
        let hash = Self::cid_for(bytes);
        state.pins.push((hash.clone(), pinned));
        Ok(hash)
    }
}

impl Default for NullContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for NullContentStore {
    async fn pin_json(
        &self,
        name: &str,
        content: &serde_json::Value,
    ) -> Result<ContentHash, PinningError> {
        let bytes = content.to_string().into_bytes();
        self.pin(
            &bytes,
            Pinned::Json {
                name: name.to_string(),
                content: content.clone(),
            },
        )
    }

    async fn pin_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<ContentHash, PinningError> {
        let hash_input = bytes.clone();
        self.pin(
            &hash_input,
            Pinned::File {
                name: file_name.to_string(),
                bytes,
            },
        )
    }
}
