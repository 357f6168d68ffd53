//! Face photos as submitted with a KYC request.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use nftvote_pinning::ContentHash;

use crate::KycError;

/// Where the photo bytes come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhotoSource {
    /// Inline `data:<mime>;base64,<payload>` content, still to be pinned.
    Inline { mime: String, bytes: Vec<u8> },
    /// Already pinned.
    Pinned(ContentHash),
}

impl PhotoSource {
    pub fn parse(raw: &str) -> Result<Self, KycError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(KycError::Photo("request has no face photo".into()));
        }
        if let Some(rest) = raw.strip_prefix("data:") {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| KycError::Photo("data URL has no payload".into()))?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or_else(|| KycError::Photo("data URL is not base64 encoded".into()))?;
            let bytes = STANDARD
                .decode(payload.trim())
                .map_err(|e| KycError::Photo(format!("invalid base64 payload: {e}")))?;
            if bytes.is_empty() {
                return Err(KycError::Photo("empty photo".into()));
            }
            return Ok(Self::Inline {
                mime: mime.to_string(),
                bytes,
            });
        }
        raw.parse::<ContentHash>()
            .map(Self::Pinned)
            .map_err(|_| KycError::Photo(format!("unsupported photo source: {}", preview(raw))))
    }

    /// File name used when pinning, e.g. `voter-photo.jpg`.
    pub fn file_name(&self) -> String {
        let ext = match self {
            Self::Inline { mime, .. } => match mime.as_str() {
                "image/png" => "png",
                "image/webp" => "webp",
                _ => "jpg",
            },
            Self::Pinned(_) => "jpg",
        };
        format!("voter-photo.{ext}")
    }
}

fn preview(raw: &str) -> String {
    let head: String = raw.chars().take(32).collect();
    if head.len() < raw.len() {
        format!("{head}…")
    } else {
        head
    }
}
