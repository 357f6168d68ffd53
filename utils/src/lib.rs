//! Shared utilities for nftvote.

pub mod logging;
pub mod spans;
pub mod time;

pub use logging::{init_logging, LogFormat, UnknownLogFormat};
pub use spans::{election_create_span, mint_span, remirror_span, vote_cast_span};
pub use time::{format_duration, format_remaining};
