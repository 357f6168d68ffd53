//! Timestamp type and clock abstraction.
//!
//! Timestamps are Unix epoch seconds (UTC), matching the `uint256` times the
//! voting contract stores. The off-chain mirror exchanges them as RFC 3339.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::TypesError;

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Current system time. A clock set before 1970 reads as the epoch.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Seconds elapsed since this timestamp (relative to `now`).
    pub fn elapsed_since(&self, now: Timestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }

    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.0)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// RFC 3339 / ISO-8601 form with a `Z` suffix, e.g. `2025-03-01T09:00:00Z`.
    pub fn to_rfc3339(&self) -> String {
        match self.to_datetime() {
            Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
            None => self.0.to_string(),
        }
    }

    pub fn parse_rfc3339(s: &str) -> Result<Self, TypesError> {
        let dt = DateTime::parse_from_rfc3339(s.trim())
            .map_err(|e| TypesError::InvalidTimestamp(format!("{s}: {e}")))?;
        let secs = u64::try_from(dt.timestamp())
            .map_err(|_| TypesError::InvalidTimestamp(format!("{s}: before epoch")))?;
        Ok(Self(secs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

/// Source of the current time. Production uses [`SystemClock`]; tests use a
/// controllable clock from `nftvote-nullables`.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_roundtrip() {
        let ts = Timestamp::new(1_740_819_600);
        assert_eq!(ts.to_rfc3339(), "2025-03-01T09:00:00Z");
        assert_eq!(Timestamp::parse_rfc3339("2025-03-01T09:00:00Z").unwrap(), ts);
    }

    #[test]
    fn parse_honours_offsets() {
        let ts = Timestamp::parse_rfc3339("2025-03-01T15:00:00+06:00").unwrap();
        assert_eq!(ts, Timestamp::new(1_740_819_600));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Timestamp::parse_rfc3339("yesterday").is_err());
    }

    #[test]
    fn elapsed_saturates() {
        let a = Timestamp::new(100);
        assert_eq!(a.elapsed_since(Timestamp::new(150)), 50);
        assert_eq!(a.elapsed_since(Timestamp::new(50)), 0);
    }
}
