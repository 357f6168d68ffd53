//! Checks on the identity data extracted from a national ID card.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use nftvote_crypto::keccak256;
use thiserror::Error;

/// Valid NID lengths after separators are stripped.
pub const NID_LENGTHS: [usize; 3] = [10, 13, 17];

pub const MIN_AGE: u32 = 18;
pub const MAX_AGE: u32 = 120;

/// Placeholder the extraction service writes for a field it could not read.
pub const NOT_DETECTED: &str = "Not detected";

const DOB_FORMATS: [&str; 3] = ["%d %b %Y", "%Y-%m-%d", "%m/%d/%Y"];
const DOB_FALLBACK_FORMATS: [&str; 3] = ["%b %d %Y", "%d-%b-%Y", "%Y/%m/%d"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("NID is required")]
    MissingNid,

    #[error("NID should contain only numbers")]
    NidNotNumeric,

    #[error("NID should be 10, 13, or 17 digits")]
    NidLength(usize),

    #[error("Date of birth is required")]
    MissingDob,

    #[error("Must be at least 18 years old")]
    TooYoung { age: i32 },

    #[error("Invalid date of birth")]
    ImplausibleDob { age: i32 },

    #[error("Invalid date format")]
    UnparseableDob(String),

    #[error("Name is required")]
    MissingName,
}

/// A national ID number with spaces and dashes removed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Nid(String);

impl Nid {
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let clean: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        if clean.is_empty() || raw.trim() == NOT_DETECTED {
            return Err(IdentityError::MissingNid);
        }
        if !clean.chars().all(|c| c.is_ascii_digit()) {
            return Err(IdentityError::NidNotNumeric);
        }
        if !NID_LENGTHS.contains(&clean.len()) {
            return Err(IdentityError::NidLength(clean.len()));
        }
        Ok(Self(clean))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Keccak-256 of the digits. Stands in for the number wherever it
    /// would otherwise be published.
    pub fn hash(&self) -> [u8; 32] {
        keccak256(self.0.as_bytes())
    }
}

impl fmt::Display for Nid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn validate_nid(raw: &str) -> Result<Nid, IdentityError> {
    Nid::parse(raw)
}

/// Split a letter run glued to a digit ("01 Feb1993") and collapse spaces.
fn normalize_dob(raw: &str) -> String {
    let mut spaced = String::with_capacity(raw.len() + 2);
    let mut prev: Option<char> = None;
    for c in raw.trim().chars() {
        if prev.is_some_and(|p| p.is_ascii_alphabetic()) && c.is_ascii_digit() {
            spaced.push(' ');
        }
        spaced.push(c);
        prev = Some(c);
    }
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Completed years between `born` and `today`.
pub fn age_on(born: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - born.year();
    if (today.month(), today.day()) < (born.month(), born.day()) {
        age -= 1;
    }
    age
}

/// Parse a date of birth and require an age between 18 and 120 on `today`.
///
/// Accepts `01 Feb 1993` (full month names too), `1993-02-01` and
/// `02/01/1993` (month first), plus a few looser spellings.
pub fn validate_dob(raw: &str, today: NaiveDate) -> Result<NaiveDate, IdentityError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == NOT_DETECTED {
        return Err(IdentityError::MissingDob);
    }
    let normalized = normalize_dob(trimmed);
    let born = DOB_FORMATS
        .iter()
        .chain(DOB_FALLBACK_FORMATS.iter())
        .find_map(|format| NaiveDate::parse_from_str(&normalized, format).ok())
        .ok_or_else(|| IdentityError::UnparseableDob(raw.to_string()))?;

    let age = age_on(born, today);
    if age < MIN_AGE as i32 {
        return Err(IdentityError::TooYoung { age });
    }
    if age > MAX_AGE as i32 {
        return Err(IdentityError::ImplausibleDob { age });
    }
    Ok(born)
}

/// The English line of a name field that may also carry the Bangla name
/// on another line.
pub fn clean_name(raw: &str) -> String {
    if !raw.contains('\n') {
        return raw.trim().to_string();
    }
    let lines: Vec<&str> = raw.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    lines
        .iter()
        .find(|line| {
            line.chars()
                .all(|c| c.is_ascii_uppercase() || c.is_whitespace() || c == '.')
        })
        .or_else(|| lines.last())
        .map(|line| line.to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn nid_strips_separators() {
        let nid = validate_nid("123 456-7890").unwrap();
        assert_eq!(nid.as_str(), "1234567890");
        assert_eq!(validate_nid("1234567890123").unwrap().as_str().len(), 13);
        assert_eq!(validate_nid("12345678901234567").unwrap().as_str().len(), 17);
    }

    #[test]
    fn nid_rejections() {
        assert_eq!(validate_nid(""), Err(IdentityError::MissingNid));
        assert_eq!(validate_nid("Not detected"), Err(IdentityError::MissingNid));
        assert_eq!(validate_nid("12345A7890"), Err(IdentityError::NidNotNumeric));
        assert_eq!(validate_nid("12345678901"), Err(IdentityError::NidLength(11)));
        assert_eq!(
            validate_nid("123").unwrap_err().to_string(),
            "NID should be 10, 13, or 17 digits"
        );
    }

    #[test]
    fn nid_hash_is_of_normalized_digits() {
        let a = validate_nid("123-456-7890").unwrap();
        let b = validate_nid("1234567890").unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash(), keccak256(b"1234567890"));
    }

    #[test]
    fn dob_formats() {
        let today = day(2025, 3, 1);
        assert_eq!(validate_dob("01 Feb 1993", today), Ok(day(1993, 2, 1)));
        assert_eq!(validate_dob("01 Feb1993", today), Ok(day(1993, 2, 1)));
        assert_eq!(validate_dob("1  february   1993", today), Ok(day(1993, 2, 1)));
        assert_eq!(validate_dob("1993-02-01", today), Ok(day(1993, 2, 1)));
        assert_eq!(validate_dob("02/01/1993", today), Ok(day(1993, 2, 1)));
    }

    #[test]
    fn dob_age_bounds() {
        let today = day(2025, 3, 1);
        assert_eq!(validate_dob("2007-03-01", today), Ok(day(2007, 3, 1)));
        assert_eq!(
            validate_dob("2007-03-02", today),
            Err(IdentityError::TooYoung { age: 17 })
        );
        assert_eq!(
            validate_dob("1900-01-01", today),
            Err(IdentityError::ImplausibleDob { age: 125 })
        );
    }

    #[test]
    fn dob_missing_or_garbage() {
        let today = day(2025, 3, 1);
        assert_eq!(validate_dob("  ", today), Err(IdentityError::MissingDob));
        assert_eq!(validate_dob("Not detected", today), Err(IdentityError::MissingDob));
        assert!(matches!(
            validate_dob("sometime in spring", today),
            Err(IdentityError::UnparseableDob(_))
        ));
    }

    #[test]
    fn clean_name_prefers_latin_line() {
        assert_eq!(clean_name("  RAHIM UDDIN "), "RAHIM UDDIN");
        assert_eq!(clean_name("রহিম উদ্দিন\nMD. RAHIM UDDIN"), "MD. RAHIM UDDIN");
        assert_eq!(clean_name("রহিম\nRahim Uddin"), "Rahim Uddin");
    }
}
