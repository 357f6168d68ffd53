//! EIP-55 mixed-case checksum encoding for addresses.
//!
//! The checksum capitalises hex letter `i` when nibble `i` of
//! keccak256(lowercase hex) is 8 or greater.

use nftvote_types::{Address, TypesError};

use crate::keccak256;

/// Render an address in EIP-55 form, `0x`-prefixed.
pub fn to_checksum(address: &Address) -> String {
    let lower = address.to_hex();
    let hash = keccak256(lower.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 { hash[i / 2] >> 4 } else { hash[i / 2] & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Parse an address, enforcing the checksum when the input is mixed case.
/// All-lowercase and all-uppercase inputs carry no checksum and are accepted.
pub fn parse_checksummed(s: &str) -> Result<Address, TypesError> {
    let address: Address = s.parse()?;
    let digits = s.trim().trim_start_matches("0x");
    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && to_checksum(&address)[2..] != *digits {
        return Err(TypesError::InvalidAddress(format!("bad EIP-55 checksum: {s}")));
    }
    Ok(address)
}
