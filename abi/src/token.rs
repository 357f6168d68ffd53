//! Parameter types and decoded values.

use std::fmt;

use nftvote_types::Address;

use crate::AbiError;

/// A Solidity parameter type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamType {
    Address,
    /// `uint<bits>`; the bit width only affects the canonical signature.
    Uint(usize),
    Bool,
    String,
    Bytes,
    /// `bytes<N>`, 1 to 32.
    FixedBytes(usize),
    Array(Box<ParamType>),
    Tuple(Vec<ParamType>),
}

impl ParamType {
    pub fn uint256() -> Self {
        Self::Uint(256)
    }

    pub fn array(inner: ParamType) -> Self {
        Self::Array(Box::new(inner))
    }

    /// Dynamic types are encoded out-of-line behind an offset word.
    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::String | Self::Bytes | Self::Array(_) => true,
            Self::Tuple(items) => items.iter().any(ParamType::is_dynamic),
            _ => false,
        }
    }

    /// Size of the inline head for this type. Only meaningful when static.
    pub(crate) fn head_size(&self) -> usize {
        match self {
            Self::Tuple(items) if !self.is_dynamic() => items.iter().map(ParamType::head_size).sum(),
            _ => 32,
        }
    }

    /// Whether `token` is a value of this type.
    pub fn matches(&self, token: &Token) -> bool {
        match (self, token) {
            (Self::Address, Token::Address(_))
            | (Self::Uint(_), Token::Uint(_))
            | (Self::Bool, Token::Bool(_))
            | (Self::String, Token::String(_))
            | (Self::Bytes, Token::Bytes(_)) => true,
            (Self::FixedBytes(n), Token::FixedBytes(b)) => b.len() == *n,
            (Self::Array(inner), Token::Array(items)) => items.iter().all(|t| inner.matches(t)),
            (Self::Tuple(types), Token::Tuple(items)) => {
                types.len() == items.len() && types.iter().zip(items).all(|(ty, t)| ty.matches(t))
            }
            _ => false,
        }
    }
}

impl fmt::Display for ParamType {
    /// Canonical form used in signatures, e.g. `(string,string)[]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address => f.write_str("address"),
            Self::Uint(bits) => write!(f, "uint{bits}"),
            Self::Bool => f.write_str("bool"),
            Self::String => f.write_str("string"),
            Self::Bytes => f.write_str("bytes"),
            Self::FixedBytes(n) => write!(f, "bytes{n}"),
            Self::Array(inner) => write!(f, "{inner}[]"),
            Self::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A decoded (or to-be-encoded) ABI value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Uint(u128),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    FixedBytes(Vec<u8>),
    Array(Vec<Token>),
    Tuple(Vec<Token>),
}

impl Token {
    pub fn uint(value: impl Into<u128>) -> Self {
        Self::Uint(value.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn word(bytes: [u8; 32]) -> Self {
        Self::FixedBytes(bytes.to_vec())
    }

    pub fn into_uint(self) -> Result<u128, AbiError> {
        match self {
            Self::Uint(v) => Ok(v),
            _ => Err(mismatch("uint")),
        }
    }

    /// Narrow a `uint` to `u64`, the width used for ids and timestamps.
    pub fn into_u64(self) -> Result<u64, AbiError> {
        u64::try_from(self.into_uint()?).map_err(|_| AbiError::Overflow)
    }

    pub fn into_bool(self) -> Result<bool, AbiError> {
        match self {
            Self::Bool(v) => Ok(v),
            _ => Err(mismatch("bool")),
        }
    }

    pub fn into_address(self) -> Result<Address, AbiError> {
        match self {
            Self::Address(v) => Ok(v),
            _ => Err(mismatch("address")),
        }
    }

    pub fn into_string(self) -> Result<String, AbiError> {
        match self {
            Self::String(v) => Ok(v),
            _ => Err(mismatch("string")),
        }
    }

    pub fn into_word(self) -> Result<[u8; 32], AbiError> {
        match self {
            Self::FixedBytes(v) if v.len() == 32 => {
                let mut out = [0u8; 32];
                out.copy_from_slice(&v);
                Ok(out)
            }
            _ => Err(mismatch("bytes32")),
        }
    }

    pub fn into_array(self) -> Result<Vec<Token>, AbiError> {
        match self {
            Self::Array(v) => Ok(v),
            _ => Err(mismatch("array")),
        }
    }

    pub fn into_tuple(self) -> Result<Vec<Token>, AbiError> {
        match self {
            Self::Tuple(v) => Ok(v),
            _ => Err(mismatch("tuple")),
        }
    }
}

fn mismatch(expected: &str) -> AbiError {
    AbiError::TypeMismatch {
        expected: expected.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names() {
        let voter_info = ParamType::Tuple(vec![ParamType::String; 7]);
        assert_eq!(voter_info.to_string(), "(string,string,string,string,string,string,string)");
        assert_eq!(ParamType::array(ParamType::String).to_string(), "string[]");
        assert_eq!(ParamType::FixedBytes(32).to_string(), "bytes32");
    }

    #[test]
    fn dynamic_detection() {
        assert!(!ParamType::uint256().is_dynamic());
        assert!(ParamType::String.is_dynamic());
        assert!(!ParamType::Tuple(vec![ParamType::Bool, ParamType::Address]).is_dynamic());
        assert!(ParamType::Tuple(vec![ParamType::Bool, ParamType::Bytes]).is_dynamic());
    }

    #[test]
    fn static_tuple_head_size() {
        let ty = ParamType::Tuple(vec![ParamType::Bool, ParamType::uint256(), ParamType::Address]);
        assert_eq!(ty.head_size(), 96);
    }

    #[test]
    fn matches_checks_nested_types() {
        let ty = ParamType::array(ParamType::String);
        assert!(ty.matches(&Token::Array(vec![Token::string("a")])));
        assert!(!ty.matches(&Token::Array(vec![Token::Bool(true)])));
    }

    #[test]
    fn into_u64_rejects_wide_values() {
        assert_eq!(Token::Uint(u64::MAX as u128 + 1).into_u64(), Err(AbiError::Overflow));
        assert_eq!(Token::Uint(5).into_u64(), Ok(5));
    }
}
