//! Head/tail encoding of token sequences.

use nftvote_types::Address;

use crate::{AbiError, ParamType, Token};

/// Encode `tokens` as an ABI tuple (the argument block of a call).
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    encode_sequence(tokens)
}

/// Decode an ABI tuple of the given types.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    decode_sequence(types, data, 0)
}

fn is_dynamic(token: &Token) -> bool {
    match token {
        Token::String(_) | Token::Bytes(_) | Token::Array(_) => true,
        Token::Tuple(items) => items.iter().any(is_dynamic),
        _ => false,
    }
}

fn encode_sequence(tokens: &[Token]) -> Vec<u8> {
    let encoded: Vec<(bool, Vec<u8>)> = tokens
        .iter()
        .map(|t| (is_dynamic(t), encode_token(t)))
        .collect();
    let head_len: usize = encoded
        .iter()
        .map(|(dynamic, bytes)| if *dynamic { 32 } else { bytes.len() })
        .sum();

    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();
    for (dynamic, bytes) in encoded {
        if dynamic {
            head.extend_from_slice(&uint_word((head_len + tail.len()) as u128));
            tail.extend_from_slice(&bytes);
        } else {
            head.extend_from_slice(&bytes);
        }
    }
    head.extend_from_slice(&tail);
    head
}

fn encode_token(token: &Token) -> Vec<u8> {
    match token {
        Token::Address(a) => a.to_word().to_vec(),
        Token::Uint(v) => uint_word(*v).to_vec(),
        Token::Bool(b) => uint_word(u128::from(*b)).to_vec(),
        Token::FixedBytes(bytes) => pad_right(bytes),
        Token::String(s) => encode_bytes(s.as_bytes()),
        Token::Bytes(bytes) => encode_bytes(bytes),
        Token::Array(items) => {
            let mut out = uint_word(items.len() as u128).to_vec();
            out.extend(encode_sequence(items));
            out
        }
        Token::Tuple(items) => encode_sequence(items),
    }
}

fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = uint_word(bytes.len() as u128).to_vec();
    out.extend(pad_right(bytes));
    out
}

fn pad_right(bytes: &[u8]) -> Vec<u8> {
    let padded = bytes.len().div_ceil(32) * 32;
    let mut out = bytes.to_vec();
    out.resize(padded, 0);
    out
}

pub(crate) fn uint_word(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn decode_sequence(types: &[ParamType], data: &[u8], base: usize) -> Result<Vec<Token>, AbiError> {
    let mut tokens = Vec::with_capacity(types.len());
    let mut cursor = base;
    for ty in types {
        if ty.is_dynamic() {
            let offset = read_len(data, cursor)?;
            let at = base
                .checked_add(offset)
                .ok_or_else(|| invalid("offset", format!("{offset} overflows")))?;
            tokens.push(decode_at(ty, data, at)?);
            cursor += 32;
        } else {
            tokens.push(decode_at(ty, data, cursor)?);
            cursor += ty.head_size();
        }
    }
    Ok(tokens)
}

fn decode_at(ty: &ParamType, data: &[u8], at: usize) -> Result<Token, AbiError> {
    match ty {
        ParamType::Address => {
            let w = read_word(data, at)?;
            Address::from_word(&w)
                .map(Token::Address)
                .ok_or_else(|| invalid("address", "upper 12 bytes not zero".into()))
        }
        ParamType::Uint(_) => read_uint(data, at).map(Token::Uint),
        ParamType::Bool => match read_uint(data, at)? {
            0 => Ok(Token::Bool(false)),
            1 => Ok(Token::Bool(true)),
            other => Err(invalid("bool", format!("value {other}"))),
        },
        ParamType::FixedBytes(n) => {
            let w = read_word(data, at)?;
            Ok(Token::FixedBytes(w[..*n].to_vec()))
        }
        ParamType::Bytes => read_bytes(data, at).map(|b| Token::Bytes(b.to_vec())),
        ParamType::String => {
            let bytes = read_bytes(data, at)?;
            String::from_utf8(bytes.to_vec())
                .map(Token::String)
                .map_err(|e| invalid("string", e.to_string()))
        }
        ParamType::Array(inner) => {
            let len = read_len(data, at)?;
            let start = at + 32;
            // Every element occupies at least one head word.
            let min_size = len.saturating_mul(32);
            if start.saturating_add(min_size) > data.len() {
                return Err(AbiError::OutOfBounds {
                    offset: start,
                    needed: min_size,
                    available: data.len().saturating_sub(start),
                });
            }
            let types = vec![inner.as_ref().clone(); len];
            decode_sequence(&types, data, start).map(Token::Array)
        }
        ParamType::Tuple(items) => decode_sequence(items, data, at).map(Token::Tuple),
    }
}

fn read_word(data: &[u8], at: usize) -> Result<[u8; 32], AbiError> {
    let slice = data
        .get(at..at.saturating_add(32))
        .filter(|s| s.len() == 32)
        .ok_or(AbiError::OutOfBounds {
            offset: at,
            needed: 32,
            available: data.len().saturating_sub(at),
        })?;
    let mut word = [0u8; 32];
    word.copy_from_slice(slice);
    Ok(word)
}

fn read_uint(data: &[u8], at: usize) -> Result<u128, AbiError> {
    let word = read_word(data, at)?;
    if word[..16].iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow);
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

fn read_len(data: &[u8], at: usize) -> Result<usize, AbiError> {
    let value = read_uint(data, at)?;
    usize::try_from(value).map_err(|_| AbiError::Overflow)
}

fn read_bytes(data: &[u8], at: usize) -> Result<&[u8], AbiError> {
    let len = read_len(data, at)?;
    let start = at + 32;
    data.get(start..start.saturating_add(len))
        .filter(|s| s.len() == len)
        .ok_or(AbiError::OutOfBounds {
            offset: start,
            needed: len,
            available: data.len().saturating_sub(start),
        })
}

fn invalid(kind: &'static str, detail: String) -> AbiError {
    AbiError::InvalidEncoding { kind, detail }
}
