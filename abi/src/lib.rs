//! Solidity ABI encoding and decoding.
//!
//! Covers the subset of the ABI the two deployed contracts use: `address`,
//! `uint<N>`, `bool`, `string`, `bytes`, `bytes<N>`, dynamic arrays and tuples.
//! Unsigned integers are carried as `u128`; a value that does not fit is a
//! decode error rather than a silent truncation.

pub mod codec;
pub mod contracts;
pub mod error;
pub mod function;
pub mod token;

pub use codec::{decode, encode};
pub use error::AbiError;
pub use function::{ContractError, Event, EventParam, Function, decode_revert};
pub use token::{ParamType, Token};
