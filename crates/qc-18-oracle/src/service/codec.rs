//! JSON encode/decode for persisted records.
//!
//! A pluggable `Codec` trait is named in the module's design notes, but
//! every adapter in this crate uses `serde_json` directly; swapping it
//! for a binary codec is a matter of replacing these two functions.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::OracleError;

pub(crate) fn encode_json<T: Serialize>(value: &T) -> Result<Vec<u8>, OracleError> {
    serde_json::to_vec(value).map_err(|e| OracleError::StateCorruption(format!("encode: {e}")))
}

pub(crate) fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, OracleError> {
    serde_json::from_slice(bytes).map_err(|e| OracleError::StateCorruption(format!("decode: {e}")))
}
