//! MessagePack encoding of commands and responses.
//!
//! `decode(encode(x)) == x` holds bit-for-bit for floating point payloads:
//! `f32` values travel as MessagePack float32 and are restored from their
//! raw bits. Decoding never panics; malformed input yields an error.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::{Command, Error, Response};

/// Encoding or decoding failure.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Value could not be encoded
    #[error("encode failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Bytes did not decode to the expected type
    #[error("decode failed: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// Encode any serializable value.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    Ok(rmp_serde::to_vec_named(value)?)
}

/// Decode any deserializable value.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Encode a command.
pub fn encode_command(command: &Command) -> Result<Vec<u8>, CodecError> {
    encode(command)
}

/// Decode a command, reporting failures as `MalformedCommand`.
pub fn decode_command(bytes: &[u8]) -> Result<Command, Error> {
    decode(bytes).map_err(|e| Error::MalformedCommand {
        reason: e.to_string(),
    })
}

/// Encode a response.
pub fn encode_response(response: &Response) -> Result<Vec<u8>, CodecError> {
    encode(response)
}

/// Decode a response.
pub fn decode_response(bytes: &[u8]) -> Result<Response, CodecError> {
    decode(bytes)
}
