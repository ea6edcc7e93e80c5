//! Wire protocol for LuxDB
//!
//! This crate defines what travels between client and server once an
//! envelope has been opened:
//! - [`Command`]: every operation a client can request
//! - [`Output`]: typed success payloads
//! - [`Error`]: structured, serializable failures
//! - [`codec`]: MessagePack encoding of the above
//! - [`frame`]: length-prefixed framing on an async byte stream
//!
//! Encryption is not handled here; see `luxdb-security`.

#![warn(missing_docs)]

pub mod codec;
mod command;
mod error;
pub mod frame;
mod output;

pub use codec::{decode, decode_command, decode_response, encode, encode_command, encode_response, CodecError};
pub use command::Command;
pub use error::Error;
pub use frame::{read_frame, write_close, write_frame, FrameError, DEFAULT_MAX_FRAME_LEN};
pub use output::{IndexInfo, Output};

/// Reply to one command.
pub type Response = std::result::Result<Output, Error>;
