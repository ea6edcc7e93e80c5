//! Authenticated encryption for the LuxDB wire protocol.
//!
//! Every frame exchanged between client and server is one envelope token:
//! a payload sealed with a key derived from a shared secret, stamped with
//! the time it was sealed. Opening a token verifies its integrity, checks
//! that it is fresh, and (through [`ReplayWindow`]) that it has not been
//! accepted before.
//!
//! ```ignore
//! use luxdb_security::{Envelope, EnvelopeConfig};
//!
//! let envelope = Envelope::derive(b"secret", &EnvelopeConfig::default());
//! let token = envelope.seal(b"payload")?;
//! let opened = envelope.open(&token)?;
//! ```

#![warn(missing_docs)]

mod config;
mod envelope;
mod key;
mod replay;

pub use config::{EnvelopeConfig, DEFAULT_KDF_ITERATIONS, DEFAULT_SALT, DEFAULT_TTL_SECS};
pub use envelope::{
    open_at, seal_at, unix_now, Envelope, EnvelopeError, OpenedToken, MAX_CLOCK_SKEW_SECS,
    NONCE_LEN, TOKEN_VERSION,
};
pub use key::{derive_key, SessionKey, KEY_LEN};
pub use replay::ReplayWindow;
