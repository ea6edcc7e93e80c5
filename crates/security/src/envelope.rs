//! Token format and seal/open.
//!
//! ```text
//! +---------+----------------+------------------+---------------------+
//! | version | timestamp      | nonce            | ciphertext + tag    |
//! | 1 byte  | u64 BE seconds | 24 bytes random  | XChaCha20-Poly1305  |
//! +---------+----------------+------------------+---------------------+
//! ```
//!
//! The version byte and timestamp are bound as associated data.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use thiserror::Error;

use crate::config::EnvelopeConfig;
use crate::key::{derive_key, SessionKey};
use crate::replay::ReplayWindow;

/// First byte of every token.
pub const TOKEN_VERSION: u8 = 0x80;

/// Nonce length in bytes.
pub const NONCE_LEN: usize = 24;

/// Tokens stamped further than this in the future are rejected.
pub const MAX_CLOCK_SKEW_SECS: u64 = 60;

const HEADER_LEN: usize = 1 + 8;
const TAG_LEN: usize = 16;
const MIN_TOKEN_LEN: usize = HEADER_LEN + NONCE_LEN + TAG_LEN;

/// Why a token was not accepted.
///
/// The far side never learns which of these occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Integrity check failed: tampering, wrong key, truncation, or an
    /// unknown version byte.
    #[error("token failed authentication")]
    Authentication,

    /// Token is older than the TTL or too far in the future.
    #[error("token expired")]
    Expired,

    /// Token was already accepted within the freshness window.
    #[error("token replayed")]
    Replayed,

    /// Plaintext is too large for the cipher.
    #[error("payload too large to seal")]
    PayloadTooLarge,
}

/// A token that passed authentication and freshness checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedToken {
    /// Decrypted payload.
    pub plaintext: Vec<u8>,
    /// Seconds since the epoch at which the token was sealed.
    pub timestamp: u64,
    /// Per-token random nonce.
    pub nonce: [u8; NONCE_LEN],
}

/// Current wall-clock time in seconds since the epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn cipher(key: &SessionKey) -> XChaCha20Poly1305 {
    XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()))
}

/// Seal `plaintext` with an explicit timestamp.
pub fn seal_at(key: &SessionKey, plaintext: &[u8], timestamp: u64) -> Result<Vec<u8>, EnvelopeError> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let mut header = [0u8; HEADER_LEN];
    header[0] = TOKEN_VERSION;
    header[1..].copy_from_slice(&timestamp.to_be_bytes());

    let sealed = cipher(key)
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: &header,
            },
        )
        .map_err(|_| EnvelopeError::PayloadTooLarge)?;

    let mut token = Vec::with_capacity(HEADER_LEN + NONCE_LEN + sealed.len());
    token.extend_from_slice(&header);
    token.extend_from_slice(&nonce);
    token.extend_from_slice(&sealed);
    Ok(token)
}

/// Open `token` as of time `now`.
///
/// Authentication is checked before freshness, so a forged token is always
/// reported as `Authentication` regardless of its claimed timestamp.
pub fn open_at(
    key: &SessionKey,
    token: &[u8],
    ttl_secs: u64,
    now: u64,
) -> Result<OpenedToken, EnvelopeError> {
    if token.len() < MIN_TOKEN_LEN || token[0] != TOKEN_VERSION {
        return Err(EnvelopeError::Authentication);
    }
    let (header, rest) = token.split_at(HEADER_LEN);
    let (nonce_bytes, sealed) = rest.split_at(NONCE_LEN);

    let plaintext = cipher(key)
        .decrypt(
            XNonce::from_slice(nonce_bytes),
            Payload {
                msg: sealed,
                aad: header,
            },
        )
        .map_err(|_| EnvelopeError::Authentication)?;

    let mut ts = [0u8; 8];
    ts.copy_from_slice(&header[1..]);
    let timestamp = u64::from_be_bytes(ts);

    if timestamp > now.saturating_add(MAX_CLOCK_SKEW_SECS) {
        return Err(EnvelopeError::Expired);
    }
    if now.saturating_sub(timestamp) > ttl_secs {
        return Err(EnvelopeError::Expired);
    }

    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(nonce_bytes);
    Ok(OpenedToken {
        plaintext,
        timestamp,
        nonce,
    })
}

/// Key plus TTL, the unit shared by every session of a process.
#[derive(Debug, Clone)]
pub struct Envelope {
    key: SessionKey,
    ttl: Duration,
}

impl Envelope {
    /// Build an envelope from an already-derived key.
    pub fn new(key: SessionKey, ttl_secs: u64) -> Self {
        Envelope {
            key,
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    /// Derive the key from `secret` and wrap it.
    pub fn derive(secret: &[u8], config: &EnvelopeConfig) -> Self {
        let key = derive_key(secret, config.salt.as_bytes(), config.kdf_iterations);
        Envelope::new(key, config.ttl_secs)
    }

    /// Configured token lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Seal a payload stamped with the current time.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        seal_at(&self.key, plaintext, unix_now())
    }

    /// Open a token, checking integrity and age.
    pub fn open(&self, token: &[u8]) -> Result<OpenedToken, EnvelopeError> {
        open_at(&self.key, token, self.ttl.as_secs(), unix_now())
    }

    /// Open a token and record it in `window`, rejecting repeats.
    pub fn open_fresh(
        &self,
        token: &[u8],
        window: &mut ReplayWindow,
    ) -> Result<Vec<u8>, EnvelopeError> {
        let now = unix_now();
        let opened = open_at(&self.key, token, self.ttl.as_secs(), now)?;
        window.admit(opened.nonce, opened.timestamp, now)?;
        Ok(opened.plaintext)
    }
}
