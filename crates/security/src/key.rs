use std::fmt;

use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Length of a derived key in bytes.
pub const KEY_LEN: usize = 32;

/// Symmetric key shared by both ends of a connection.
///
/// Derived once at startup and shared by every session. The bytes are wiped
/// when the last clone is dropped.
#[derive(Clone)]
pub struct SessionKey(Zeroizing<[u8; KEY_LEN]>);

impl SessionKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        SessionKey(Zeroizing::new(bytes))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(<redacted>)")
    }
}

impl PartialEq for SessionKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_slice().ct_eq(other.0.as_slice()).into()
    }
}

impl Eq for SessionKey {}

/// Derive a key from a shared secret with PBKDF2-HMAC-SHA256.
///
/// Deterministic and deliberately slow; call it once per process, not per
/// connection. `iterations` of zero is treated as one.
pub fn derive_key(secret: &[u8], salt: &[u8], iterations: u32) -> SessionKey {
    let mut out = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha256>(secret, salt, iterations.max(1), out.as_mut());
    tracing::debug!(target: "luxdb::security", iterations, "derived session key");
    SessionKey(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_is_deterministic() {
        let a = derive_key(b"secret", b"salt", 16);
        let b = derive_key(b"secret", b"salt", 16);
        assert_eq!(a, b);
    }

    #[test]
    fn test_inputs_change_key() {
        let base = derive_key(b"secret", b"salt", 16);
        assert_ne!(base, derive_key(b"other", b"salt", 16));
        assert_ne!(base, derive_key(b"secret", b"pepper", 16));
        assert_ne!(base, derive_key(b"secret", b"salt", 17));
    }

    #[test]
    fn test_known_vector() {
        // RFC 7914 section 11, PBKDF2-HMAC-SHA256 with one iteration.
        let key = derive_key(b"passwd", b"salt", 1);
        assert_eq!(
            &key.as_bytes()[..8],
            &[0x55, 0xac, 0x04, 0x6e, 0x56, 0xe3, 0x08, 0x9f]
        );
    }

    #[test]
    fn test_debug_redacts() {
        let key = derive_key(b"secret", b"salt", 1);
        assert_eq!(format!("{:?}", key), "SessionKey(<redacted>)");
    }
}
