use serde::{Deserialize, Serialize};

/// Salt used when none is configured.
pub const DEFAULT_SALT: &str = "wYfJIy4Nx1hPcxiljwg";

/// PBKDF2 rounds used when none are configured.
pub const DEFAULT_KDF_ITERATIONS: u32 = 1 << 18;

/// Token lifetime used when none is configured.
pub const DEFAULT_TTL_SECS: u64 = 60;

/// Envelope parameters.
///
/// These are configuration, not protocol state: both ends must agree on
/// `salt` and `kdf_iterations` out of band, and each end applies its own
/// `ttl_secs` to tokens it receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// KDF salt.
    pub salt: String,
    /// KDF iteration count.
    pub kdf_iterations: u32,
    /// Maximum token age in seconds.
    pub ttl_secs: u64,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        EnvelopeConfig {
            salt: DEFAULT_SALT.to_string(),
            kdf_iterations: DEFAULT_KDF_ITERATIONS,
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}
