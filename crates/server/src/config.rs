//! Server configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables, then command-line flags (applied by the binary).
//!
//! | Variable | Field |
//! |----------|-------|
//! | `LUXDB_SECRET` | `secret` |
//! | `LUXDB_SALT` | `salt` |
//! | `KDF_ITERATIONS` | `kdf_iterations` |
//! | `ENVELOPE_TTL` | `envelope_ttl_secs` |

use std::fmt;
use std::path::{Path, PathBuf};

use luxdb_engine::StoreConfig;
use luxdb_executor::SessionConfig;
use luxdb_security::{EnvelopeConfig, DEFAULT_KDF_ITERATIONS, DEFAULT_SALT, DEFAULT_TTL_SECS};
use luxdb_wire::DEFAULT_MAX_FRAME_LEN;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable holding the shared secret
pub const ENV_SECRET: &str = "LUXDB_SECRET";
/// Environment variable overriding the KDF salt
pub const ENV_SALT: &str = "LUXDB_SALT";
/// Environment variable overriding the KDF iteration count
pub const ENV_KDF_ITERATIONS: &str = "KDF_ITERATIONS";
/// Environment variable overriding the token lifetime
pub const ENV_ENVELOPE_TTL: &str = "ENVELOPE_TTL";

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Environment variable holds an unusable value
    #[error("invalid value for {var}: '{value}'")]
    Env { var: &'static str, value: String },

    /// A field failed validation
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address
    pub host: String,
    /// Listen port; 0 lets the OS choose
    pub port: u16,
    /// Shared secret both ends derive the session key from
    pub secret: String,
    /// KDF salt
    pub salt: String,
    /// KDF iteration count
    pub kdf_iterations: u32,
    /// Maximum token age in seconds
    pub envelope_ttl_secs: u64,
    /// Largest accepted frame payload
    pub max_frame_bytes: u64,
    /// Consecutive rejected frames before a connection is closed
    pub max_auth_failures: u32,
    /// Store settings
    pub store: StoreConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            secret: String::new(),
            salt: DEFAULT_SALT.to_string(),
            kdf_iterations: DEFAULT_KDF_ITERATIONS,
            envelope_ttl_secs: DEFAULT_TTL_SECS,
            max_frame_bytes: DEFAULT_MAX_FRAME_LEN,
            max_auth_failures: luxdb_executor::DEFAULT_MAX_AUTH_FAILURES,
            store: StoreConfig::default(),
        }
    }
}

// The secret never appears in logs.
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secret", &"<redacted>")
            .field("salt", &self.salt)
            .field("kdf_iterations", &self.kdf_iterations)
            .field("envelope_ttl_secs", &self.envelope_ttl_secs)
            .field("max_frame_bytes", &self.max_frame_bytes)
            .field("max_auth_failures", &self.max_auth_failures)
            .field("store", &self.store)
            .finish()
    }
}

impl ServerConfig {
    /// Read and parse a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults or `path`, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_with(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup(ENV_SECRET) {
            self.secret = secret;
        }
        if let Some(salt) = lookup(ENV_SALT) {
            self.salt = salt;
        }
        if let Some(value) = lookup(ENV_KDF_ITERATIONS) {
            self.kdf_iterations = parse_env(ENV_KDF_ITERATIONS, &value)?;
        }
        if let Some(value) = lookup(ENV_ENVELOPE_TTL) {
            self.envelope_ttl_secs = parse_env(ENV_ENVELOPE_TTL, &value)?;
        }
        Ok(())
    }

    /// Check every field before the server starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "a shared secret is required (set `secret` or {})",
                ENV_SECRET
            )));
        }
        if self.salt.is_empty() {
            return Err(ConfigError::Invalid("salt must not be empty".into()));
        }
        if self.kdf_iterations == 0 {
            return Err(ConfigError::Invalid("kdf_iterations must be positive".into()));
        }
        if self.envelope_ttl_secs == 0 {
            return Err(ConfigError::Invalid("envelope_ttl_secs must be positive".into()));
        }
        if self.max_frame_bytes == 0 {
            return Err(ConfigError::Invalid("max_frame_bytes must be positive".into()));
        }
        if self.max_auth_failures == 0 {
            return Err(ConfigError::Invalid("max_auth_failures must be positive".into()));
        }
        self.store
            .durability_mode()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    /// `host:port` for binding.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Envelope parameters.
    pub fn envelope_config(&self) -> EnvelopeConfig {
        EnvelopeConfig {
            salt: self.salt.clone(),
            kdf_iterations: self.kdf_iterations,
            ttl_secs: self.envelope_ttl_secs,
        }
    }

    /// Per-connection limits.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            max_frame_len: self.max_frame_bytes,
            max_auth_failures: self.max_auth_failures,
        }
    }

    /// Example config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# LuxDB server configuration
host = "127.0.0.1"
# 0 = pick a free port and log it
port = 0

# Shared secret; usually supplied through LUXDB_SECRET instead
# secret = "..."

# Key derivation; clients must use the same values
salt = "wYfJIy4Nx1hPcxiljwg"
kdf_iterations = 262144

# Tokens older than this are rejected
envelope_ttl_secs = 60

max_frame_bytes = 268435456
max_auth_failures = 3

[store]
# Omit for a memory-only store
# path = "/var/lib/luxdb"
durability = "standard"
flush_interval_ms = 1000
"#
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var,
        value: value.to_string(),
    })
}
