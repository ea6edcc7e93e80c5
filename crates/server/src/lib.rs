//! # LuxDB Server
//!
//! Process-level pieces of LuxDB:
//! - [`ServerConfig`]: layered configuration (TOML file, environment, flags)
//! - [`Lifecycle`]: startup, signal-driven graceful shutdown, flush and close
//! - [`Server`]: the TCP accept loop, one session task per connection
//! - [`Client`]: async client with a handshake and typed command methods
//! - [`BlockingClient`]: the same calls for code without an async runtime

pub mod blocking;
pub mod client;
pub mod config;
pub mod lifecycle;
pub mod server;

pub use blocking::BlockingClient;
pub use client::{Client, ClientError};
pub use config::{ConfigError, ServerConfig};
pub use lifecycle::{run, shutdown_signal, Lifecycle, ServerError};
pub use server::Server;
