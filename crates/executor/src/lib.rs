//! # LuxDB Executor
//!
//! The command layer between the network and the store:
//! - [`Executor`]: stateless dispatcher from [`Command`] to store operation,
//!   with an exhaustive match and error conversion at the boundary
//! - [`Session`]: one connection's lifecycle: open each envelope, decode,
//!   execute, seal the reply
//!
//! ## Quick Start
//!
//! ```text
//! use luxdb_executor::{Command, Executor};
//! use luxdb_engine::{Store, StoreConfig};
//!
//! let store = Store::open(StoreConfig::memory())?;
//! let executor = Executor::new(store);
//! let reply = executor.execute(Command::ListIndexes).await;
//! ```

#![warn(missing_docs)]

mod convert;
mod executor;
mod handlers;
mod session;

#[cfg(test)]
mod tests;

pub use convert::{convert_result, to_wire_error};
pub use executor::Executor;
pub use session::{Session, SessionConfig, SessionError, SessionState, DEFAULT_MAX_AUTH_FAILURES};

pub use luxdb_wire::{Command, Error, IndexInfo, Output, Response};

/// Result type for executor operations
pub type Result<T> = std::result::Result<T, Error>;
