//! Vector index engine and store for LuxDB
//!
//! This crate orchestrates the lower layers:
//! - Vector engines: the `VectorEngine` trait and the exact `FlatEngine`
//! - Index handles: one live engine plus its metadata and validation rules
//! - Store: the durable name → index mapping, its lifecycle operations and
//!   the background flusher
//!
//! The store is the only component that knows about both the catalog and
//! the data files.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod handle;
pub mod store;
pub mod vector;

pub use config::StoreConfig;
pub use handle::IndexHandle;
pub use store::Store;
pub use vector::{EngineFactory, FlatEngine, FlatEngineFactory, Neighbor, VectorEngine};
