//! Concurrency layer for LuxDB
//!
//! This crate provides the two pieces that let independent indexes make
//! progress in parallel:
//! - [`LockCoordinator`]: one fair reader/writer lock per index name plus a
//!   store-level lock for structural changes (create, delete, import, list)
//! - [`WorkerPool`]: a fixed pool of OS threads with a priority queue, used
//!   for CPU- and disk-bound work so it never runs on the event loop

#![warn(missing_docs)]
#![warn(clippy::all)]

mod coordinator;
mod pool;

pub use coordinator::{
    IndexReadGuard, IndexWriteGuard, LockCoordinator, StructureReadGuard, StructureWriteGuard,
};
pub use pool::{BackpressureError, PoolError, PoolStats, TaskPriority, WorkerPool};
