//! Vector engines
//!
//! An engine owns the vectors of exactly one index. The store never talks
//! to an engine directly; it goes through [`IndexHandle`](crate::IndexHandle),
//! which enforces dimension, label and capacity rules before delegating.

pub mod distance;
mod engine;
mod flat;

pub use distance::distance;
pub use engine::{EngineFactory, Neighbor, VectorEngine};
pub use flat::{FlatEngine, FlatEngineFactory};
