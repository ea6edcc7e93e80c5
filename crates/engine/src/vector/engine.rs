//! Engine trait and factory.

use luxdb_core::{Label, Metric, Result};

/// One search hit: label and its distance to the query
pub type Neighbor = (Label, f32);

/// Vector index implementation behind one index handle.
///
/// Engines do not validate input: the handle checks dimensions, label
/// uniqueness and capacity before calling `add`. Implementations must be
/// swappable without changing the store, so nothing here assumes exhaustive
/// search.
pub trait VectorEngine: Send + Sync {
    /// Distance function
    fn metric(&self) -> Metric;

    /// Components per vector
    fn dimension(&self) -> usize;

    /// Maximum number of elements
    fn capacity(&self) -> usize;

    /// Number of stored elements
    fn len(&self) -> usize;

    /// True if no elements are stored
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `label` is stored
    fn contains(&self, label: Label) -> bool;

    /// Insert a batch of pre-validated vectors.
    ///
    /// Either every vector is inserted or none is.
    fn add(&mut self, vectors: &[Vec<f32>], labels: &[Label]) -> Result<()>;

    /// Up to `k` nearest neighbors of `query`, closest first.
    ///
    /// Equal distances are ordered by ascending label.
    fn query(&self, query: &[f32], k: usize) -> Vec<Neighbor>;

    /// Change capacity; `capacity` is never below `len()`.
    fn resize(&mut self, capacity: usize) -> Result<()>;

    /// All labels, ascending
    fn ids(&self) -> Vec<Label>;

    /// Stored vector of `label`
    fn get(&self, label: Label) -> Option<&[f32]>;

    /// Remove `label`; returns whether it was present
    fn remove(&mut self, label: Label) -> bool;

    /// Opaque snapshot of the full engine state
    fn serialize(&self) -> Result<Vec<u8>>;
}

/// Creates engines, fresh or from a snapshot.
pub trait EngineFactory: Send + Sync {
    /// Allocate an empty engine
    fn init(&self, metric: Metric, dimension: usize, capacity: usize)
        -> Result<Box<dyn VectorEngine>>;

    /// Rebuild an engine from [`VectorEngine::serialize`] output
    fn deserialize(&self, bytes: &[u8]) -> Result<Box<dyn VectorEngine>>;
}
