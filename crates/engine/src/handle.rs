//! Index handle
//!
//! One `IndexHandle` exists per name in the store. It pairs the index
//! metadata with the engine (once initialized) and owns every validation
//! rule of the per-index operations, so the engine only ever sees
//! well-formed batches.
//!
//! Handles live behind the coordinator's per-name `RwLock`: mutating methods
//! take `&mut self` and therefore require the write lock. Flushing only needs
//! `&self`, so queries keep running while an index is written out.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use luxdb_core::{Error, IndexMeta, IndexState, Label, Result};
use luxdb_durability::write_index_file;
use parking_lot::Mutex;
use tracing::debug;

use crate::vector::VectorEngine;

/// Per-query result matrices: `labels[i]` and `distances[i]` belong to input `i`
pub type QueryResult = (Vec<Vec<Label>>, Vec<Vec<f32>>);

/// Metadata plus live engine of one index
pub struct IndexHandle {
    meta: IndexMeta,
    engine: Option<Box<dyn VectorEngine>>,
    /// Bumped by every mutation of the engine
    generation: u64,
    /// Generation last written to the data file
    flushed: AtomicU64,
    /// Serializes concurrent flushes of the same index
    flush_lock: Mutex<()>,
}

impl std::fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexHandle")
            .field("meta", &self.meta)
            .field("count", &self.engine.as_ref().map(|e| e.len()))
            .field("generation", &self.generation)
            .finish()
    }
}

impl IndexHandle {
    /// Handle of an index in state `Created`
    pub fn created(meta: IndexMeta) -> Self {
        IndexHandle {
            meta,
            engine: None,
            generation: 0,
            flushed: AtomicU64::new(0),
            flush_lock: Mutex::new(()),
        }
    }

    /// Handle of an initialized index whose engine matches its data file
    pub fn loaded(meta: IndexMeta, engine: Box<dyn VectorEngine>) -> Self {
        IndexHandle {
            meta,
            engine: Some(engine),
            generation: 0,
            flushed: AtomicU64::new(0),
            flush_lock: Mutex::new(()),
        }
    }

    /// Current metadata
    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    /// Index name
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    fn engine(&self) -> Result<&dyn VectorEngine> {
        match (self.meta.state, self.engine.as_deref()) {
            (IndexState::Deleted, _) => Err(Error::UnknownIndex(self.meta.name.clone())),
            (_, Some(engine)) => Ok(engine),
            (_, None) => Err(Error::NotInitialized(self.meta.name.clone())),
        }
    }

    fn engine_mut(&mut self) -> Result<&mut Box<dyn VectorEngine>> {
        if self.meta.state == IndexState::Deleted {
            return Err(Error::UnknownIndex(self.meta.name.clone()));
        }
        match self.engine.as_mut() {
            Some(engine) => Ok(engine),
            None => Err(Error::NotInitialized(self.meta.name.clone())),
        }
    }

    fn touch(&mut self) {
        self.generation += 1;
    }

    /// Check that `initialize` is allowed
    pub fn check_initialize(&self) -> Result<()> {
        match self.meta.state {
            IndexState::Created => Ok(()),
            IndexState::Initialized => Err(Error::AlreadyInitialized(self.meta.name.clone())),
            IndexState::Deleted => Err(Error::UnknownIndex(self.meta.name.clone())),
        }
    }

    /// Move to `Initialized` with a freshly allocated engine.
    ///
    /// The caller has already written the engine's (empty) data file, so the
    /// handle starts clean.
    pub fn install(&mut self, engine: Box<dyn VectorEngine>) -> Result<()> {
        self.check_initialize()?;
        self.meta.capacity = engine.capacity();
        self.meta.state = IndexState::Initialized;
        self.engine = Some(engine);
        Ok(())
    }

    /// Undo [`install`](Self::install) after a failed metadata commit
    pub fn uninstall(&mut self) {
        self.engine = None;
        self.meta.capacity = 0;
        self.meta.state = IndexState::Created;
    }

    /// Validate a batch completely, then insert it.
    ///
    /// # Errors
    ///
    /// - `LengthMismatch` if `vectors` and `labels` differ in length
    /// - `DimensionMismatch` for the first vector of the wrong length
    /// - `DuplicateLabel` listing labels repeated in the batch or already present
    /// - `CapacityExceeded` if the batch does not fit
    pub fn add(&mut self, vectors: &[Vec<f32>], labels: &[Label]) -> Result<()> {
        let engine = self.engine()?;

        if vectors.len() != labels.len() {
            return Err(Error::LengthMismatch {
                vectors: vectors.len(),
                labels: labels.len(),
            });
        }
        check_dimensions(engine.dimension(), vectors)?;

        let mut seen = HashSet::with_capacity(labels.len());
        let mut duplicates: Vec<Label> = labels
            .iter()
            .copied()
            .filter(|&label| !seen.insert(label) || engine.contains(label))
            .collect();
        if !duplicates.is_empty() {
            duplicates.sort_unstable();
            duplicates.dedup();
            return Err(Error::DuplicateLabel(duplicates));
        }

        let required = engine.len() + vectors.len();
        if required > engine.capacity() {
            return Err(Error::CapacityExceeded {
                capacity: engine.capacity(),
                required,
            });
        }

        if vectors.is_empty() {
            return Ok(());
        }
        self.engine_mut()?.add(vectors, labels)?;
        self.touch();
        Ok(())
    }

    /// `k` nearest neighbors of each query vector
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `k` is zero, `DimensionMismatch` if any query vector
    /// has the wrong length.
    pub fn query(&self, vectors: &[Vec<f32>], k: usize) -> Result<QueryResult> {
        let engine = self.engine()?;
        if k == 0 {
            return Err(Error::InvalidInput("k must be at least 1".into()));
        }
        check_dimensions(engine.dimension(), vectors)?;

        let mut labels = Vec::with_capacity(vectors.len());
        let mut distances = Vec::with_capacity(vectors.len());
        for vector in vectors {
            let (l, d): (Vec<Label>, Vec<f32>) = engine.query(vector, k).into_iter().unzip();
            labels.push(l);
            distances.push(d);
        }
        Ok((labels, distances))
    }

    /// Change capacity, keeping every stored vector.
    ///
    /// `commit` makes the new capacity durable; if it fails the engine is
    /// put back to its previous capacity.
    pub fn resize<F>(&mut self, capacity: usize, commit: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let engine = self.engine_mut()?;
        let count = engine.len();
        if capacity < count {
            return Err(Error::InvalidCapacity {
                requested: capacity,
                count,
            });
        }
        let previous = engine.capacity();
        engine.resize(capacity)?;

        if let Err(e) = commit() {
            engine.resize(previous)?;
            return Err(e);
        }
        self.meta.capacity = capacity;
        self.touch();
        Ok(())
    }

    /// Stored labels, ascending
    pub fn ids(&self) -> Result<Vec<Label>> {
        Ok(self.engine()?.ids())
    }

    /// Vectors of `labels`, in request order
    ///
    /// # Errors
    ///
    /// `UnknownLabel` listing every requested label that is absent.
    pub fn get(&self, labels: &[Label]) -> Result<Vec<Vec<f32>>> {
        let engine = self.engine()?;
        let missing: Vec<Label> = labels
            .iter()
            .copied()
            .filter(|&label| !engine.contains(label))
            .collect();
        if !missing.is_empty() {
            return Err(Error::UnknownLabel(missing));
        }
        labels
            .iter()
            .map(|&label| {
                engine
                    .get(label)
                    .map(<[f32]>::to_vec)
                    .ok_or_else(|| Error::Internal(format!("label {} vanished", label)))
            })
            .collect()
    }

    /// Remove one vector
    pub fn delete_item(&mut self, label: Label) -> Result<()> {
        if !self.engine_mut()?.remove(label) {
            return Err(Error::UnknownLabel(vec![label]));
        }
        self.touch();
        Ok(())
    }

    /// Element count
    pub fn count(&self) -> Result<usize> {
        Ok(self.engine()?.len())
    }

    /// Metadata snapshot and element count; a `Created` index counts zero
    pub fn info(&self) -> Result<(IndexMeta, usize)> {
        match self.meta.state {
            IndexState::Deleted => Err(Error::UnknownIndex(self.meta.name.clone())),
            IndexState::Created => Ok((self.meta.clone(), 0)),
            IndexState::Initialized => Ok((self.meta.clone(), self.engine()?.len())),
        }
    }

    /// Drop the engine; later operations through stale lookups see `UnknownIndex`
    pub fn mark_deleted(&mut self) {
        self.meta.state = IndexState::Deleted;
        self.engine = None;
    }

    /// Whether the engine has changes not yet in the data file
    pub fn is_dirty(&self) -> bool {
        self.engine.is_some() && self.flushed.load(Ordering::Acquire) != self.generation
    }

    /// Write the engine to `path` if dirty (or unconditionally with `force`).
    ///
    /// Returns whether a file was written.
    pub fn flush_to(&self, path: &Path, force: bool) -> Result<bool> {
        let Some(engine) = self.engine.as_deref() else {
            return Ok(false);
        };
        let _flushing = self.flush_lock.lock();
        if !force && self.flushed.load(Ordering::Acquire) == self.generation {
            return Ok(false);
        }

        let payload = engine.serialize()?;
        write_index_file(
            path,
            engine.metric(),
            engine.dimension(),
            engine.capacity(),
            engine.len(),
            &payload,
        )?;
        self.flushed.store(self.generation, Ordering::Release);

        debug!(
            target: "luxdb::store",
            index = %self.meta.name,
            count = engine.len(),
            bytes = payload.len(),
            "Index data flushed"
        );
        Ok(true)
    }
}

fn check_dimensions(expected: usize, vectors: &[Vec<f32>]) -> Result<()> {
    match vectors.iter().find(|v| v.len() != expected) {
        Some(v) => Err(Error::DimensionMismatch {
            expected,
            actual: v.len(),
        }),
        None => Ok(()),
    }
}
