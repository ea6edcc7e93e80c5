//! Exact (flat) vector engine
//!
//! Vectors live in one contiguous `Vec<f32>` for cache-friendly scans.
//! Search is O(n) per query and exact, which makes results reproducible:
//! the same data and query always give the same neighbors in the same order.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use luxdb_core::{Error, Label, Metric, Result};
use serde::{Deserialize, Serialize};

use super::distance::distance;
use super::engine::{EngineFactory, Neighbor, VectorEngine};

/// Exact nearest-neighbor engine
pub struct FlatEngine {
    metric: Metric,
    dimension: usize,
    capacity: usize,
    /// Row-major storage: slot `i` occupies `data[i * dimension..(i + 1) * dimension]`
    data: Vec<f32>,
    /// Label stored in each slot
    slot_labels: Vec<Label>,
    /// Label -> slot; sole source of truth for membership
    slots: BTreeMap<Label, usize>,
}

/// On-disk form of a [`FlatEngine`]
#[derive(Serialize, Deserialize)]
struct FlatSnapshot {
    metric: Metric,
    dimension: usize,
    capacity: usize,
    labels: Vec<Label>,
    data: Vec<f32>,
}

/// Heap entry ordered by (distance, label)
struct Candidate {
    distance: f32,
    label: Label,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.label.cmp(&other.label))
    }
}

fn float_count(capacity: usize, dimension: usize) -> Result<usize> {
    capacity.checked_mul(dimension).ok_or_else(|| {
        Error::Engine(format!(
            "capacity {} x dimension {} overflows",
            capacity, dimension
        ))
    })
}

impl FlatEngine {
    /// Allocate an empty engine with room for `capacity` vectors.
    ///
    /// # Errors
    ///
    /// Returns `Error::Engine` if the storage cannot be allocated.
    pub fn new(metric: Metric, dimension: usize, capacity: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(float_count(capacity, dimension)?)
            .map_err(|e| Error::Engine(format!("cannot allocate {} vectors: {}", capacity, e)))?;
        Ok(FlatEngine {
            metric,
            dimension,
            capacity,
            data,
            slot_labels: Vec::new(),
            slots: BTreeMap::new(),
        })
    }

    fn row(&self, slot: usize) -> &[f32] {
        let start = slot * self.dimension;
        &self.data[start..start + self.dimension]
    }

    fn from_snapshot(snapshot: FlatSnapshot) -> Result<Self> {
        let FlatSnapshot {
            metric,
            dimension,
            capacity,
            labels,
            data,
        } = snapshot;

        if dimension == 0 {
            return Err(Error::Corruption("engine snapshot has dimension 0".into()));
        }
        if labels.len() > capacity {
            return Err(Error::Corruption(format!(
                "engine snapshot holds {} elements but capacity is {}",
                labels.len(),
                capacity
            )));
        }
        if float_count(labels.len(), dimension)? != data.len() {
            return Err(Error::Corruption(format!(
                "engine snapshot has {} floats for {} labels of dimension {}",
                data.len(),
                labels.len(),
                dimension
            )));
        }

        let mut engine = FlatEngine::new(metric, dimension, capacity)?;
        for (slot, &label) in labels.iter().enumerate() {
            if engine.slots.insert(label, slot).is_some() {
                return Err(Error::Corruption(format!(
                    "engine snapshot repeats label {}",
                    label
                )));
            }
        }
        engine.data.extend_from_slice(&data);
        engine.slot_labels = labels;
        Ok(engine)
    }
}

impl VectorEngine for FlatEngine {
    fn metric(&self) -> Metric {
        self.metric
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn contains(&self, label: Label) -> bool {
        self.slots.contains_key(&label)
    }

    fn add(&mut self, vectors: &[Vec<f32>], labels: &[Label]) -> Result<()> {
        let required = self.len() + vectors.len();
        if required > self.capacity {
            return Err(Error::CapacityExceeded {
                capacity: self.capacity,
                required,
            });
        }
        let additional = float_count(vectors.len(), self.dimension)?;
        self.data
            .try_reserve(additional)
            .map_err(|e| Error::Engine(format!("cannot grow vector storage: {}", e)))?;

        for (vector, &label) in vectors.iter().zip(labels) {
            let slot = self.slot_labels.len();
            self.data.extend_from_slice(vector);
            self.slot_labels.push(label);
            self.slots.insert(label, slot);
        }
        Ok(())
    }

    fn query(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        if k == 0 || self.is_empty() {
            return Vec::new();
        }

        // Max-heap of the k best so far; the root is the worst kept candidate.
        let mut best: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);
        for (slot, &label) in self.slot_labels.iter().enumerate() {
            best.push(Candidate {
                distance: distance(self.metric, query, self.row(slot)),
                label,
            });
            if best.len() > k {
                best.pop();
            }
        }

        best.into_sorted_vec()
            .into_iter()
            .map(|c| (c.label, c.distance))
            .collect()
    }

    fn resize(&mut self, capacity: usize) -> Result<()> {
        if capacity < self.len() {
            return Err(Error::InvalidCapacity {
                requested: capacity,
                count: self.len(),
            });
        }
        let floats = float_count(capacity, self.dimension)?;
        if floats > self.data.capacity() {
            self.data
                .try_reserve_exact(floats - self.data.len())
                .map_err(|e| Error::Engine(format!("cannot resize to {}: {}", capacity, e)))?;
        } else {
            self.data.shrink_to(floats);
        }
        self.capacity = capacity;
        Ok(())
    }

    fn ids(&self) -> Vec<Label> {
        self.slots.keys().copied().collect()
    }

    fn get(&self, label: Label) -> Option<&[f32]> {
        self.slots.get(&label).map(|&slot| self.row(slot))
    }

    fn remove(&mut self, label: Label) -> bool {
        let Some(slot) = self.slots.remove(&label) else {
            return false;
        };

        // Move the last row into the hole.
        let last = self.slot_labels.len() - 1;
        if slot != last {
            let dim = self.dimension;
            self.data
                .copy_within(last * dim..(last + 1) * dim, slot * dim);
            let moved = self.slot_labels[last];
            self.slot_labels[slot] = moved;
            self.slots.insert(moved, slot);
        }
        self.slot_labels.pop();
        self.data.truncate(last * self.dimension);
        true
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        let snapshot = FlatSnapshot {
            metric: self.metric,
            dimension: self.dimension,
            capacity: self.capacity,
            labels: self.slot_labels.clone(),
            data: self.data.clone(),
        };
        rmp_serde::to_vec(&snapshot).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Factory for [`FlatEngine`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatEngineFactory;

impl EngineFactory for FlatEngineFactory {
    fn init(
        &self,
        metric: Metric,
        dimension: usize,
        capacity: usize,
    ) -> Result<Box<dyn VectorEngine>> {
        Ok(Box::new(FlatEngine::new(metric, dimension, capacity)?))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Box<dyn VectorEngine>> {
        let snapshot: FlatSnapshot = rmp_serde::from_slice(bytes)
            .map_err(|e| Error::Corruption(format!("invalid engine snapshot: {}", e)))?;
        Ok(Box::new(FlatEngine::from_snapshot(snapshot)?))
    }
}
