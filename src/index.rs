use std::cmp::Ordering;
use std::collections::BinaryHeap;
use ordered_float::OrderedFloat;
use crate::error::{Error, Result};
use crate::vector::squared_l2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Candidate {
    dist: OrderedFloat<f32>,
    position: u64,
}

// Max-heap on (distance, position): the top is the worst hit kept so far.
impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .cmp(&other.dist)
            .then_with(|| self.position.cmp(&other.position))
    }
}
impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Exact, append-only nearest-neighbour index over squared L2.
///
/// Vectors live row-major in one buffer; a vector's row number is its
/// position. Positions start at 0, grow by one per insert and are never
/// reused.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self { dimension, data: Vec::new() }
    }

    /// Rebuild from a row-major buffer, e.g. one read back from disk.
    pub fn from_rows(dimension: usize, data: Vec<f32>) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::InvalidArgument("index dimension must be positive".into()));
        }
        if data.len() % dimension != 0 {
            return Err(Error::InconsistentIndexState(format!(
                "{} floats do not divide into rows of {}",
                data.len(),
                dimension
            )));
        }
        Ok(Self { dimension, data })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        if self.dimension == 0 { 0 } else { self.data.len() / self.dimension }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw row-major storage, in position order.
    pub fn rows(&self) -> &[f32] {
        &self.data
    }

    pub fn get(&self, position: u64) -> Option<&[f32]> {
        let start = (position as usize).checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// Append at the next position. A rejected vector leaves the index untouched.
    pub fn insert(&mut self, embedding: &[f32]) -> Result<u64> {
        self.check_vector(embedding)?;
        let position = self.len() as u64;
        self.data.extend_from_slice(embedding);
        Ok(position)
    }

    /// The `min(k, len)` closest entries, ascending by distance, ties by position.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(u64, f32)>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".into()));
        }
        self.check_vector(query)?;
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let mut heap = BinaryHeap::with_capacity(k.min(self.len()) + 1);
        for (row, stored) in self.data.chunks_exact(self.dimension).enumerate() {
            let candidate = Candidate {
                dist: OrderedFloat(squared_l2(query, stored)),
                position: row as u64,
            };
            if heap.len() < k {
                heap.push(candidate);
            } else if let Some(worst) = heap.peek() {
                if candidate < *worst {
                    heap.pop();
                    heap.push(candidate);
                }
            }
        }

        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| (c.position, c.dist.into_inner()))
            .collect())
    }

    fn check_vector(&self, v: &[f32]) -> Result<()> {
        if self.dimension == 0 {
            return Err(Error::InvalidArgument("index dimension must be positive".into()));
        }
        if v.len() != self.dimension {
            return Err(Error::DimensionMismatch { expected: self.dimension, actual: v.len() });
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(Error::InvalidInput("embedding contains NaN or infinite values".into()));
        }
        Ok(())
    }
}
