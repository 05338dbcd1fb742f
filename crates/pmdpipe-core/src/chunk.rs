//! Chunk geometry
//!
//! A [`Chunk`] is an n-dimensional hyper-rectangle inside a record component,
//! given by an offset and an extent. A [`ChunkTable`] is the list of chunks a
//! backend reports as physically available for one record component.
//!
//! # Example
//!
//! ```
//! use pmdpipe_core::chunk::Chunk;
//!
//! let a = Chunk::new(vec![0, 0], vec![4, 4]);
//! let b = Chunk::new(vec![2, 2], vec![4, 4]);
//!
//! assert_eq!(a.volume(), 16);
//! assert_eq!(a.intersect(&b), Some(Chunk::new(vec![2, 2], vec![2, 2])));
//! ```

use crate::error::{PipeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-dimension start of a chunk
pub type Offset = Vec<u64>;

/// Per-dimension size of a chunk or dataset
pub type Extent = Vec<u64>;

/// Rectangular region of a record component
///
/// `source_id` names the writer that produced the chunk when a dataset was
/// written by several independent producers (e.g. the writing rank in a
/// streaming setup). It defaults to 0 and is used for locality decisions only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Chunk {
    /// Origin of the chunk
    pub offset: Offset,
    /// Size of the chunk
    pub extent: Extent,
    /// Producer of the chunk
    #[serde(default)]
    pub source_id: u32,
}

/// Chunks available for one record component, in backend order
pub type ChunkTable = Vec<Chunk>;

impl Chunk {
    /// Create a chunk produced by source 0
    pub fn new(offset: Offset, extent: Extent) -> Self {
        Self {
            offset,
            extent,
            source_id: 0,
        }
    }

    /// Create a chunk, checking that offset and extent agree in dimensionality
    pub fn try_new(offset: Offset, extent: Extent) -> Result<Self> {
        if offset.len() != extent.len() {
            return Err(PipeError::InvalidChunk(format!(
                "offset has {} dimensions, extent has {}",
                offset.len(),
                extent.len()
            )));
        }
        Ok(Self::new(offset, extent))
    }

    /// The chunk covering a whole dataset of the given shape
    pub fn whole(shape: &[u64]) -> Self {
        Self::new(vec![0; shape.len()], shape.to_vec())
    }

    /// Set the producing source
    pub fn with_source(mut self, source_id: u32) -> Self {
        self.source_id = source_id;
        self
    }

    /// Number of dimensions
    pub fn dimensionality(&self) -> usize {
        self.offset.len()
    }

    /// Exclusive upper corner, saturating at `u64::MAX`
    pub fn end(&self) -> Vec<u64> {
        self.offset
            .iter()
            .zip(self.extent.iter())
            .map(|(o, e)| o.saturating_add(*e))
            .collect()
    }

    /// Exclusive upper corner, failing if it is not representable
    pub fn checked_end(&self) -> Result<Vec<u64>> {
        self.offset
            .iter()
            .zip(self.extent.iter())
            .map(|(o, e)| {
                o.checked_add(*e).ok_or_else(|| {
                    PipeError::InvalidChunk(format!(
                        "chunk at {:?} with extent {:?} overflows",
                        self.offset, self.extent
                    ))
                })
            })
            .collect()
    }

    /// Number of elements covered, saturating at `u64::MAX`
    ///
    /// A zero-dimensional chunk describes a single scalar and has volume 1.
    pub fn volume(&self) -> u64 {
        self.extent.iter().fold(1u64, |v, e| v.saturating_mul(*e))
    }

    /// Size in bytes of the chunk's elements, failing if it is not addressable
    pub fn byte_len(&self, element_size: usize) -> Result<usize> {
        self.extent
            .iter()
            .try_fold(element_size, |len, e| {
                usize::try_from(*e).ok().and_then(|e| len.checked_mul(e))
            })
            .ok_or_else(|| PipeError::InvalidChunk(format!("chunk {self} too large")))
    }

    /// Whether the chunk covers no elements
    pub fn is_empty(&self) -> bool {
        self.extent.contains(&0)
    }

    /// Whether the chunk lies inside a dataset of the given shape
    pub fn fits_within(&self, shape: &[u64]) -> bool {
        self.dimensionality() == shape.len()
            && self.checked_end().is_ok_and(|end| {
                end.iter().zip(shape.iter()).all(|(e, s)| e <= s)
            })
    }

    /// Intersection of two chunks, `None` if they share no element
    ///
    /// The result keeps the source of `self`.
    pub fn intersect(&self, other: &Chunk) -> Option<Chunk> {
        if self.dimensionality() != other.dimensionality() {
            return None;
        }

        let mut offset = Vec::with_capacity(self.dimensionality());
        let mut extent = Vec::with_capacity(self.dimensionality());

        for d in 0..self.dimensionality() {
            let start = self.offset[d].max(other.offset[d]);
            let end = self.offset[d]
                .saturating_add(self.extent[d])
                .min(other.offset[d].saturating_add(other.extent[d]));
            if end <= start {
                return None;
            }
            offset.push(start);
            extent.push(end - start);
        }

        Some(Chunk {
            offset,
            extent,
            source_id: self.source_id,
        })
    }

    /// Whether the two chunks share at least one element
    pub fn overlaps(&self, other: &Chunk) -> bool {
        self.intersect(other).is_some()
    }

    /// Whether `other` lies completely inside `self`
    pub fn contains(&self, other: &Chunk) -> bool {
        if self.dimensionality() != other.dimensionality() {
            return false;
        }
        (0..self.dimensionality()).all(|d| {
            other.offset[d] >= self.offset[d]
                && other.offset[d].saturating_add(other.extent[d])
                    <= self.offset[d].saturating_add(self.extent[d])
        })
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} -- {:?}", self.offset, self.end())
    }
}

/// Total number of elements in a chunk table
pub fn table_volume(table: &[Chunk]) -> u64 {
    table.iter().fold(0u64, |v, c| v.saturating_add(c.volume()))
}
