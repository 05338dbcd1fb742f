//! Distribution by slicing the dataset into cuboids
//!
//! [`ByCuboidSlice`] ignores how the source happened to chunk the data. A
//! [`BlockSlicer`] cuts the dataset's bounding box into one block per
//! destination rank; each rank receives the parts of the available chunks
//! that fall into its block. Blocks tile the dataset, so the pieces cover
//! exactly what the chunk table covers, whatever its layout.
//!
//! # Example
//!
//! ```
//! use pmdpipe_distribution::{BlockSlicer, OneDimensionalBlockSlicer};
//!
//! let slicer = OneDimensionalBlockSlicer::default();
//! let blocks: Vec<_> = (0..3)
//!     .map(|r| slicer.slice_block(&[10], 3, r).unwrap())
//!     .map(|b| (b.offset[0], b.offset[0] + b.extent[0]))
//!     .collect();
//! assert_eq!(blocks, vec![(0, 4), (4, 7), (7, 10)]);
//! ```

use crate::strategy::{empty_assignment, Assignment, Strategy};
use pmdpipe_core::{Chunk, ChunkTable, Extent, PipeError, RankTable, Result};
use std::fmt::Debug;

/// Policy cutting a dataset into one block per worker
pub trait BlockSlicer: Debug + Send + Sync {
    /// Block of worker `rank` out of `size` for a dataset of `total_extent`
    ///
    /// `None` if the worker receives nothing.
    fn slice_block(&self, total_extent: &[u64], size: u32, rank: u32) -> Option<Chunk>;
}

/// Cut along a single dimension into contiguous, near-equal slabs
///
/// Worker `r` of `n` starts at `(N / n) * r + ceil((N % n) * r / n)` where `N`
/// is the extent along the cut dimension; the last worker absorbs the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OneDimensionalBlockSlicer {
    dim: usize,
}

impl OneDimensionalBlockSlicer {
    /// Slicer cutting along dimension `dim`
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// Dimension the slicer cuts along
    pub fn dim(&self) -> usize {
        self.dim
    }

    // size and rank come from u32 and rank < size, so the padding product
    // stays below 2^64 and the result never exceeds n
    fn start(n: u64, size: u64, rank: u64) -> u64 {
        let base = (n / size) * rank;
        let pad_dividend = (n % size) * rank;
        base + pad_dividend.div_ceil(size)
    }
}

impl BlockSlicer for OneDimensionalBlockSlicer {
    fn slice_block(&self, total_extent: &[u64], size: u32, rank: u32) -> Option<Chunk> {
        if size == 0 || rank >= size {
            return None;
        }
        if self.dim >= total_extent.len() {
            // Nothing to cut along: the first worker takes the whole dataset.
            return (rank == 0).then(|| Chunk::whole(total_extent));
        }

        let n = total_extent[self.dim];
        let (size, rank) = (u64::from(size), u64::from(rank));

        let start = Self::start(n, size, rank);
        let end = if rank + 1 >= size {
            n
        } else {
            Self::start(n, size, rank + 1)
        };

        let mut offset = vec![0; total_extent.len()];
        let mut extent = total_extent.to_vec();
        offset[self.dim] = start;
        extent[self.dim] = end - start;
        Some(Chunk::new(offset, extent))
    }
}

/// Assign each rank the parts of the chunk table inside its block
#[derive(Debug)]
pub struct ByCuboidSlice {
    slicer: Box<dyn BlockSlicer>,
    global_extent: Extent,
}

impl ByCuboidSlice {
    /// Slice a dataset of `global_extent` with `slicer`
    ///
    /// The number of blocks and each rank's block index are taken from the
    /// destination rank table at assignment time, so the strategy also works
    /// inside a locality group.
    pub fn new(slicer: Box<dyn BlockSlicer>, global_extent: Extent) -> Self {
        Self {
            slicer,
            global_extent,
        }
    }

    /// Extent of the sliced dataset
    pub fn global_extent(&self) -> &[u64] {
        &self.global_extent
    }
}

impl Strategy for ByCuboidSlice {
    fn assign(
        &self,
        table: ChunkTable,
        _source_ranks: &RankTable,
        dest_ranks: &RankTable,
    ) -> Result<Assignment> {
        let mut assignment = empty_assignment(dest_ranks);
        if table.is_empty() {
            return Ok(assignment);
        }
        if dest_ranks.is_empty() {
            return Err(PipeError::configuration(
                "cuboid slicing needs at least one destination rank",
            ));
        }
        if let Some(outside) = table.iter().find(|c| !c.fits_within(&self.global_extent)) {
            return Err(PipeError::InvalidChunk(format!(
                "chunk {} lies outside dataset extent {:?}",
                outside, self.global_extent
            )));
        }

        let size = dest_ranks.len() as u32;
        for (position, rank) in dest_ranks.keys().enumerate() {
            let Some(block) = self.slicer.slice_block(&self.global_extent, size, position as u32)
            else {
                continue;
            };
            let pieces = assignment.entry(*rank).or_default();
            pieces.extend(table.iter().filter_map(|chunk| chunk.intersect(&block)));
        }
        Ok(assignment)
    }

    fn name(&self) -> &'static str {
        "slicedataset"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmdpipe_core::identity_rank_table;

    fn bounds(slicer: &OneDimensionalBlockSlicer, extent: &[u64], size: u32) -> Vec<(u64, u64)> {
        (0..size)
            .filter_map(|r| slicer.slice_block(extent, size, r))
            .map(|b| (b.offset[slicer.dim()], b.offset[slicer.dim()] + b.extent[slicer.dim()]))
            .collect()
    }

    #[test]
    fn test_ten_over_three() {
        let slicer = OneDimensionalBlockSlicer::default();
        assert_eq!(bounds(&slicer, &[10], 3), vec![(0, 4), (4, 7), (7, 10)]);
    }

    #[test]
    fn test_even_split_keeps_other_dimensions() {
        let slicer = OneDimensionalBlockSlicer::new(1);
        let block = slicer.slice_block(&[3, 8], 4, 2).unwrap();
        assert_eq!(block.offset, vec![0, 4]);
        assert_eq!(block.extent, vec![3, 2]);
    }

    #[test]
    fn test_more_workers_than_elements() {
        let slicer = OneDimensionalBlockSlicer::default();
        let blocks: Vec<_> = (0..4).map(|r| slicer.slice_block(&[2], 4, r).unwrap()).collect();
        let total: u64 = blocks.iter().map(|b| b.extent[0]).sum();
        assert_eq!(total, 2);
        assert!(slicer.slice_block(&[2], 4, 4).is_none());
    }

    #[test]
    fn test_scalar_dataset_goes_to_first_worker() {
        let slicer = OneDimensionalBlockSlicer::default();
        assert!(slicer.slice_block(&[], 2, 0).is_some());
        assert!(slicer.slice_block(&[], 2, 1).is_none());
    }

    #[test]
    fn test_assign_intersects_chunks() {
        let table = vec![
            Chunk::new(vec![0, 0], vec![2, 4]),
            Chunk::new(vec![2, 0], vec![2, 4]),
        ];
        let strategy = ByCuboidSlice::new(Box::new(OneDimensionalBlockSlicer::default()), vec![4, 4]);
        let a = strategy
            .assign(table, &RankTable::new(), &identity_rank_table(3))
            .unwrap();

        // Blocks along dim 0: [0,2) [2,3) [3,4)
        assert_eq!(a[&0], vec![Chunk::new(vec![0, 0], vec![2, 4])]);
        assert_eq!(a[&1], vec![Chunk::new(vec![2, 0], vec![1, 4])]);
        assert_eq!(a[&2], vec![Chunk::new(vec![3, 0], vec![1, 4])]);
    }

    #[test]
    fn test_extreme_extent_and_worker_count() {
        let slicer = OneDimensionalBlockSlicer::default();
        let last = slicer.slice_block(&[u64::MAX], u32::MAX, u32::MAX - 1).unwrap();
        assert_eq!(last.offset[0] + last.extent[0], u64::MAX);
        let middle = slicer.slice_block(&[u64::MAX], u32::MAX, u32::MAX / 2).unwrap();
        assert!(middle.offset[0] < u64::MAX);
    }

    #[test]
    fn test_rejects_overflowing_chunk() {
        let table = vec![Chunk::new(vec![u64::MAX], vec![2])];
        let strategy = ByCuboidSlice::new(Box::new(OneDimensionalBlockSlicer::default()), vec![4]);
        let err = strategy
            .assign(table, &RankTable::new(), &identity_rank_table(1))
            .unwrap_err();
        assert!(matches!(err, PipeError::InvalidChunk(_)), "{err}");
    }

    #[test]
    fn test_rejects_chunks_outside_dataset() {
        let table = vec![Chunk::new(vec![3], vec![2])];
        let strategy = ByCuboidSlice::new(Box::new(OneDimensionalBlockSlicer::default()), vec![4]);
        assert!(strategy
            .assign(table, &RankTable::new(), &identity_rank_table(1))
            .is_err());
    }
}
