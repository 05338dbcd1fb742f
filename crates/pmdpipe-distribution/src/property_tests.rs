//! Property-based tests for the distribution strategies
//!
//! These tests use `proptest` to generate random chunk tables and worker
//! counts and check the partition guarantees every strategy must give.

#[cfg(test)]
mod tests {
    use crate::{
        verify_partition, Assignment, BinPacking, BlockSlicer, ByCuboidSlice, ByHostname,
        FromPartialStrategy, OneDimensionalBlockSlicer, RoundRobin, Strategy as ChunkStrategy,
    };
    use pmdpipe_core::{identity_rank_table, Chunk, RankTable};
    use proptest::prelude::*;

    /// Disjoint 1D chunk table tiling `[0, total)` plus its total extent
    fn tiled_table() -> impl Strategy<Value = (Vec<Chunk>, u64)> {
        prop::collection::vec((1u64..20, 0u32..4), 0..24).prop_map(|pieces| {
            let mut offset = 0;
            let mut table = Vec::with_capacity(pieces.len());
            for (len, source) in pieces {
                table.push(Chunk::new(vec![offset], vec![len]).with_source(source));
                offset += len;
            }
            (table, offset.max(1))
        })
    }

    fn sorted(mut chunks: Vec<Chunk>) -> Vec<Chunk> {
        chunks.sort();
        chunks
    }

    fn flatten(assignment: &Assignment) -> Vec<Chunk> {
        assignment.values().flatten().cloned().collect()
    }

    fn coverage(chunks: &[Chunk], total: u64) -> Vec<u32> {
        let mut cells = vec![0u32; total as usize];
        for c in chunks {
            for cell in cells.iter_mut().skip(c.offset[0] as usize).take(c.extent[0] as usize) {
                *cell += 1;
            }
        }
        cells
    }

    fn hosts(size: u32, per_host: u32) -> RankTable {
        (0..size).map(|r| (r, format!("node{}", r / per_host))).collect()
    }

    proptest! {
        /// Property: round robin hands out exactly the input chunks
        #[test]
        fn prop_round_robin_complete((table, _) in tiled_table(), n in 1u32..9) {
            let ranks = identity_rank_table(n);
            let a = RoundRobin.assign(table.clone(), &ranks, &ranks).unwrap();
            prop_assert_eq!(sorted(flatten(&a)), sorted(table.clone()));
            prop_assert!(verify_partition(&table, &a).is_ok());
        }

        /// Property: every rank gets floor(k/n) or ceil(k/n) chunks
        #[test]
        fn prop_round_robin_fair((table, _) in tiled_table(), n in 1u32..9) {
            let ranks = identity_rank_table(n);
            let k = table.len();
            let a = RoundRobin.assign(table, &ranks, &ranks).unwrap();
            let lo = k / n as usize;
            let hi = k.div_ceil(n as usize);
            prop_assert_eq!(a.len(), n as usize);
            for chunks in a.values() {
                prop_assert!(chunks.len() == lo || chunks.len() == hi);
            }
        }

        /// Property: bin packing hands out exactly the input chunks
        #[test]
        fn prop_bin_packing_complete((table, _) in tiled_table(), n in 1u32..9) {
            let ranks = identity_rank_table(n);
            let a = BinPacking.assign(table.clone(), &ranks, &ranks).unwrap();
            prop_assert_eq!(sorted(flatten(&a)), sorted(table));
        }

        /// Property: load spread is bounded by the largest chunk
        #[test]
        fn prop_bin_packing_balanced((table, _) in tiled_table(), n in 1u32..9) {
            let ranks = identity_rank_table(n);
            let largest = table.iter().map(Chunk::volume).max().unwrap_or(0);
            let a = BinPacking.assign(table, &ranks, &ranks).unwrap();
            let loads: Vec<u64> = a
                .values()
                .map(|c| c.iter().map(Chunk::volume).sum())
                .collect();
            let max = loads.iter().copied().max().unwrap_or(0);
            let min = loads.iter().copied().min().unwrap_or(0);
            prop_assert!(max - min <= largest);
        }

        /// Property: cuboid slicing covers every input element exactly once
        #[test]
        fn prop_cuboid_slice_covers((table, total) in tiled_table(), n in 1u32..9) {
            let ranks = identity_rank_table(n);
            let strategy = ByCuboidSlice::new(Box::new(OneDimensionalBlockSlicer::default()), vec![total]);
            let a = strategy.assign(table.clone(), &ranks, &ranks).unwrap();
            prop_assert_eq!(coverage(&flatten(&a), total), coverage(&table, total));
            prop_assert!(verify_partition(&table, &a).is_ok());
        }

        /// Property: slicer blocks tile the extent contiguously
        #[test]
        fn prop_slicer_tiles(total in 0u64..500, n in 1u32..17) {
            let slicer = OneDimensionalBlockSlicer::default();
            let mut expected_start = 0;
            for r in 0..n {
                let block = slicer.slice_block(&[total], n, r).unwrap();
                prop_assert_eq!(block.offset[0], expected_start);
                expected_start += block.extent[0];
            }
            prop_assert_eq!(expected_start, total);
        }

        /// Property: slicer blocks differ in size by at most one element
        #[test]
        fn prop_slicer_near_equal(total in 0u64..500, n in 1u32..17) {
            let slicer = OneDimensionalBlockSlicer::default();
            let sizes: Vec<u64> = (0..n)
                .map(|r| slicer.slice_block(&[total], n, r).unwrap().extent[0])
                .collect();
            let max = sizes.iter().copied().max().unwrap();
            let min = sizes.iter().copied().min().unwrap();
            prop_assert!(max - min <= 1);
        }

        /// Property: hostname composition loses and duplicates nothing
        #[test]
        fn prop_hostname_composition_complete(
            (table, total) in tiled_table(),
            n in 1u32..9,
            per_host in 1u32..4,
        ) {
            let dest = hosts(n, per_host);
            let source = hosts(4, 2);
            let strategy = FromPartialStrategy::new(
                Box::new(ByHostname::new(Box::new(BinPacking))),
                Box::new(ByCuboidSlice::new(Box::new(OneDimensionalBlockSlicer::default()), vec![total])),
            );
            let a = strategy.assign(table.clone(), &source, &dest).unwrap();
            prop_assert_eq!(coverage(&flatten(&a), total), coverage(&table, total));
            prop_assert!(verify_partition(&table, &a).is_ok());
        }

        /// Property: no element is handed to two ranks, whatever the strategy
        #[test]
        fn prop_disjoint_across_ranks(
            (table, total) in tiled_table(),
            n in 1u32..9,
            per_host in 1u32..4,
        ) {
            let dest = hosts(n, per_host);
            let source = hosts(4, 2);
            let slice = || -> Box<dyn ChunkStrategy> {
                Box::new(ByCuboidSlice::new(Box::new(OneDimensionalBlockSlicer::default()), vec![total]))
            };
            let strategies: Vec<Box<dyn ChunkStrategy>> = vec![
                Box::new(RoundRobin),
                Box::new(BinPacking),
                slice(),
                Box::new(FromPartialStrategy::new(
                    Box::new(ByHostname::new(Box::new(BinPacking))),
                    slice(),
                )),
                Box::new(FromPartialStrategy::new(
                    Box::new(ByHostname::new(Box::new(RoundRobin))),
                    Box::new(RoundRobin),
                )),
            ];
            for strategy in &strategies {
                let a = strategy.assign(table.clone(), &source, &dest).unwrap();
                let all = flatten(&a);
                for (i, x) in all.iter().enumerate() {
                    for y in &all[i + 1..] {
                        prop_assert!(!x.overlaps(y), "{} hands out {} twice", strategy.name(), x);
                    }
                }
                prop_assert!(coverage(&all, total).iter().all(|&c| c <= 1));
            }
        }
    }
}
