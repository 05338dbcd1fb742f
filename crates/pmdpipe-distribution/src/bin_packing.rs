//! Greedy bin-packing distribution
//!
//! Chunks are taken in order of descending volume and each goes to the rank
//! currently holding the least total volume, ties broken by ascending rank.
//! After every step the spread between the most and least loaded rank is at
//! most the volume of the largest chunk.

use crate::strategy::{empty_assignment, Assignment, Strategy};
use pmdpipe_core::{ChunkTable, PipeError, Rank, RankTable, Result};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Balance assigned volume across ranks
#[derive(Debug, Clone, Copy, Default)]
pub struct BinPacking;

impl Strategy for BinPacking {
    fn assign(
        &self,
        mut table: ChunkTable,
        _source_ranks: &RankTable,
        dest_ranks: &RankTable,
    ) -> Result<Assignment> {
        let mut assignment = empty_assignment(dest_ranks);
        if table.is_empty() {
            return Ok(assignment);
        }
        if dest_ranks.is_empty() {
            return Err(PipeError::configuration(
                "bin-packing distribution needs at least one destination rank",
            ));
        }

        // Stable: equal volumes keep table order.
        table.sort_by_key(|c| Reverse(c.volume()));

        // Min-heap on (load, rank).
        let mut bins: BinaryHeap<Reverse<(u64, Rank)>> =
            dest_ranks.keys().map(|&r| Reverse((0, r))).collect();

        for chunk in table {
            let Some(Reverse((load, rank))) = bins.pop() else {
                break;
            };
            bins.push(Reverse((load.saturating_add(chunk.volume()), rank)));
            assignment.entry(rank).or_default().push(chunk);
        }
        Ok(assignment)
    }

    fn name(&self) -> &'static str {
        "binpacking"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmdpipe_core::{identity_rank_table, Chunk};

    fn load(a: &Assignment, rank: Rank) -> u64 {
        a[&rank].iter().map(Chunk::volume).sum()
    }

    #[test]
    fn test_largest_first_to_emptiest() {
        let table = vec![
            Chunk::new(vec![0], vec![1]),
            Chunk::new(vec![1], vec![8]),
            Chunk::new(vec![9], vec![4]),
            Chunk::new(vec![13], vec![3]),
        ];
        let a = BinPacking
            .assign(table, &RankTable::new(), &identity_rank_table(2))
            .unwrap();

        // 8 -> r0, 4 -> r1, 3 -> r1, 1 -> r1 (r1 at 7 < 8)
        assert_eq!(a[&0], vec![Chunk::new(vec![1], vec![8])]);
        assert_eq!(load(&a, 1), 8);
        assert_eq!(a[&1].len(), 3);
    }

    #[test]
    fn test_ties_go_to_lowest_rank() {
        let table = vec![Chunk::new(vec![0], vec![2]), Chunk::new(vec![2], vec![2])];
        let a = BinPacking
            .assign(table, &RankTable::new(), &identity_rank_table(3))
            .unwrap();
        assert_eq!(a[&0], vec![Chunk::new(vec![0], vec![2])]);
        assert_eq!(a[&1], vec![Chunk::new(vec![2], vec![2])]);
        assert!(a[&2].is_empty());
    }

    #[test]
    fn test_more_ranks_than_chunks() {
        let table = vec![Chunk::new(vec![0, 0], vec![4, 4])];
        let a = BinPacking
            .assign(table, &RankTable::new(), &identity_rank_table(4))
            .unwrap();
        assert_eq!(a.len(), 4);
        assert_eq!(a.values().map(Vec::len).sum::<usize>(), 1);
    }

    #[test]
    fn test_no_destination_ranks() {
        let table = vec![Chunk::new(vec![0], vec![1])];
        assert!(BinPacking
            .assign(table, &RankTable::new(), &RankTable::new())
            .is_err());
    }
}
