//! Strategy interfaces and assignment bookkeeping

use pmdpipe_core::{Chunk, ChunkTable, Rank, RankTable, Result};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Chunks assigned to each destination rank
pub type Assignment = BTreeMap<Rank, Vec<Chunk>>;

/// Outcome of a strategy that may leave chunks unplaced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialAssignment {
    /// Chunks placed so far
    pub assigned: Assignment,
    /// Chunks the strategy could not place
    pub not_assigned: ChunkTable,
}

/// Algorithm partitioning a chunk table among destination ranks
///
/// The union of all assigned chunks must reconstruct the input table, with
/// nothing dropped and nothing duplicated. Every worker computes the same
/// assignment from the same inputs, so implementations must be deterministic.
pub trait Strategy: Debug + Send + Sync {
    /// Partition `table` among the ranks of `dest_ranks`
    ///
    /// `source_ranks` describes the writers that produced the chunks (see
    /// [`Chunk::source_id`]); only locality-aware strategies consult it.
    fn assign(
        &self,
        table: ChunkTable,
        source_ranks: &RankTable,
        dest_ranks: &RankTable,
    ) -> Result<Assignment>;

    /// Short name for logging
    fn name(&self) -> &'static str;
}

/// Algorithm that places what it can and reports the rest
pub trait PartialStrategy: Debug + Send + Sync {
    /// Partition as much of `table` as possible among `dest_ranks`
    fn assign_partial(
        &self,
        table: ChunkTable,
        source_ranks: &RankTable,
        dest_ranks: &RankTable,
    ) -> Result<PartialAssignment>;

    /// Short name for logging
    fn name(&self) -> &'static str;
}

/// Assignment giving every destination rank an empty list
pub fn empty_assignment(dest_ranks: &RankTable) -> Assignment {
    dest_ranks.keys().map(|&r| (r, Vec::new())).collect()
}

/// Append every rank's chunks from `from` to `into`
pub fn merge_assignment(into: &mut Assignment, from: Assignment) {
    for (rank, chunks) in from {
        into.entry(rank).or_default().extend(chunks);
    }
}

/// Number of chunks across all ranks
pub fn assigned_chunk_count(assignment: &Assignment) -> usize {
    assignment.values().map(Vec::len).sum()
}
