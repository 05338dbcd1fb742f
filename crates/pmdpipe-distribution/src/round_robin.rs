//! Round-robin distribution
//!
//! Chunk `i` goes to the `i mod n`-th destination rank. Every rank receives
//! either `floor(k/n)` or `ceil(k/n)` of `k` chunks; chunk volumes and
//! locality are ignored.

use crate::strategy::{empty_assignment, Assignment, Strategy};
use pmdpipe_core::{ChunkTable, PipeError, RankTable, Result};

/// Equal chunk count per rank
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRobin;

impl Strategy for RoundRobin {
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

        let ranks: Vec<_> = dest_ranks.keys().copied().collect();
        if ranks.is_empty() {
            return Err(PipeError::configuration(
                "round-robin distribution needs at least one destination rank",
            ));
        }

        for (i, chunk) in table.into_iter().enumerate() {
            let rank = ranks[i % ranks.len()];
            assignment.entry(rank).or_default().push(chunk);
        }
        Ok(assignment)
    }

    fn name(&self) -> &'static str {
        "roundrobin"
    }
}
