//! Partition checks
//!
//! A strategy must hand out exactly the data of its input table. Every
//! assigned piece must lie inside an input chunk of the same source, no two
//! pieces may share an element, and assigned and input volume must agree.
//! Together these make the assignment a partition of the (disjoint) table.

use crate::strategy::Assignment;
use pmdpipe_core::{table_volume, Chunk, PipeError, Rank, Result};

/// Check that `assignment` is a complete partition of `table`
pub fn verify_partition(table: &[Chunk], assignment: &Assignment) -> Result<()> {
    for (rank, chunks) in assignment {
        for piece in chunks {
            let inside = table
                .iter()
                .any(|c| c.source_id == piece.source_id && c.contains(piece));
            if !inside {
                return Err(PipeError::PartitionCompleteness(format!(
                    "chunk {piece} assigned to rank {rank} is not part of the input table"
                )));
            }
        }
    }

    let mut pieces: Vec<(Rank, &Chunk)> = assignment
        .iter()
        .flat_map(|(rank, chunks)| chunks.iter().map(move |c| (*rank, c)))
        .filter(|(_, c)| !c.is_empty())
        .collect();
    pieces.sort_by(|a, b| a.1.offset.cmp(&b.1.offset));
    for (i, (rank, piece)) in pieces.iter().enumerate() {
        let end = piece.end();
        // sorted by offset: later pieces starting past our first dimension can't overlap
        for (other_rank, other) in pieces[i + 1..]
            .iter()
            .take_while(|(_, o)| match (o.offset.first(), end.first()) {
                (Some(start), Some(limit)) => start < limit,
                _ => true,
            })
        {
            if piece.overlaps(other) {
                return Err(PipeError::PartitionCompleteness(format!(
                    "chunk {piece} of rank {rank} overlaps chunk {other} of rank {other_rank}"
                )));
            }
        }
    }

    let expected = table_volume(table);
    let assigned: u64 = assignment.values().map(|c| table_volume(c)).sum();
    if expected != assigned {
        return Err(PipeError::PartitionCompleteness(format!(
            "input table covers {expected} elements, assignment covers {assigned}"
        )));
    }
    Ok(())
}
